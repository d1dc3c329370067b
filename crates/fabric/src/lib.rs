pub mod bus;
pub mod dedupe;
pub mod envelope;
pub mod events;
pub mod namespace;

pub use bus::{EventFabric, EventStream};
pub use common::{EntityId, EventId, TenantId};
pub use dedupe::DuplicateFilter;
pub use envelope::{EventPayload, EventSource, StreamEvent};
pub use namespace::Namespace;
