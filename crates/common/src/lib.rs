pub mod types;

pub use types::{ActorKey, EntityId, EventId, TenantId};
