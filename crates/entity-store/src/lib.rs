pub mod error;
pub mod memory;
pub mod postgres;
pub mod state;
pub mod store;

pub use common::ActorKey;
pub use error::{EntityStoreError, Result};
pub use memory::InMemoryEntityStore;
pub use postgres::PostgresEntityStore;
pub use state::{StateEnvelope, Version};
pub use store::EntityStore;
