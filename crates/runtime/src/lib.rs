pub mod behavior;
pub mod config;
pub mod error;
pub mod permissions;
mod retry;
pub mod runtime;

pub use behavior::{ActorBehavior, Applied, CommandContext};
pub use common::{ActorKey, EntityId, EventId, TenantId};
pub use config::RuntimeConfig;
pub use entity_store::{EntityStore, Version};
pub use error::{DispatchError, ErrorCode};
pub use permissions::{AllowAll, PermissionChecker};
pub use runtime::{ActorRuntime, DispatchOutcome};
