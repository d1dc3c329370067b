pub mod alerts;
pub mod error;
pub mod host;
pub mod inventory;
pub mod pricing;
pub mod reactor;
pub mod sales;
pub mod spend;
pub mod webhooks;

pub use alerts::AlertCenter;
pub use error::{ReactorError, Result};
pub use host::ReactorHost;
pub use inventory::{InventoryConsumption, StockLevel};
pub use pricing::PriceReaction;
pub use reactor::Reactor;
pub use sales::{DailySales, SalesAggregation};
pub use spend::SpendChain;
pub use webhooks::{WebhookDispatcher, WebhookTransport};
