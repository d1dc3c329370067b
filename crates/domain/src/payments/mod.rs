//! Payment-gateway entity actors: merchant API keys, terminals, refunds,
//! and webhook endpoints. Each entity is independently versioned.

mod merchant;
mod refund;
mod terminal;
mod webhook;

pub use merchant::{ApiKeyRecord, Merchant, MerchantCommand, MerchantError, MerchantResponse};
pub use refund::{
    CardProcessor, ProcessorDecline, Refund, RefundCommand, RefundError, RefundResponse,
    RefundStatus,
};
pub use terminal::{Terminal, TerminalCommand, TerminalError, TerminalResponse};
pub use webhook::{
    DeliveryAttempt, RetryPolicy, WebhookCommand, WebhookEndpoint, WebhookError, WebhookResponse,
    RECENT_DELIVERY_CAPACITY,
};
