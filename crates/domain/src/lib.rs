pub mod costing;
pub mod loyalty;
pub mod payments;
pub mod timekeeping;

pub use costing::{
    CostBreakdown, CostSnapshot, CostingError, Recipe, RecipeCommand, RecipeIngredient,
    RecipeResponse, UnitOfMeasure,
};
pub use loyalty::{
    CustomerSpendProjection, LoyaltyCommand, LoyaltyError, LoyaltyResponse, PointsTransaction,
    PointsTransactionType, SpendSummary, Tier,
};
pub use payments::{
    ApiKeyRecord, CardProcessor, DeliveryAttempt, Merchant, MerchantCommand, MerchantError,
    MerchantResponse, ProcessorDecline, Refund, RefundCommand, RefundError, RefundResponse,
    RefundStatus, RetryPolicy, Terminal, TerminalCommand, TerminalError, TerminalResponse,
    WebhookCommand, WebhookEndpoint, WebhookError, WebhookResponse,
};
pub use timekeeping::{TimeClock, TimeClockCommand, TimeClockError, TimeClockResponse};
