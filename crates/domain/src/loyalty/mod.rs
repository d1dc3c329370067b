//! Customer spend / loyalty projection actor.

mod commands;
mod projection;

pub use commands::{LoyaltyCommand, LoyaltyResponse};
pub use projection::{
    CustomerSpendProjection, LoyaltyError, PointsTransaction, PointsTransactionType, SpendSummary,
    Tier,
};
