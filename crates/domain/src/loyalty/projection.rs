//! Spend projection state and the points ledger.
//!
//! The append-only [`PointsTransaction`] log is the source of truth; the
//! summary fields (`available_points`, tier, spend totals) are a
//! materialized cache that must stay recomputable from the log.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use common::EntityId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use runtime::ErrorCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One rung of the loyalty ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,

    /// Year-to-date spend required to hold this tier.
    pub minimum_spend: Decimal,

    /// Factor applied to points earned while in this tier.
    pub multiplier: Decimal,
}

impl Tier {
    pub fn new(name: impl Into<String>, minimum_spend: Decimal, multiplier: Decimal) -> Self {
        Self {
            name: name.into(),
            minimum_spend,
            multiplier,
        }
    }
}

fn default_tiers() -> Vec<Tier> {
    vec![Tier::new("Bronze", Decimal::ZERO, Decimal::ONE)]
}

/// Kind of points movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsTransactionType {
    Earned,
    Redeemed,
}

/// Immutable ledger row. The signed `points` across all rows reconciles
/// with `available_points` at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsTransaction {
    pub transaction_type: PointsTransactionType,

    /// Signed movement: positive for earned, negative for redeemed.
    pub points: i64,

    pub balance_before: i64,
    pub balance_after: i64,
    pub order_id: Option<EntityId>,
    pub processed_at: DateTime<Utc>,
}

/// Read-model summary returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendSummary {
    pub customer_id: Option<EntityId>,
    pub lifetime_spend: Decimal,
    pub year_to_date_spend: Decimal,
    pub available_points: i64,
    pub current_tier: String,
}

/// Per-customer spend projection: lifetime/YTD spend, points balance, and
/// the derived tier. Created on first spend or explicit enrollment; never
/// hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSpendProjection {
    pub(crate) customer_id: Option<EntityId>,
    pub(crate) lifetime_spend: Decimal,
    pub(crate) year_to_date_spend: Decimal,

    /// Calendar year the YTD accumulator covers; rolls over when a spend
    /// lands in a later year.
    pub(crate) ytd_year: i32,

    pub(crate) available_points: i64,
    pub(crate) current_tier: String,
    pub(crate) tier_config: Vec<Tier>,
    pub(crate) points_per_currency_unit: Decimal,
    pub(crate) points_value_in_currency: Decimal,

    /// Append-only ledger backing every balance change.
    pub(crate) transactions: Vec<PointsTransaction>,

    pub(crate) recorded_orders: HashSet<EntityId>,
    pub(crate) reversed_orders: HashSet<EntityId>,
}

impl Default for CustomerSpendProjection {
    fn default() -> Self {
        let tiers = default_tiers();
        let current_tier = tiers[0].name.clone();
        Self {
            customer_id: None,
            lifetime_spend: Decimal::ZERO,
            year_to_date_spend: Decimal::ZERO,
            ytd_year: 0,
            available_points: 0,
            current_tier,
            tier_config: tiers,
            points_per_currency_unit: Decimal::ONE,
            points_value_in_currency: dec!(0.01),
            transactions: Vec::new(),
            recorded_orders: HashSet::new(),
            reversed_orders: HashSet::new(),
        }
    }
}

// Query methods
impl CustomerSpendProjection {
    pub fn customer_id(&self) -> Option<EntityId> {
        self.customer_id
    }

    pub fn lifetime_spend(&self) -> Decimal {
        self.lifetime_spend
    }

    pub fn year_to_date_spend(&self) -> Decimal {
        self.year_to_date_spend
    }

    pub fn available_points(&self) -> i64 {
        self.available_points
    }

    pub fn current_tier(&self) -> &str {
        &self.current_tier
    }

    pub fn tier_config(&self) -> &[Tier] {
        &self.tier_config
    }

    pub fn transactions(&self) -> &[PointsTransaction] {
        &self.transactions
    }

    pub fn summary(&self) -> SpendSummary {
        SpendSummary {
            customer_id: self.customer_id,
            lifetime_spend: self.lifetime_spend,
            year_to_date_spend: self.year_to_date_spend,
            available_points: self.available_points,
            current_tier: self.current_tier.clone(),
        }
    }

    /// Recomputes the points balance from the ledger alone. Always equal
    /// to `available_points`.
    pub fn points_from_log(&self) -> i64 {
        self.transactions.iter().map(|t| t.points).sum()
    }

    /// The multiplier of the tier currently held.
    pub fn current_multiplier(&self) -> Decimal {
        self.tier_config
            .iter()
            .find(|t| t.name == self.current_tier)
            .map(|t| t.multiplier)
            .unwrap_or(Decimal::ONE)
    }
}

// Mutation helpers used by the command handler.
impl CustomerSpendProjection {
    /// The highest tier whose minimum is within `spend`; ties break toward
    /// the highest threshold. Falls back to the lowest tier when nothing
    /// qualifies.
    pub(crate) fn tier_for(config: &[Tier], spend: Decimal) -> &Tier {
        config
            .iter()
            .filter(|t| t.minimum_spend <= spend)
            .max_by_key(|t| t.minimum_spend)
            .unwrap_or(&config[0])
    }

    /// Re-derives the current tier from YTD spend. Returns the previous
    /// tier name when it changed.
    pub(crate) fn recompute_tier(&mut self) -> Option<String> {
        let next = Self::tier_for(&self.tier_config, self.year_to_date_spend)
            .name
            .clone();
        if next != self.current_tier {
            let previous = std::mem::replace(&mut self.current_tier, next);
            Some(previous)
        } else {
            None
        }
    }

    pub(crate) fn append_transaction(
        &mut self,
        transaction_type: PointsTransactionType,
        points: i64,
        order_id: Option<EntityId>,
        processed_at: DateTime<Utc>,
    ) {
        let balance_before = self.available_points;
        let balance_after = balance_before + points;
        self.transactions.push(PointsTransaction {
            transaction_type,
            points,
            balance_before,
            balance_after,
            order_id,
            processed_at,
        });
        self.available_points = balance_after;
    }
}

/// Errors produced by loyalty commands.
#[derive(Debug, Error)]
pub enum LoyaltyError {
    #[error("projection already enrolled")]
    AlreadyEnrolled,

    #[error("customer has no spend projection")]
    NotEnrolled,

    #[error("amount must not be negative, got {0}")]
    InvalidAmount(Decimal),

    #[error("points must be positive, got {0}")]
    InvalidPoints(i64),

    #[error("insufficient points: requested {requested}, available {available}")]
    InsufficientPoints { requested: i64, available: i64 },

    #[error("order {0} has no recorded spend to reverse")]
    OrderNotRecorded(EntityId),

    #[error("invalid tier configuration: {0}")]
    InvalidTierConfig(String),
}

impl ErrorCode for LoyaltyError {
    fn error_code(&self) -> &'static str {
        match self {
            LoyaltyError::AlreadyEnrolled => "already_enrolled",
            LoyaltyError::NotEnrolled => "not_enrolled",
            LoyaltyError::InvalidAmount(_) => "invalid_amount",
            LoyaltyError::InvalidPoints(_) => "invalid_points",
            LoyaltyError::InsufficientPoints { .. } => "insufficient_points",
            LoyaltyError::OrderNotRecorded(_) => "order_not_recorded",
            LoyaltyError::InvalidTierConfig(_) => "invalid_tier_config",
        }
    }

    fn retryable(&self) -> bool {
        false
    }
}
