//! Loyalty command handling.

use chrono::{DateTime, Datelike, Utc};
use common::{EntityId, EventId};
use fabric::events::CustomerSpendEvent;
use fabric::events::customer_spend::{
    PointsEarnedData, PointsRedeemedData, SpendRecordedData, SpendReversedData, TierChangedData,
};
use fabric::{EventPayload, EventSource, StreamEvent};
use runtime::{ActorBehavior, Applied, CommandContext};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::projection::{
    CustomerSpendProjection, LoyaltyError, PointsTransactionType, SpendSummary, Tier,
};

/// Commands accepted by the spend projection actor. The customer identity
/// is the dispatch key's entity ID.
#[derive(Debug, Clone)]
pub enum LoyaltyCommand {
    /// Explicit enrollment; projections are otherwise created on first
    /// spend.
    Initialize,
    ConfigureTiers {
        tiers: Vec<Tier>,
    },
    ConfigureProgram {
        points_per_currency_unit: Option<Decimal>,
        points_value_in_currency: Option<Decimal>,
    },
    RecordSpend {
        order_id: EntityId,
        net_spend: Decimal,
        gross_spend: Decimal,
        discount_amount: Decimal,
        item_count: u32,
        date: DateTime<Utc>,
        source_event: Option<EventId>,
    },
    ReverseSpend {
        order_id: EntityId,
        amount: Decimal,
        reason: String,
        source_event: Option<EventId>,
    },
    RedeemPoints {
        order_id: Option<EntityId>,
        points: i64,
        reward_type: String,
    },
    GetSnapshot,
}

/// Responses from the spend projection actor.
#[derive(Debug, Clone)]
pub enum LoyaltyResponse {
    Enrolled,
    Configured,
    SpendRecorded {
        points_earned: i64,
        tier: String,
        tier_changed: bool,
        duplicate: bool,
    },
    SpendReversed {
        duplicate: bool,
        lifetime_spend: Decimal,
        year_to_date_spend: Decimal,
    },
    Redeemed {
        points: i64,
        value: Decimal,
        balance: i64,
    },
    Snapshot(SpendSummary),
}

impl ActorBehavior for CustomerSpendProjection {
    type Command = LoyaltyCommand;
    type Response = LoyaltyResponse;
    type Error = LoyaltyError;

    fn actor_type() -> &'static str {
        "customer_spend"
    }

    fn handle(
        &self,
        ctx: &CommandContext,
        command: Self::Command,
    ) -> Result<Applied<Self>, Self::Error> {
        match command {
            LoyaltyCommand::Initialize => {
                if self.customer_id.is_some() {
                    return Err(LoyaltyError::AlreadyEnrolled);
                }
                let mut next = self.clone();
                next.customer_id = Some(ctx.key.entity);
                Ok(Applied::new(next, LoyaltyResponse::Enrolled))
            }

            LoyaltyCommand::ConfigureTiers { tiers } => {
                if tiers.is_empty() {
                    return Err(LoyaltyError::InvalidTierConfig(
                        "at least one tier is required".to_string(),
                    ));
                }
                for tier in &tiers {
                    if tier.minimum_spend < Decimal::ZERO {
                        return Err(LoyaltyError::InvalidTierConfig(format!(
                            "tier {} has negative minimum spend",
                            tier.name
                        )));
                    }
                    if tier.multiplier <= Decimal::ZERO {
                        return Err(LoyaltyError::InvalidTierConfig(format!(
                            "tier {} has non-positive multiplier",
                            tier.name
                        )));
                    }
                }

                let mut next = self.clone();
                next.tier_config = tiers;
                next.tier_config
                    .sort_by(|a, b| a.minimum_spend.cmp(&b.minimum_spend));
                let previous_tier = next.recompute_tier();

                let mut events = Vec::new();
                if let Some(previous) = &previous_tier {
                    events.push(tier_changed_event(ctx, previous.clone(), &next));
                }
                Ok(Applied::new(next, LoyaltyResponse::Configured).with_events(events))
            }

            LoyaltyCommand::ConfigureProgram {
                points_per_currency_unit,
                points_value_in_currency,
            } => {
                let mut next = self.clone();
                if let Some(rate) = points_per_currency_unit {
                    if rate < Decimal::ZERO {
                        return Err(LoyaltyError::InvalidAmount(rate));
                    }
                    next.points_per_currency_unit = rate;
                }
                if let Some(value) = points_value_in_currency {
                    if value <= Decimal::ZERO {
                        return Err(LoyaltyError::InvalidAmount(value));
                    }
                    next.points_value_in_currency = value;
                }
                Ok(Applied::new(next, LoyaltyResponse::Configured))
            }

            LoyaltyCommand::RecordSpend {
                order_id,
                net_spend,
                gross_spend,
                discount_amount,
                item_count: _,
                date,
                source_event,
            } => {
                for amount in [net_spend, gross_spend, discount_amount] {
                    if amount < Decimal::ZERO {
                        return Err(LoyaltyError::InvalidAmount(amount));
                    }
                }

                // At-least-once delivery: a re-recorded order is a no-op.
                if self.recorded_orders.contains(&order_id) {
                    return Ok(Applied::read_only(
                        self.clone(),
                        LoyaltyResponse::SpendRecorded {
                            points_earned: 0,
                            tier: self.current_tier.clone(),
                            tier_changed: false,
                            duplicate: true,
                        },
                    ));
                }

                let mut next = self.clone();
                if next.customer_id.is_none() {
                    next.customer_id = Some(ctx.key.entity);
                }

                let year = date.year();
                if next.ytd_year == 0 {
                    next.ytd_year = year;
                } else if year > next.ytd_year {
                    next.ytd_year = year;
                    next.year_to_date_spend = Decimal::ZERO;
                }

                // The order's own points use the pre-spend tier multiplier;
                // the tier is recomputed only after the spend applies.
                let pre_spend_tier = next.current_tier.clone();
                let multiplier = next.current_multiplier();
                let points = (net_spend * next.points_per_currency_unit * multiplier)
                    .floor()
                    .to_i64()
                    .unwrap_or(0);

                if points > 0 {
                    next.append_transaction(
                        PointsTransactionType::Earned,
                        points,
                        Some(order_id),
                        date,
                    );
                }
                next.lifetime_spend += net_spend;
                next.year_to_date_spend += net_spend;
                next.recorded_orders.insert(order_id);

                let previous_tier = next.recompute_tier();
                let customer_id = ctx.key.entity;

                let mut events = vec![spend_event(
                    ctx,
                    CustomerSpendEvent::SpendRecorded(SpendRecordedData {
                        customer_id,
                        order_id,
                        net_amount: net_spend,
                        lifetime_spend: next.lifetime_spend,
                        year_to_date_spend: next.year_to_date_spend,
                    }),
                )];
                if points > 0 {
                    events.push(spend_event(
                        ctx,
                        CustomerSpendEvent::PointsEarned(PointsEarnedData {
                            customer_id,
                            order_id,
                            points,
                            balance: next.available_points,
                            tier: pre_spend_tier,
                        }),
                    ));
                }
                if let Some(previous) = &previous_tier {
                    events.push(tier_changed_event(ctx, previous.clone(), &next));
                }

                let response = LoyaltyResponse::SpendRecorded {
                    points_earned: points,
                    tier: next.current_tier.clone(),
                    tier_changed: previous_tier.is_some(),
                    duplicate: false,
                };
                Ok(Applied::new(next, response)
                    .with_events(events)
                    .from_event(source_event))
            }

            LoyaltyCommand::ReverseSpend {
                order_id,
                amount,
                reason,
                source_event,
            } => {
                if amount < Decimal::ZERO {
                    return Err(LoyaltyError::InvalidAmount(amount));
                }

                // Repeat reversal of the same order is a no-op.
                if self.reversed_orders.contains(&order_id) {
                    return Ok(Applied::read_only(
                        self.clone(),
                        LoyaltyResponse::SpendReversed {
                            duplicate: true,
                            lifetime_spend: self.lifetime_spend,
                            year_to_date_spend: self.year_to_date_spend,
                        },
                    ));
                }
                if !self.recorded_orders.contains(&order_id) {
                    return Err(LoyaltyError::OrderNotRecorded(order_id));
                }

                let mut next = self.clone();
                next.lifetime_spend = (next.lifetime_spend - amount).max(Decimal::ZERO);
                next.year_to_date_spend = (next.year_to_date_spend - amount).max(Decimal::ZERO);
                next.reversed_orders.insert(order_id);

                // Already-earned points stay: each transaction is immutable.
                let previous_tier = next.recompute_tier();

                let mut events = vec![spend_event(
                    ctx,
                    CustomerSpendEvent::SpendReversed(SpendReversedData {
                        customer_id: ctx.key.entity,
                        order_id,
                        amount,
                        reason,
                    }),
                )];
                if let Some(previous) = &previous_tier {
                    events.push(tier_changed_event(ctx, previous.clone(), &next));
                }

                let response = LoyaltyResponse::SpendReversed {
                    duplicate: false,
                    lifetime_spend: next.lifetime_spend,
                    year_to_date_spend: next.year_to_date_spend,
                };
                Ok(Applied::new(next, response)
                    .with_events(events)
                    .from_event(source_event))
            }

            LoyaltyCommand::RedeemPoints {
                order_id,
                points,
                reward_type,
            } => {
                if self.customer_id.is_none() {
                    return Err(LoyaltyError::NotEnrolled);
                }
                if points <= 0 {
                    return Err(LoyaltyError::InvalidPoints(points));
                }
                if points > self.available_points {
                    return Err(LoyaltyError::InsufficientPoints {
                        requested: points,
                        available: self.available_points,
                    });
                }

                let mut next = self.clone();
                // Redemption value uses the rate at redemption time, not at
                // earn time.
                let value = (Decimal::from(points) * next.points_value_in_currency)
                    .round_dp(2);
                next.append_transaction(
                    PointsTransactionType::Redeemed,
                    -points,
                    order_id,
                    Utc::now(),
                );

                let events = vec![spend_event(
                    ctx,
                    CustomerSpendEvent::PointsRedeemed(PointsRedeemedData {
                        customer_id: ctx.key.entity,
                        order_id,
                        points,
                        value,
                        balance: next.available_points,
                        reward_type,
                    }),
                )];

                let response = LoyaltyResponse::Redeemed {
                    points,
                    value,
                    balance: next.available_points,
                };
                Ok(Applied::new(next, response).with_events(events))
            }

            LoyaltyCommand::GetSnapshot => Ok(Applied::read_only(
                self.clone(),
                LoyaltyResponse::Snapshot(self.summary()),
            )),
        }
    }
}

fn spend_event(ctx: &CommandContext, event: CustomerSpendEvent) -> StreamEvent {
    StreamEvent::new(
        ctx.key.tenant,
        EventSource::new(ctx.key.actor_type, ctx.key.entity),
        EventPayload::CustomerSpend(event),
    )
}

fn tier_changed_event(
    ctx: &CommandContext,
    previous_tier: String,
    next: &CustomerSpendProjection,
) -> StreamEvent {
    spend_event(
        ctx,
        CustomerSpendEvent::TierChanged(TierChangedData {
            customer_id: ctx.key.entity,
            previous_tier,
            new_tier: next.current_tier.clone(),
            year_to_date_spend: next.year_to_date_spend,
        }),
    )
}
