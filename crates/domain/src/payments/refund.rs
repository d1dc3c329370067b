//! Refund actor: a strict forward-only state machine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::EntityId;
use fabric::events::AccountingEvent;
use fabric::events::accounting::{RefundFailedData, RefundSettledData};
use fabric::{EventPayload, EventSource, StreamEvent};
use runtime::{ActorBehavior, Applied, CommandContext, ErrorCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Refund lifecycle. `Pending` is the only non-terminal state; once a
/// terminal state is reached it is immutable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    #[default]
    Pending,
    Succeeded,
    Failed,
    Cancelled,
}

impl RefundStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RefundStatus::Pending)
    }
}

impl std::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RefundStatus::Pending => "pending",
            RefundStatus::Succeeded => "succeeded",
            RefundStatus::Failed => "failed",
            RefundStatus::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// A refund against a captured payment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Refund {
    pub(crate) id: Option<EntityId>,
    pub(crate) payment_id: Option<EntityId>,
    pub(crate) merchant_id: Option<EntityId>,
    pub(crate) amount: Decimal,
    pub(crate) reason: String,
    pub(crate) status: RefundStatus,
    pub(crate) requested_at: Option<DateTime<Utc>>,
    pub(crate) resolved_at: Option<DateTime<Utc>>,
    pub(crate) processor_reference: Option<String>,
    pub(crate) failure_reason: Option<String>,
}

impl Refund {
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub fn status(&self) -> RefundStatus {
        self.status
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn processor_reference(&self) -> Option<&str> {
        self.processor_reference.as_deref()
    }

    fn guard_transition(&self, action: &'static str) -> Result<(), RefundError> {
        if self.id.is_none() {
            return Err(RefundError::NotRequested);
        }
        if self.status.is_terminal() {
            return Err(RefundError::InvalidStateTransition {
                from: self.status,
                action,
            });
        }
        Ok(())
    }
}

/// Commands accepted by the refund actor.
#[derive(Debug, Clone)]
pub enum RefundCommand {
    Request {
        payment_id: EntityId,
        merchant_id: EntityId,
        amount: Decimal,
        reason: String,
    },
    MarkSucceeded {
        processor_reference: String,
    },
    MarkFailed {
        reason: String,
    },
    Cancel,
}

/// Responses from the refund actor.
#[derive(Debug, Clone)]
pub enum RefundResponse {
    Requested,
    Resolved(RefundStatus),
}

/// Errors produced by refund commands.
#[derive(Debug, Error)]
pub enum RefundError {
    #[error("refund already requested")]
    AlreadyRequested,

    #[error("refund not requested")]
    NotRequested,

    #[error("refund amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("cannot {action} a refund in {from} state")]
    InvalidStateTransition {
        from: RefundStatus,
        action: &'static str,
    },
}

impl ErrorCode for RefundError {
    fn error_code(&self) -> &'static str {
        match self {
            RefundError::AlreadyRequested => "refund_already_requested",
            RefundError::NotRequested => "refund_not_requested",
            RefundError::InvalidAmount(_) => "invalid_amount",
            RefundError::InvalidStateTransition { .. } => "invalid_state_transition",
        }
    }

    fn retryable(&self) -> bool {
        false
    }
}

impl ActorBehavior for Refund {
    type Command = RefundCommand;
    type Response = RefundResponse;
    type Error = RefundError;

    fn actor_type() -> &'static str {
        "refund"
    }

    fn handle(
        &self,
        ctx: &CommandContext,
        command: Self::Command,
    ) -> Result<Applied<Self>, Self::Error> {
        let now = Utc::now();

        match command {
            RefundCommand::Request {
                payment_id,
                merchant_id,
                amount,
                reason,
            } => {
                if self.id.is_some() {
                    return Err(RefundError::AlreadyRequested);
                }
                if amount <= Decimal::ZERO {
                    return Err(RefundError::InvalidAmount(amount));
                }

                let next = Refund {
                    id: Some(ctx.key.entity),
                    payment_id: Some(payment_id),
                    merchant_id: Some(merchant_id),
                    amount,
                    reason,
                    status: RefundStatus::Pending,
                    requested_at: Some(now),
                    ..Refund::default()
                };
                Ok(Applied::new(next, RefundResponse::Requested))
            }

            RefundCommand::MarkSucceeded {
                processor_reference,
            } => {
                self.guard_transition("succeed")?;
                let mut next = self.clone();
                next.status = RefundStatus::Succeeded;
                next.resolved_at = Some(now);
                next.processor_reference = Some(processor_reference.clone());

                let event = accounting_event(
                    ctx,
                    AccountingEvent::RefundSettled(RefundSettledData {
                        refund_id: ctx.key.entity,
                        payment_id: next.payment_id.unwrap_or_default(),
                        merchant_id: next.merchant_id.unwrap_or_default(),
                        amount: next.amount,
                        processor_reference,
                    }),
                );
                Ok(
                    Applied::new(next, RefundResponse::Resolved(RefundStatus::Succeeded))
                        .with_events(vec![event]),
                )
            }

            RefundCommand::MarkFailed { reason } => {
                self.guard_transition("fail")?;
                let mut next = self.clone();
                next.status = RefundStatus::Failed;
                next.resolved_at = Some(now);
                next.failure_reason = Some(reason.clone());

                let event = accounting_event(
                    ctx,
                    AccountingEvent::RefundFailed(RefundFailedData {
                        refund_id: ctx.key.entity,
                        payment_id: next.payment_id.unwrap_or_default(),
                        merchant_id: next.merchant_id.unwrap_or_default(),
                        amount: next.amount,
                        reason,
                    }),
                );
                Ok(
                    Applied::new(next, RefundResponse::Resolved(RefundStatus::Failed))
                        .with_events(vec![event]),
                )
            }

            RefundCommand::Cancel => {
                self.guard_transition("cancel")?;
                let mut next = self.clone();
                next.status = RefundStatus::Cancelled;
                next.resolved_at = Some(now);
                Ok(Applied::new(
                    next,
                    RefundResponse::Resolved(RefundStatus::Cancelled),
                ))
            }
        }
    }
}

fn accounting_event(ctx: &CommandContext, event: AccountingEvent) -> StreamEvent {
    StreamEvent::new(
        ctx.key.tenant,
        EventSource::new(ctx.key.actor_type, ctx.key.entity),
        EventPayload::Accounting(event),
    )
}

/// Card-payment processor collaborator: tokenized refund calls against an
/// external gateway. Consumed, never implemented here.
#[async_trait]
pub trait CardProcessor: Send + Sync {
    /// Submits a refund for a tokenized payment; returns the processor's
    /// reference on success.
    async fn refund(
        &self,
        payment_token: &str,
        amount: Decimal,
    ) -> Result<String, ProcessorDecline>;
}

/// A decline from the card processor.
#[derive(Debug, Clone, Error)]
#[error("processor declined ({code}): {message}")]
pub struct ProcessorDecline {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ActorKey, TenantId};
    use rust_decimal_macros::dec;

    fn ctx() -> CommandContext {
        CommandContext {
            key: ActorKey::new(TenantId::new(), Refund::actor_type(), EntityId::new()),
            last_applied_event: None,
        }
    }

    fn pending(ctx: &CommandContext) -> Refund {
        Refund::default()
            .handle(
                ctx,
                RefundCommand::Request {
                    payment_id: EntityId::new(),
                    merchant_id: EntityId::new(),
                    amount: dec!(18.40),
                    reason: "cold food".to_string(),
                },
            )
            .unwrap()
            .state
    }

    #[test]
    fn request_starts_pending() {
        let ctx = ctx();
        let refund = pending(&ctx);
        assert_eq!(refund.status(), RefundStatus::Pending);
        assert!(!refund.status().is_terminal());
    }

    #[test]
    fn pending_reaches_each_terminal_state() {
        let ctx = ctx();

        let succeeded = pending(&ctx)
            .handle(
                &ctx,
                RefundCommand::MarkSucceeded {
                    processor_reference: "ref-1".to_string(),
                },
            )
            .unwrap()
            .state;
        assert_eq!(succeeded.status(), RefundStatus::Succeeded);
        assert_eq!(succeeded.processor_reference(), Some("ref-1"));

        let failed = pending(&ctx)
            .handle(
                &ctx,
                RefundCommand::MarkFailed {
                    reason: "card expired".to_string(),
                },
            )
            .unwrap()
            .state;
        assert_eq!(failed.status(), RefundStatus::Failed);

        let cancelled = pending(&ctx).handle(&ctx, RefundCommand::Cancel).unwrap().state;
        assert_eq!(cancelled.status(), RefundStatus::Cancelled);
    }

    #[test]
    fn terminal_states_are_immutable() {
        let ctx = ctx();
        let terminal_states = [
            pending(&ctx)
                .handle(
                    &ctx,
                    RefundCommand::MarkSucceeded {
                        processor_reference: "ref-1".to_string(),
                    },
                )
                .unwrap()
                .state,
            pending(&ctx)
                .handle(
                    &ctx,
                    RefundCommand::MarkFailed {
                        reason: "declined".to_string(),
                    },
                )
                .unwrap()
                .state,
            pending(&ctx).handle(&ctx, RefundCommand::Cancel).unwrap().state,
        ];

        for refund in terminal_states {
            let before = refund.status();
            for command in [
                RefundCommand::MarkSucceeded {
                    processor_reference: "again".to_string(),
                },
                RefundCommand::MarkFailed {
                    reason: "again".to_string(),
                },
                RefundCommand::Cancel,
            ] {
                let result = refund.handle(&ctx, command);
                assert!(matches!(
                    result,
                    Err(RefundError::InvalidStateTransition { from, .. }) if from == before
                ));
            }
        }
    }

    #[test]
    fn request_twice_fails() {
        let ctx = ctx();
        let refund = pending(&ctx);
        let result = refund.handle(
            &ctx,
            RefundCommand::Request {
                payment_id: EntityId::new(),
                merchant_id: EntityId::new(),
                amount: dec!(5),
                reason: "dup".to_string(),
            },
        );
        assert!(matches!(result, Err(RefundError::AlreadyRequested)));
    }

    #[test]
    fn nonpositive_amount_is_rejected() {
        let ctx = ctx();
        let result = Refund::default().handle(
            &ctx,
            RefundCommand::Request {
                payment_id: EntityId::new(),
                merchant_id: EntityId::new(),
                amount: dec!(0),
                reason: "zero".to_string(),
            },
        );
        assert!(matches!(result, Err(RefundError::InvalidAmount(_))));
    }

    struct FakeProcessor {
        decline: bool,
    }

    #[async_trait]
    impl CardProcessor for FakeProcessor {
        async fn refund(
            &self,
            payment_token: &str,
            _amount: Decimal,
        ) -> Result<String, ProcessorDecline> {
            if self.decline {
                Err(ProcessorDecline {
                    code: "card_expired".to_string(),
                    message: "card expired".to_string(),
                })
            } else {
                Ok(format!("proc-{payment_token}"))
            }
        }
    }

    #[tokio::test]
    async fn processor_outcome_drives_the_state_machine() {
        let ctx = ctx();
        let refund = pending(&ctx);

        let processor = FakeProcessor { decline: false };
        let state = match processor.refund("tok_123", refund.amount()).await {
            Ok(reference) => {
                refund
                    .handle(
                        &ctx,
                        RefundCommand::MarkSucceeded {
                            processor_reference: reference,
                        },
                    )
                    .unwrap()
                    .state
            }
            Err(decline) => {
                refund
                    .handle(
                        &ctx,
                        RefundCommand::MarkFailed {
                            reason: decline.to_string(),
                        },
                    )
                    .unwrap()
                    .state
            }
        };
        assert_eq!(state.status(), RefundStatus::Succeeded);
        assert_eq!(state.processor_reference(), Some("proc-tok_123"));

        let refund = pending(&ctx);
        let processor = FakeProcessor { decline: true };
        let decline = processor.refund("tok_456", refund.amount()).await.unwrap_err();
        let state = refund
            .handle(
                &ctx,
                RefundCommand::MarkFailed {
                    reason: decline.to_string(),
                },
            )
            .unwrap()
            .state;
        assert_eq!(state.status(), RefundStatus::Failed);
    }

    #[test]
    fn settlement_publishes_accounting_events() {
        let ctx = ctx();
        let applied = pending(&ctx)
            .handle(
                &ctx,
                RefundCommand::MarkSucceeded {
                    processor_reference: "ref-9".to_string(),
                },
            )
            .unwrap();
        assert_eq!(applied.events.len(), 1);
        assert_eq!(applied.events[0].event_type(), "RefundSettled");

        let applied = pending(&ctx)
            .handle(
                &ctx,
                RefundCommand::MarkFailed {
                    reason: "expired".to_string(),
                },
            )
            .unwrap();
        assert_eq!(applied.events[0].event_type(), "RefundFailed");

        // Cancellation is internal bookkeeping, no accounting entry.
        let applied = pending(&ctx).handle(&ctx, RefundCommand::Cancel).unwrap();
        assert!(applied.events.is_empty());
    }
}
