//! Webhook endpoint actor: delivery filtering and attempt bookkeeping.
//!
//! The entity records outcomes only; HTTP delivery and retry scheduling
//! live in the dispatcher reactor, informed by `recent_deliveries`.

use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{EntityId, EventId};
use runtime::{ActorBehavior, Applied, CommandContext, ErrorCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ring-buffer capacity for recent delivery attempts.
pub const RECENT_DELIVERY_CAPACITY: usize = 25;

/// One delivery attempt outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    pub event_id: EventId,
    pub event_type: String,
    pub attempted_at: DateTime<Utc>,
    pub success: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

/// A webhook endpoint registered by a merchant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    pub(crate) id: Option<EntityId>,
    pub(crate) merchant_id: Option<EntityId>,
    pub(crate) url: String,
    pub(crate) enabled: bool,

    /// Event type names this endpoint subscribes to. Membership is strict:
    /// an empty set receives nothing.
    pub(crate) enabled_events: BTreeSet<String>,

    /// Bounded ring of the most recent attempts, newest at the back.
    pub(crate) recent_deliveries: VecDeque<DeliveryAttempt>,

    pub(crate) last_delivery_at: Option<DateTime<Utc>>,
}

impl WebhookEndpoint {
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn recent_deliveries(&self) -> impl Iterator<Item = &DeliveryAttempt> {
        self.recent_deliveries.iter()
    }

    pub fn last_delivery_at(&self) -> Option<DateTime<Utc>> {
        self.last_delivery_at
    }

    /// Filter applied before any delivery attempt is made.
    pub fn should_receive_event(&self, event_type: &str) -> bool {
        self.enabled && self.enabled_events.contains(event_type)
    }

    /// Failures since the last success, newest first.
    pub fn consecutive_failures(&self) -> u32 {
        self.recent_deliveries
            .iter()
            .rev()
            .take_while(|attempt| !attempt.success)
            .count() as u32
    }
}

/// Commands accepted by the webhook endpoint actor.
#[derive(Debug, Clone)]
pub enum WebhookCommand {
    Register {
        merchant_id: EntityId,
        url: String,
        enabled_events: Vec<String>,
    },
    SetEnabled {
        enabled: bool,
    },
    UpdateEnabledEvents {
        enabled_events: Vec<String>,
    },
    RecordDeliveryAttempt {
        attempt: DeliveryAttempt,
    },
}

/// Responses from the webhook endpoint actor.
#[derive(Debug, Clone)]
pub enum WebhookResponse {
    Registered,
    Updated,
    AttemptRecorded { consecutive_failures: u32 },
}

/// Errors produced by webhook commands.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("endpoint already registered")]
    AlreadyRegistered,

    #[error("endpoint not registered")]
    NotRegistered,

    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}

impl ErrorCode for WebhookError {
    fn error_code(&self) -> &'static str {
        match self {
            WebhookError::AlreadyRegistered => "webhook_already_registered",
            WebhookError::NotRegistered => "webhook_not_registered",
            WebhookError::InvalidUrl(_) => "invalid_webhook_url",
        }
    }

    fn retryable(&self) -> bool {
        false
    }
}

impl ActorBehavior for WebhookEndpoint {
    type Command = WebhookCommand;
    type Response = WebhookResponse;
    type Error = WebhookError;

    fn actor_type() -> &'static str {
        "webhook_endpoint"
    }

    fn handle(
        &self,
        ctx: &CommandContext,
        command: Self::Command,
    ) -> Result<Applied<Self>, Self::Error> {
        match command {
            WebhookCommand::Register {
                merchant_id,
                url,
                enabled_events,
            } => {
                if self.id.is_some() {
                    return Err(WebhookError::AlreadyRegistered);
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(WebhookError::InvalidUrl(url));
                }

                let next = WebhookEndpoint {
                    id: Some(ctx.key.entity),
                    merchant_id: Some(merchant_id),
                    url,
                    enabled: true,
                    enabled_events: enabled_events.into_iter().collect(),
                    recent_deliveries: VecDeque::new(),
                    last_delivery_at: None,
                };
                Ok(Applied::new(next, WebhookResponse::Registered))
            }

            WebhookCommand::SetEnabled { enabled } => {
                self.ensure_registered()?;
                let mut next = self.clone();
                next.enabled = enabled;
                Ok(Applied::new(next, WebhookResponse::Updated))
            }

            WebhookCommand::UpdateEnabledEvents { enabled_events } => {
                self.ensure_registered()?;
                let mut next = self.clone();
                next.enabled_events = enabled_events.into_iter().collect();
                Ok(Applied::new(next, WebhookResponse::Updated))
            }

            WebhookCommand::RecordDeliveryAttempt { attempt } => {
                self.ensure_registered()?;
                let mut next = self.clone();
                next.last_delivery_at = Some(attempt.attempted_at);
                next.recent_deliveries.push_back(attempt);
                while next.recent_deliveries.len() > RECENT_DELIVERY_CAPACITY {
                    next.recent_deliveries.pop_front();
                }

                let consecutive_failures = next.consecutive_failures();
                Ok(Applied::new(
                    next,
                    WebhookResponse::AttemptRecorded {
                        consecutive_failures,
                    },
                ))
            }
        }
    }
}

impl WebhookEndpoint {
    fn ensure_registered(&self) -> Result<(), WebhookError> {
        if self.id.is_none() {
            return Err(WebhookError::NotRegistered);
        }
        Ok(())
    }
}

/// Exponential retry schedule for webhook delivery, informed by an
/// endpoint's consecutive failure count.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(3600),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt given how many have failed in a row,
    /// or `None` when the attempt budget is spent.
    pub fn backoff_for(&self, consecutive_failures: u32) -> Option<Duration> {
        if consecutive_failures >= self.max_attempts {
            return None;
        }
        let shift = consecutive_failures.min(16);
        let delay = self.base_delay.saturating_mul(1u32 << shift);
        Some(delay.min(self.max_delay))
    }
}
