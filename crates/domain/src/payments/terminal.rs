//! Terminal actor: heartbeat-driven presence.
//!
//! Online/offline is derived from `last_seen_at` against a staleness
//! threshold, never stored as a boolean, so it self-corrects without a
//! "went offline" event.

use chrono::{DateTime, Duration, Utc};
use common::EntityId;
use runtime::{ActorBehavior, Applied, CommandContext, ErrorCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_STALENESS_SECS: i64 = 90;

/// A card terminal registered to a merchant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Terminal {
    pub(crate) id: Option<EntityId>,
    pub(crate) merchant_id: Option<EntityId>,
    pub(crate) label: String,
    pub(crate) registered_at: Option<DateTime<Utc>>,
    pub(crate) last_seen_at: Option<DateTime<Utc>>,
    pub(crate) staleness_threshold_secs: i64,
    pub(crate) deactivated_at: Option<DateTime<Utc>>,
}

impl Terminal {
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub fn merchant_id(&self) -> Option<EntityId> {
        self.merchant_id
    }

    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        self.last_seen_at
    }

    /// Derived presence: seen within the staleness threshold and not
    /// deactivated.
    pub fn is_online(&self, now: DateTime<Utc>) -> bool {
        if self.deactivated_at.is_some() {
            return false;
        }
        match self.last_seen_at {
            Some(seen) => now - seen <= Duration::seconds(self.staleness_threshold_secs),
            None => false,
        }
    }
}

/// Commands accepted by the terminal actor.
#[derive(Debug, Clone)]
pub enum TerminalCommand {
    Register {
        merchant_id: EntityId,
        label: String,
        staleness_threshold_secs: Option<i64>,
    },
    Heartbeat {
        at: DateTime<Utc>,
    },
    Deactivate,
    Status {
        at: DateTime<Utc>,
    },
}

/// Responses from the terminal actor.
#[derive(Debug, Clone)]
pub enum TerminalResponse {
    Registered,
    HeartbeatRecorded { online: bool },
    Deactivated,
    Status {
        online: bool,
        last_seen_at: Option<DateTime<Utc>>,
    },
}

/// Errors produced by terminal commands.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("terminal already registered")]
    AlreadyRegistered,

    #[error("terminal not registered")]
    NotRegistered,

    #[error("terminal is deactivated")]
    Deactivated,

    #[error("staleness threshold must be positive, got {0}")]
    InvalidThreshold(i64),
}

impl ErrorCode for TerminalError {
    fn error_code(&self) -> &'static str {
        match self {
            TerminalError::AlreadyRegistered => "terminal_already_registered",
            TerminalError::NotRegistered => "terminal_not_registered",
            TerminalError::Deactivated => "terminal_deactivated",
            TerminalError::InvalidThreshold(_) => "invalid_staleness_threshold",
        }
    }

    fn retryable(&self) -> bool {
        false
    }
}

impl ActorBehavior for Terminal {
    type Command = TerminalCommand;
    type Response = TerminalResponse;
    type Error = TerminalError;

    fn actor_type() -> &'static str {
        "terminal"
    }

    fn handle(
        &self,
        ctx: &CommandContext,
        command: Self::Command,
    ) -> Result<Applied<Self>, Self::Error> {
        match command {
            TerminalCommand::Register {
                merchant_id,
                label,
                staleness_threshold_secs,
            } => {
                if self.id.is_some() {
                    return Err(TerminalError::AlreadyRegistered);
                }
                let threshold = staleness_threshold_secs.unwrap_or(DEFAULT_STALENESS_SECS);
                if threshold <= 0 {
                    return Err(TerminalError::InvalidThreshold(threshold));
                }

                let next = Terminal {
                    id: Some(ctx.key.entity),
                    merchant_id: Some(merchant_id),
                    label,
                    registered_at: Some(Utc::now()),
                    last_seen_at: None,
                    staleness_threshold_secs: threshold,
                    deactivated_at: None,
                };
                Ok(Applied::new(next, TerminalResponse::Registered))
            }

            TerminalCommand::Heartbeat { at } => {
                if self.id.is_none() {
                    return Err(TerminalError::NotRegistered);
                }
                if self.deactivated_at.is_some() {
                    return Err(TerminalError::Deactivated);
                }

                let mut next = self.clone();
                // Late-arriving heartbeats never move the clock backwards.
                next.last_seen_at = Some(match next.last_seen_at {
                    Some(seen) => seen.max(at),
                    None => at,
                });
                let online = next.is_online(at);
                Ok(Applied::new(
                    next,
                    TerminalResponse::HeartbeatRecorded { online },
                ))
            }

            TerminalCommand::Deactivate => {
                if self.id.is_none() {
                    return Err(TerminalError::NotRegistered);
                }
                let mut next = self.clone();
                next.deactivated_at = Some(Utc::now());
                Ok(Applied::new(next, TerminalResponse::Deactivated))
            }

            TerminalCommand::Status { at } => {
                if self.id.is_none() {
                    return Err(TerminalError::NotRegistered);
                }
                Ok(Applied::read_only(
                    self.clone(),
                    TerminalResponse::Status {
                        online: self.is_online(at),
                        last_seen_at: self.last_seen_at,
                    },
                ))
            }
        }
    }
}
