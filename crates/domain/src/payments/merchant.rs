//! Merchant actor: API-key lifecycle.
//!
//! Raw secrets exist only in the create/roll response; the state keeps
//! SHA-256 digests, and validation compares digests.

use chrono::{DateTime, Utc};
use common::EntityId;
use fabric::events::UserEvent;
use fabric::events::staff::{ApiKeyCreatedData, ApiKeyRevokedData, ApiKeyRolledData};
use fabric::{EventPayload, EventSource, StreamEvent};
use runtime::{ActorBehavior, Applied, CommandContext, ErrorCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Audit record for one API key. Survives revocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub key_id: EntityId,
    pub label: String,

    /// SHA-256 digest of the secret, hex-encoded. The raw secret is never
    /// stored.
    pub secret_hash: String,

    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

/// Merchant account state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Merchant {
    pub(crate) id: Option<EntityId>,
    pub(crate) display_name: String,
    pub(crate) onboarded_at: Option<DateTime<Utc>>,
    pub(crate) api_keys: Vec<ApiKeyRecord>,
}

impl Merchant {
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn api_keys(&self) -> &[ApiKeyRecord] {
        &self.api_keys
    }

    pub fn active_keys(&self) -> impl Iterator<Item = &ApiKeyRecord> {
        self.api_keys.iter().filter(|k| k.is_active())
    }

    fn ensure_onboarded(&self) -> Result<(), MerchantError> {
        if self.id.is_none() {
            return Err(MerchantError::NotOnboarded);
        }
        Ok(())
    }
}

pub(crate) fn digest(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn generate_secret() -> String {
    format!(
        "sk_live_{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// Commands accepted by the merchant actor.
#[derive(Debug, Clone)]
pub enum MerchantCommand {
    Onboard { display_name: String },
    CreateApiKey { label: String },
    RevokeApiKey { key_id: EntityId },
    /// Creates a replacement key and immediately invalidates the old key's
    /// secret material, preserving its audit record.
    RollApiKey { key_id: EntityId },
    ValidateApiKey { secret: String },
}

/// Responses from the merchant actor.
#[derive(Debug, Clone)]
pub enum MerchantResponse {
    Onboarded,
    /// The only place the raw secret ever appears.
    KeyIssued { key_id: EntityId, secret: String },
    KeyRevoked,
    KeyRolled {
        retired_key_id: EntityId,
        key_id: EntityId,
        secret: String,
    },
    Validation {
        valid: bool,
        key_id: Option<EntityId>,
    },
}

/// Errors produced by merchant commands.
#[derive(Debug, Error)]
pub enum MerchantError {
    #[error("merchant already onboarded")]
    AlreadyOnboarded,

    #[error("merchant not onboarded")]
    NotOnboarded,

    #[error("api key {0} not found")]
    KeyNotFound(EntityId),

    #[error("api key {0} is already revoked")]
    KeyAlreadyRevoked(EntityId),
}

impl ErrorCode for MerchantError {
    fn error_code(&self) -> &'static str {
        match self {
            MerchantError::AlreadyOnboarded => "merchant_already_onboarded",
            MerchantError::NotOnboarded => "merchant_not_onboarded",
            MerchantError::KeyNotFound(_) => "api_key_not_found",
            MerchantError::KeyAlreadyRevoked(_) => "api_key_already_revoked",
        }
    }

    fn retryable(&self) -> bool {
        false
    }
}

impl ActorBehavior for Merchant {
    type Command = MerchantCommand;
    type Response = MerchantResponse;
    type Error = MerchantError;

    fn actor_type() -> &'static str {
        "merchant"
    }

    fn handle(
        &self,
        ctx: &CommandContext,
        command: Self::Command,
    ) -> Result<Applied<Self>, Self::Error> {
        let now = Utc::now();

        match command {
            MerchantCommand::Onboard { display_name } => {
                if self.id.is_some() {
                    return Err(MerchantError::AlreadyOnboarded);
                }
                let next = Merchant {
                    id: Some(ctx.key.entity),
                    display_name,
                    onboarded_at: Some(now),
                    api_keys: Vec::new(),
                };
                Ok(Applied::new(next, MerchantResponse::Onboarded))
            }

            MerchantCommand::CreateApiKey { label } => {
                self.ensure_onboarded()?;
                let secret = generate_secret();
                let key_id = EntityId::new();

                let mut next = self.clone();
                next.api_keys.push(ApiKeyRecord {
                    key_id,
                    label: label.clone(),
                    secret_hash: digest(&secret),
                    created_at: now,
                    revoked_at: None,
                });

                let event = user_event(
                    ctx,
                    UserEvent::ApiKeyCreated(ApiKeyCreatedData {
                        merchant_id: ctx.key.entity,
                        key_id,
                        label,
                    }),
                );
                Ok(
                    Applied::new(next, MerchantResponse::KeyIssued { key_id, secret })
                        .with_events(vec![event]),
                )
            }

            MerchantCommand::RevokeApiKey { key_id } => {
                self.ensure_onboarded()?;
                let mut next = self.clone();
                let record = next
                    .api_keys
                    .iter_mut()
                    .find(|k| k.key_id == key_id)
                    .ok_or(MerchantError::KeyNotFound(key_id))?;
                if record.revoked_at.is_some() {
                    return Err(MerchantError::KeyAlreadyRevoked(key_id));
                }
                record.revoked_at = Some(now);

                let event = user_event(
                    ctx,
                    UserEvent::ApiKeyRevoked(ApiKeyRevokedData {
                        merchant_id: ctx.key.entity,
                        key_id,
                    }),
                );
                Ok(Applied::new(next, MerchantResponse::KeyRevoked).with_events(vec![event]))
            }

            MerchantCommand::RollApiKey { key_id } => {
                self.ensure_onboarded()?;
                let mut next = self.clone();
                let record = next
                    .api_keys
                    .iter_mut()
                    .find(|k| k.key_id == key_id)
                    .ok_or(MerchantError::KeyNotFound(key_id))?;
                if record.revoked_at.is_some() {
                    return Err(MerchantError::KeyAlreadyRevoked(key_id));
                }

                record.revoked_at = Some(now);
                let label = record.label.clone();

                let secret = generate_secret();
                let new_key_id = EntityId::new();
                next.api_keys.push(ApiKeyRecord {
                    key_id: new_key_id,
                    label,
                    secret_hash: digest(&secret),
                    created_at: now,
                    revoked_at: None,
                });

                let event = user_event(
                    ctx,
                    UserEvent::ApiKeyRolled(ApiKeyRolledData {
                        merchant_id: ctx.key.entity,
                        retired_key_id: key_id,
                        new_key_id,
                    }),
                );
                Ok(Applied::new(
                    next,
                    MerchantResponse::KeyRolled {
                        retired_key_id: key_id,
                        key_id: new_key_id,
                        secret,
                    },
                )
                .with_events(vec![event]))
            }

            MerchantCommand::ValidateApiKey { secret } => {
                self.ensure_onboarded()?;
                let candidate = digest(&secret);
                let matched = self
                    .active_keys()
                    .find(|k| k.secret_hash == candidate)
                    .map(|k| k.key_id);

                Ok(Applied::read_only(
                    self.clone(),
                    MerchantResponse::Validation {
                        valid: matched.is_some(),
                        key_id: matched,
                    },
                ))
            }
        }
    }
}

fn user_event(ctx: &CommandContext, event: UserEvent) -> StreamEvent {
    StreamEvent::new(
        ctx.key.tenant,
        EventSource::new(ctx.key.actor_type, ctx.key.entity),
        EventPayload::User(event),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ActorKey, TenantId};

    fn ctx() -> CommandContext {
        CommandContext {
            key: ActorKey::new(TenantId::new(), Merchant::actor_type(), EntityId::new()),
            last_applied_event: None,
        }
    }

    fn onboarded(ctx: &CommandContext) -> Merchant {
        Merchant::default()
            .handle(
                ctx,
                MerchantCommand::Onboard {
                    display_name: "Trattoria Da Nino".to_string(),
                },
            )
            .unwrap()
            .state
    }

    fn issue_key(merchant: &Merchant, ctx: &CommandContext) -> (Merchant, EntityId, String) {
        let applied = merchant
            .handle(
                ctx,
                MerchantCommand::CreateApiKey {
                    label: "till".to_string(),
                },
            )
            .unwrap();
        let MerchantResponse::KeyIssued { key_id, secret } = applied.response else {
            panic!("expected KeyIssued");
        };
        (applied.state, key_id, secret)
    }

    fn validate(merchant: &Merchant, ctx: &CommandContext, secret: &str) -> (bool, Option<EntityId>) {
        let applied = merchant
            .handle(
                ctx,
                MerchantCommand::ValidateApiKey {
                    secret: secret.to_string(),
                },
            )
            .unwrap();
        let MerchantResponse::Validation { valid, key_id } = applied.response else {
            panic!("expected Validation");
        };
        (valid, key_id)
    }

    #[test]
    fn created_key_stores_only_the_digest() {
        let ctx = ctx();
        let (merchant, key_id, secret) = issue_key(&onboarded(&ctx), &ctx);

        let record = &merchant.api_keys()[0];
        assert_eq!(record.key_id, key_id);
        assert_ne!(record.secret_hash, secret);
        assert_eq!(record.secret_hash, digest(&secret));
        assert!(record.is_active());
    }

    #[test]
    fn validation_compares_digests() {
        let ctx = ctx();
        let (merchant, key_id, secret) = issue_key(&onboarded(&ctx), &ctx);

        let (valid, matched) = validate(&merchant, &ctx, &secret);
        assert!(valid);
        assert_eq!(matched, Some(key_id));

        let (valid, matched) = validate(&merchant, &ctx, "sk_live_wrong");
        assert!(!valid);
        assert!(matched.is_none());
    }

    #[test]
    fn revoked_key_no_longer_validates() {
        let ctx = ctx();
        let (merchant, key_id, secret) = issue_key(&onboarded(&ctx), &ctx);

        let merchant = merchant
            .handle(&ctx, MerchantCommand::RevokeApiKey { key_id })
            .unwrap()
            .state;

        let (valid, _) = validate(&merchant, &ctx, &secret);
        assert!(!valid);
        // Audit record survives.
        assert_eq!(merchant.api_keys().len(), 1);
        assert!(!merchant.api_keys()[0].is_active());
    }

    #[test]
    fn rolling_swaps_secrets_and_keeps_the_audit_trail() {
        let ctx = ctx();
        let (merchant, old_key_id, old_secret) = issue_key(&onboarded(&ctx), &ctx);

        let applied = merchant
            .handle(&ctx, MerchantCommand::RollApiKey { key_id: old_key_id })
            .unwrap();
        let MerchantResponse::KeyRolled {
            retired_key_id,
            key_id: new_key_id,
            secret: new_secret,
        } = applied.response
        else {
            panic!("expected KeyRolled");
        };
        let merchant = applied.state;

        assert_eq!(retired_key_id, old_key_id);
        assert_ne!(new_key_id, old_key_id);
        assert_ne!(new_secret, old_secret);

        // Old secret is dead immediately; new one works.
        let (valid, _) = validate(&merchant, &ctx, &old_secret);
        assert!(!valid);
        let (valid, matched) = validate(&merchant, &ctx, &new_secret);
        assert!(valid);
        assert_eq!(matched, Some(new_key_id));

        // Both records remain, same label.
        assert_eq!(merchant.api_keys().len(), 2);
        assert_eq!(merchant.api_keys()[0].label, merchant.api_keys()[1].label);
        assert_eq!(merchant.active_keys().count(), 1);
    }

    #[test]
    fn rolling_a_revoked_key_fails() {
        let ctx = ctx();
        let (merchant, key_id, _) = issue_key(&onboarded(&ctx), &ctx);
        let merchant = merchant
            .handle(&ctx, MerchantCommand::RevokeApiKey { key_id })
            .unwrap()
            .state;

        let result = merchant.handle(&ctx, MerchantCommand::RollApiKey { key_id });
        assert!(matches!(result, Err(MerchantError::KeyAlreadyRevoked(_))));
    }

    #[test]
    fn key_lifecycle_publishes_user_events() {
        let ctx = ctx();
        let merchant = onboarded(&ctx);

        let applied = merchant
            .handle(
                &ctx,
                MerchantCommand::CreateApiKey {
                    label: "kiosk".to_string(),
                },
            )
            .unwrap();
        assert_eq!(applied.events.len(), 1);
        assert_eq!(applied.events[0].event_type(), "ApiKeyCreated");
    }

    #[test]
    fn commands_before_onboarding_fail() {
        let ctx = ctx();
        let result = Merchant::default().handle(
            &ctx,
            MerchantCommand::CreateApiKey {
                label: "till".to_string(),
            },
        );
        assert!(matches!(result, Err(MerchantError::NotOnboarded)));
    }

    #[test]
    fn validation_is_read_only() {
        let ctx = ctx();
        let (merchant, _, secret) = issue_key(&onboarded(&ctx), &ctx);
        let applied = merchant
            .handle(&ctx, MerchantCommand::ValidateApiKey { secret })
            .unwrap();
        assert!(!applied.mutated);
    }
}
