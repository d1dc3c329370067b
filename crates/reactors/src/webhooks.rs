//! Webhook delivery pipeline.
//!
//! Upstream: `alert`, `accounting`, and `customer_spend` events. For each
//! tracked endpoint in the event's organization, the dispatcher filters
//! through the endpoint actor's `should_receive_event`, delivers via the
//! [`WebhookTransport`] collaborator, and records every outcome back on
//! the endpoint actor. Retry scheduling follows the endpoint's
//! [`RetryPolicy`], fed by its recent-delivery ring; the endpoint entity
//! itself never performs HTTP calls.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{EntityId, TenantId};
use domain::{DeliveryAttempt, RetryPolicy, WebhookCommand, WebhookEndpoint, WebhookResponse};
use entity_store::EntityStore;
use fabric::{Namespace, StreamEvent};
use runtime::ActorRuntime;
use tokio::sync::RwLock;

use crate::reactor::Reactor;
use crate::Result;

/// External HTTP delivery collaborator. Mocked in tests; a production
/// implementation posts the serialized event to the endpoint URL.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Attempts a delivery; returns the response status code, or a
    /// transport-level error description.
    async fn deliver(&self, url: &str, event: &StreamEvent) -> std::result::Result<u16, String>;
}

/// Fans events out to registered webhook endpoints.
pub struct WebhookDispatcher<S: EntityStore + 'static> {
    endpoints: ActorRuntime<WebhookEndpoint, S>,
    transport: Arc<dyn WebhookTransport>,
    policy: RetryPolicy,
    tracked: Arc<RwLock<HashSet<(TenantId, EntityId)>>>,
}

impl<S: EntityStore + 'static> WebhookDispatcher<S> {
    pub fn new(
        endpoints: ActorRuntime<WebhookEndpoint, S>,
        transport: Arc<dyn WebhookTransport>,
    ) -> Self {
        Self::with_policy(endpoints, transport, RetryPolicy::default())
    }

    pub fn with_policy(
        endpoints: ActorRuntime<WebhookEndpoint, S>,
        transport: Arc<dyn WebhookTransport>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            endpoints,
            transport,
            policy,
            tracked: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Adds an endpoint to the delivery fan-out.
    pub async fn track_endpoint(&self, tenant: TenantId, endpoint_id: EntityId) {
        self.tracked.write().await.insert((tenant, endpoint_id));
    }

    async fn targets_for(&self, tenant: TenantId) -> Vec<EntityId> {
        self.tracked
            .read()
            .await
            .iter()
            .filter(|(t, _)| *t == tenant)
            .map(|(_, id)| *id)
            .collect()
    }

    /// Delivers one event to one endpoint, retrying per policy until it
    /// lands or the attempt budget is spent. Every attempt outcome is
    /// recorded on the endpoint actor.
    async fn deliver_to(&self, tenant: TenantId, endpoint_id: EntityId, event: &StreamEvent) {
        loop {
            let snapshot = match self.endpoints.snapshot(tenant, endpoint_id).await {
                Ok(Some((endpoint, _))) => endpoint,
                Ok(None) => return,
                Err(err) => {
                    tracing::warn!(error = %err, %endpoint_id, "endpoint snapshot failed");
                    return;
                }
            };
            if !snapshot.should_receive_event(event.event_type()) {
                return;
            }

            let outcome = self.transport.deliver(snapshot.url(), event).await;
            let (success, status_code, error) = match outcome {
                Ok(code) if (200..300).contains(&code) => (true, Some(code), None),
                Ok(code) => (false, Some(code), None),
                Err(message) => (false, None, Some(message)),
            };

            let recorded = self
                .endpoints
                .dispatch(
                    tenant,
                    endpoint_id,
                    WebhookCommand::RecordDeliveryAttempt {
                        attempt: DeliveryAttempt {
                            event_id: event.event_id,
                            event_type: event.event_type().to_string(),
                            attempted_at: Utc::now(),
                            success,
                            status_code,
                            error,
                        },
                    },
                )
                .await;

            metrics::counter!("webhook_delivery_attempts_total").increment(1);

            let consecutive_failures = match recorded {
                Ok(outcome) => match outcome.response {
                    WebhookResponse::AttemptRecorded {
                        consecutive_failures,
                    } => consecutive_failures,
                    _ => 0,
                },
                Err(err) => {
                    tracing::warn!(error = %err, %endpoint_id, "failed to record delivery attempt");
                    return;
                }
            };

            if success {
                return;
            }
            match self.policy.backoff_for(consecutive_failures) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => {
                    tracing::error!(
                        %endpoint_id,
                        event_id = %event.event_id,
                        consecutive_failures,
                        "webhook delivery abandoned after exhausting retry budget"
                    );
                    metrics::counter!("webhook_deliveries_abandoned_total").increment(1);
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl<S: EntityStore + 'static> Reactor for WebhookDispatcher<S> {
    fn name(&self) -> &'static str {
        "webhook_dispatcher"
    }

    fn namespaces(&self) -> &'static [Namespace] {
        &[Namespace::Alert, Namespace::Accounting, Namespace::CustomerSpend]
    }

    async fn handle(&self, event: &StreamEvent) -> Result<()> {
        for endpoint_id in self.targets_for(event.organization).await {
            self.deliver_to(event.organization, endpoint_id, event).await;
        }
        Ok(())
    }
}
