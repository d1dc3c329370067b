//! Per-key serialized dispatch over the entity store.
//!
//! One mailbox task per active key gives each actor a single logical
//! thread of control: commands to the same key apply in receipt order,
//! commands to different keys run in parallel, and no locking is needed
//! inside behaviors. Cross-actor effects are always event-driven — an
//! actor never calls into another actor's command path, so there are no
//! lock cycles to deadlock on.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use common::{ActorKey, EntityId, EventId, TenantId};
use entity_store::{EntityStore, EntityStoreError, StateEnvelope, Version};
use fabric::EventFabric;
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::behavior::{ActorBehavior, CommandContext};
use crate::config::RuntimeConfig;
use crate::error::DispatchError;
use crate::retry::with_backoff;

/// Successful dispatch result: the behavior's response and the version the
/// state was persisted at.
#[derive(Debug)]
pub struct DispatchOutcome<R> {
    pub response: R,
    pub version: Version,
}

type Reply<B> = Result<
    DispatchOutcome<<B as ActorBehavior>::Response>,
    DispatchError<<B as ActorBehavior>::Error>,
>;

struct Msg<B: ActorBehavior> {
    command: B::Command,
    respond_to: oneshot::Sender<Reply<B>>,
}

/// Cached activation state for one key.
struct Slot<B> {
    state: B,
    version: Version,
    last_applied: Option<EventId>,
}

impl<B: ActorBehavior> Slot<B> {
    fn fresh() -> Self {
        Self {
            state: B::default(),
            version: Version::initial(),
            last_applied: None,
        }
    }
}

struct Inner<B: ActorBehavior, S> {
    store: Arc<S>,
    fabric: EventFabric,
    config: RuntimeConfig,
    mailboxes: Mutex<HashMap<ActorKey, mpsc::Sender<Msg<B>>>>,
    quarantined: Mutex<HashSet<ActorKey>>,
}

/// The actor runtime for one behavior type.
///
/// Runtimes for different behaviors share the same [`EntityStore`] and
/// [`EventFabric`]; each runtime owns the mailboxes for its own actor type.
/// Cloning is cheap and clones address the same actors.
pub struct ActorRuntime<B: ActorBehavior, S: EntityStore + 'static> {
    inner: Arc<Inner<B, S>>,
}

impl<B: ActorBehavior, S: EntityStore + 'static> Clone for ActorRuntime<B, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B, S> ActorRuntime<B, S>
where
    B: ActorBehavior,
    S: EntityStore + 'static,
{
    /// Creates a runtime with default configuration.
    pub fn new(store: Arc<S>, fabric: EventFabric) -> Self {
        Self::with_config(store, fabric, RuntimeConfig::default())
    }

    /// Creates a runtime with explicit configuration.
    pub fn with_config(store: Arc<S>, fabric: EventFabric, config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                fabric,
                config,
                mailboxes: Mutex::new(HashMap::new()),
                quarantined: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Returns the shared entity store.
    pub fn store(&self) -> &Arc<S> {
        &self.inner.store
    }

    /// Returns the shared event fabric.
    pub fn fabric(&self) -> &EventFabric {
        &self.inner.fabric
    }

    /// Builds the actor key for an entity of this runtime's behavior type.
    pub fn key_for(tenant: TenantId, entity: EntityId) -> ActorKey {
        ActorKey::new(tenant, B::actor_type(), entity)
    }

    /// Dispatches a command to the actor addressed by `(tenant, entity)`.
    ///
    /// Commands to the same key are serialized in receipt order; a full
    /// queue fails fast with [`DispatchError::Busy`]. Dropping the returned
    /// future before the command starts executing cancels it; once execution
    /// starts it runs to completion.
    #[tracing::instrument(skip(self, command), fields(actor_type = B::actor_type(), %tenant, %entity))]
    pub async fn dispatch(
        &self,
        tenant: TenantId,
        entity: EntityId,
        command: B::Command,
    ) -> Reply<B> {
        let key = Self::key_for(tenant, entity);

        if self.inner.quarantined.lock().await.contains(&key) {
            return Err(DispatchError::Quarantined {
                key: key.to_string(),
            });
        }

        metrics::counter!("runtime_commands_total", "actor_type" => B::actor_type()).increment(1);

        let mut command = command;
        loop {
            let sender = self.mailbox_for(key).await;
            let (respond_to, response) = oneshot::channel();

            match sender.try_send(Msg {
                command,
                respond_to,
            }) {
                Ok(()) => {
                    return response.await.unwrap_or(Err(DispatchError::Shutdown));
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    metrics::counter!("runtime_busy_total", "actor_type" => B::actor_type())
                        .increment(1);
                    return Err(DispatchError::Busy {
                        key: key.to_string(),
                    });
                }
                Err(mpsc::error::TrySendError::Closed(msg)) => {
                    // Lost a race with eviction; drop the stale mailbox and
                    // reactivate.
                    let mut mailboxes = self.inner.mailboxes.lock().await;
                    if let Some(current) = mailboxes.get(&key)
                        && current.same_channel(&sender)
                    {
                        mailboxes.remove(&key);
                    }
                    command = msg.command;
                }
            }
        }
    }

    /// Reads the latest persisted state, bypassing the command queue.
    ///
    /// Never blocks behind queued commands; under contention the result may
    /// trail an in-flight write by one version.
    pub async fn snapshot(
        &self,
        tenant: TenantId,
        entity: EntityId,
    ) -> Result<Option<(B, Version)>, DispatchError<B::Error>> {
        let key = Self::key_for(tenant, entity);
        let envelope = with_backoff(
            self.inner.config.store_retry_attempts,
            self.inner.config.store_retry_base,
            || self.inner.store.load(&key),
        )
        .await
        .map_err(map_store_error)?;

        match envelope {
            Some(env) => {
                let state: B = env
                    .decode()
                    .map_err(|e| DispatchError::Codec(e.to_string()))?;
                Ok(Some((state, env.version)))
            }
            None => Ok(None),
        }
    }

    /// Returns true when the actor is fenced off from further writes.
    pub async fn is_quarantined(&self, tenant: TenantId, entity: EntityId) -> bool {
        let key = Self::key_for(tenant, entity);
        self.inner.quarantined.lock().await.contains(&key)
    }

    /// Operator hook: lifts a quarantine so the next dispatch reactivates
    /// from whatever the store now holds.
    pub async fn lift_quarantine(&self, tenant: TenantId, entity: EntityId) -> bool {
        let key = Self::key_for(tenant, entity);
        self.inner.quarantined.lock().await.remove(&key)
    }

    /// Number of keys with a live mailbox task.
    pub async fn active_actors(&self) -> usize {
        let mut mailboxes = self.inner.mailboxes.lock().await;
        mailboxes.retain(|_, sender| !sender.is_closed());
        mailboxes.len()
    }

    async fn mailbox_for(&self, key: ActorKey) -> mpsc::Sender<Msg<B>> {
        let mut mailboxes = self.inner.mailboxes.lock().await;

        if let Some(sender) = mailboxes.get(&key)
            && !sender.is_closed()
        {
            return sender.clone();
        }

        let (sender, receiver) = mpsc::channel(self.inner.config.mailbox_capacity);
        mailboxes.insert(key, sender.clone());
        tokio::spawn(run_actor(
            Arc::clone(&self.inner),
            key,
            receiver,
            sender.clone(),
        ));
        sender
    }
}

/// The per-key mailbox task: activation, serialized processing, idle
/// eviction with drain-then-exit.
async fn run_actor<B, S>(
    inner: Arc<Inner<B, S>>,
    key: ActorKey,
    mut receiver: mpsc::Receiver<Msg<B>>,
    own_sender: mpsc::Sender<Msg<B>>,
) where
    B: ActorBehavior,
    S: EntityStore + 'static,
{
    tracing::debug!(%key, "actor activated");
    let mut slot: Option<Slot<B>> = None;

    loop {
        let msg = match tokio::time::timeout(inner.config.idle_timeout, receiver.recv()).await {
            Ok(Some(msg)) => msg,
            Ok(None) => break,
            Err(_) => {
                metrics::counter!("runtime_evictions_total", "actor_type" => B::actor_type())
                    .increment(1);
                tracing::debug!(%key, "actor idle, evicting");
                break;
            }
        };

        if msg.respond_to.is_closed() {
            metrics::counter!("runtime_cancelled_total", "actor_type" => B::actor_type())
                .increment(1);
            continue;
        }

        let result = process(&inner, key, &mut slot, msg.command).await;
        let fatal = matches!(result, Err(DispatchError::Quarantined { .. }));
        let _ = msg.respond_to.send(result);
        if fatal {
            break;
        }
    }

    // Deregister, then fence the channel and drain what slipped in; an
    // accepted command is never silently dropped by eviction.
    {
        let mut mailboxes = inner.mailboxes.lock().await;
        if let Some(current) = mailboxes.get(&key)
            && current.same_channel(&own_sender)
        {
            mailboxes.remove(&key);
        }
    }
    drop(own_sender);
    receiver.close();

    while let Ok(msg) = receiver.try_recv() {
        if msg.respond_to.is_closed() {
            continue;
        }
        let result = process(&inner, key, &mut slot, msg.command).await;
        let _ = msg.respond_to.send(result);
    }

    tracing::debug!(%key, "actor deactivated");
}

/// Executes one command: ensure activated, decide, persist with optimistic
/// CAS, publish, reply. All-or-nothing per command.
async fn process<B, S>(
    inner: &Arc<Inner<B, S>>,
    key: ActorKey,
    slot: &mut Option<Slot<B>>,
    command: B::Command,
) -> Reply<B>
where
    B: ActorBehavior,
    S: EntityStore + 'static,
{
    if inner.quarantined.lock().await.contains(&key) {
        return Err(DispatchError::Quarantined {
            key: key.to_string(),
        });
    }

    if slot.is_none() {
        *slot = Some(activate(inner, &key).await?);
    }
    let Some(loaded) = slot.as_mut() else {
        return Err(DispatchError::Codec("actor state slot unavailable".to_string()));
    };

    let mut attempt: u32 = 0;
    loop {
        let ctx = CommandContext {
            key,
            last_applied_event: loaded.last_applied,
        };

        let applied = match loaded.state.handle(&ctx, command.clone()) {
            Ok(applied) => applied,
            Err(err) => {
                metrics::counter!("runtime_domain_errors_total", "actor_type" => B::actor_type())
                    .increment(1);
                return Err(DispatchError::Domain(err));
            }
        };

        if !applied.mutated {
            for event in applied.events {
                inner.fabric.publish(event).await;
            }
            return Ok(DispatchOutcome {
                response: applied.response,
                version: loaded.version,
            });
        }

        let expected_version = loaded.version;
        let next_version = expected_version.next();
        let last_applied = applied.source_event.or(loaded.last_applied);
        let envelope = StateEnvelope::encode(&applied.state, next_version, last_applied)
            .map_err(|e| DispatchError::Codec(e.to_string()))?;

        let save_result = with_backoff(
            inner.config.store_retry_attempts,
            inner.config.store_retry_base,
            || inner.store.save(&key, envelope.clone(), expected_version),
        )
        .await;

        match save_result {
            Ok(version) => {
                loaded.state = applied.state;
                loaded.version = version;
                loaded.last_applied = last_applied;

                for event in applied.events {
                    inner.fabric.publish(event).await;
                }
                return Ok(DispatchOutcome {
                    response: applied.response,
                    version,
                });
            }
            Err(EntityStoreError::VersionConflict { expected, actual, .. }) => {
                attempt += 1;
                metrics::counter!("runtime_conflict_retries_total", "actor_type" => B::actor_type())
                    .increment(1);

                if attempt > inner.config.conflict_retries {
                    // This key has exactly one writer, so a persistent
                    // mismatch means the stored state was changed behind the
                    // runtime's back.
                    tracing::error!(
                        %key,
                        %expected,
                        %actual,
                        "persisted version diverged outside of normal racing; quarantining actor"
                    );
                    metrics::counter!("runtime_quarantines_total", "actor_type" => B::actor_type())
                        .increment(1);
                    inner.quarantined.lock().await.insert(key);
                    return Err(DispatchError::Quarantined {
                        key: key.to_string(),
                    });
                }

                tracing::warn!(%key, %expected, %actual, attempt, "version conflict, reloading");
                *loaded = activate(inner, &key).await?;
            }
            Err(other) => return Err(map_store_error(other)),
        }
    }
}

async fn activate<B, S>(
    inner: &Arc<Inner<B, S>>,
    key: &ActorKey,
) -> Result<Slot<B>, DispatchError<B::Error>>
where
    B: ActorBehavior,
    S: EntityStore + 'static,
{
    let envelope = with_backoff(
        inner.config.store_retry_attempts,
        inner.config.store_retry_base,
        || inner.store.load(key),
    )
    .await
    .map_err(map_store_error)?;

    match envelope {
        Some(env) => {
            let state: B = env
                .decode()
                .map_err(|e| DispatchError::Codec(e.to_string()))?;
            Ok(Slot {
                state,
                version: env.version,
                last_applied: env.last_applied_event_id,
            })
        }
        None => Ok(Slot::fresh()),
    }
}

fn map_store_error<E>(err: EntityStoreError) -> DispatchError<E> {
    match err {
        EntityStoreError::Serialization(e) => DispatchError::Codec(e.to_string()),
        other => DispatchError::Unavailable(other.to_string()),
    }
}
