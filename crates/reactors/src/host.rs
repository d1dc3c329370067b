//! Reactor delivery host.

use std::sync::Arc;
use std::time::Duration;

use fabric::EventFabric;
use futures_util::StreamExt;
use tokio::task::JoinHandle;

use crate::reactor::Reactor;

const DELIVERY_ATTEMPTS: u32 = 4;
const DELIVERY_RETRY_BASE: Duration = Duration::from_millis(25);

/// Runs registered reactors against the fabric.
///
/// Each (reactor, namespace) pair gets its own delivery task, so one
/// reactor's slow handler never blocks delivery to another subscriber
/// group. Within one pair, events arrive in partition order; a failing
/// handler is retried with backoff a bounded number of times, then the
/// event is logged and skipped.
pub struct ReactorHost {
    fabric: EventFabric,
    handles: Vec<JoinHandle<()>>,
}

impl ReactorHost {
    /// Creates a host over the given fabric.
    pub fn new(fabric: EventFabric) -> Self {
        Self {
            fabric,
            handles: Vec::new(),
        }
    }

    /// Spawns delivery tasks for a reactor, one per subscribed namespace.
    pub fn spawn(&mut self, reactor: Arc<dyn Reactor>) {
        for namespace in reactor.namespaces() {
            let mut stream = self.fabric.subscribe(*namespace);
            let reactor = Arc::clone(&reactor);
            let namespace = *namespace;

            self.handles.push(tokio::spawn(async move {
                tracing::debug!(reactor = reactor.name(), %namespace, "delivery task started");
                while let Some((offset, event)) = stream.next().await {
                    deliver(reactor.as_ref(), &event, offset).await;
                }
            }));
        }
    }

    /// Number of live delivery tasks.
    pub fn task_count(&self) -> usize {
        self.handles.len()
    }

    /// Stops all delivery tasks.
    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

async fn deliver(reactor: &dyn Reactor, event: &fabric::StreamEvent, offset: usize) {
    let mut delay = DELIVERY_RETRY_BASE;

    for attempt in 0..DELIVERY_ATTEMPTS {
        match reactor.handle(event).await {
            Ok(()) => {
                metrics::counter!("reactor_events_processed_total", "reactor" => reactor.name())
                    .increment(1);
                return;
            }
            Err(err) => {
                tracing::warn!(
                    reactor = reactor.name(),
                    event_id = %event.event_id,
                    offset,
                    attempt,
                    error = %err,
                    "reactor handler failed"
                );
                metrics::counter!("reactor_delivery_retries_total", "reactor" => reactor.name())
                    .increment(1);
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }

    tracing::error!(
        reactor = reactor.name(),
        event_id = %event.event_id,
        offset,
        "event dropped after repeated handler failures"
    );
    metrics::counter!("reactor_events_dropped_total", "reactor" => reactor.name()).increment(1);
}
