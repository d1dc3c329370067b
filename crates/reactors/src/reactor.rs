//! The reactor contract.

use async_trait::async_trait;
use fabric::{Namespace, StreamEvent};

use crate::Result;

/// An actor-independent event consumer.
///
/// Each reactor names the namespaces it subscribes to and processes one
/// event at a time per namespace, in partition order. Delivery is
/// at-least-once: handlers must tolerate duplicates (via
/// [`fabric::DuplicateFilter`] or domain idempotency keys) and must not
/// assume ordering across different source actors.
#[async_trait]
pub trait Reactor: Send + Sync + 'static {
    /// Returns the reactor's name, for logs and metrics.
    fn name(&self) -> &'static str;

    /// The namespaces this reactor consumes.
    fn namespaces(&self) -> &'static [Namespace];

    /// Handles a single event. An `Err` asks the host for a bounded
    /// re-delivery; unrecoverable domain rejections are logged and
    /// swallowed inside the handler instead.
    async fn handle(&self, event: &StreamEvent) -> Result<()>;
}
