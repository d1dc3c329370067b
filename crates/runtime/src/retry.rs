//! Bounded exponential backoff for entity store calls.

use std::future::Future;
use std::time::Duration;

use entity_store::EntityStoreError;

/// Returns true for failures worth retrying. Version conflicts are handled
/// by the caller's reload path and serialization failures are permanent.
fn is_transient(err: &EntityStoreError) -> bool {
    matches!(err, EntityStoreError::Database(_))
}

/// Runs `op` up to `attempts` times, sleeping `base * 2^n` between tries.
pub(crate) async fn with_backoff<T, F, Fut>(
    attempts: u32,
    base: Duration,
    mut op: F,
) -> Result<T, EntityStoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EntityStoreError>>,
{
    let mut delay = base;
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < attempts && is_transient(&err) => {
                attempt += 1;
                tracing::warn!(error = %err, attempt, "entity store call failed, backing off");
                metrics::counter!("runtime_store_retries_total").increment(1);
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn returns_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = Arc::clone(&calls);

        let result = with_backoff(3, Duration::from_millis(1), move || {
            let counted = Arc::clone(&counted);
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok::<_, EntityStoreError>(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn conflict_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = Arc::clone(&calls);

        let result: Result<(), _> = with_backoff(5, Duration::from_millis(1), move || {
            let counted = Arc::clone(&counted);
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Err(EntityStoreError::VersionConflict {
                    key: "k".to_string(),
                    expected: entity_store::Version::first(),
                    actual: entity_store::Version::new(2),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
