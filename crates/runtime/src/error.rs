//! Runtime error types and the stable error-code contract.

use thiserror::Error;

/// Stable machine-readable error codes, plus retryability.
///
/// Business errors map to the 4xx-equivalent class (`retryable() == false`);
/// infrastructure errors map to the 5xx-equivalent class and may be retried
/// with backoff by the caller.
pub trait ErrorCode {
    /// Returns a stable error code string for callers and logs.
    fn error_code(&self) -> &'static str;

    /// Returns true when the caller should retry with backoff.
    fn retryable(&self) -> bool;
}

/// Errors surfaced by [`crate::ActorRuntime::dispatch`].
///
/// Domain errors pass through as the transparent `Domain` variant; the
/// remaining variants originate in the runtime itself.
#[derive(Debug, Error)]
pub enum DispatchError<E> {
    /// The actor's command queue is full; retry with backoff.
    #[error("mailbox full for {key}")]
    Busy { key: String },

    /// The persisted version diverged from the single writer's expectation;
    /// the actor no longer accepts writes until an operator lifts the
    /// quarantine.
    #[error("actor {key} is quarantined pending operator intervention")]
    Quarantined { key: String },

    /// The entity store stayed unavailable through the bounded retries.
    #[error("entity store unavailable: {0}")]
    Unavailable(String),

    /// The actor task went away before replying (runtime shutdown or
    /// eviction race); safe to retry.
    #[error("actor terminated before replying")]
    Shutdown,

    /// State failed to encode or decode; not retryable.
    #[error("state codec failure: {0}")]
    Codec(String),

    /// Typed domain failure from the behavior; state is unchanged.
    #[error(transparent)]
    Domain(E),
}

impl<E: ErrorCode> ErrorCode for DispatchError<E> {
    fn error_code(&self) -> &'static str {
        match self {
            DispatchError::Busy { .. } => "busy",
            DispatchError::Quarantined { .. } => "quarantined",
            DispatchError::Unavailable(_) => "unavailable",
            DispatchError::Shutdown => "unavailable",
            DispatchError::Codec(_) => "internal",
            DispatchError::Domain(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            DispatchError::Busy { .. } => true,
            DispatchError::Unavailable(_) => true,
            DispatchError::Shutdown => true,
            DispatchError::Quarantined { .. } => false,
            DispatchError::Codec(_) => false,
            DispatchError::Domain(e) => e.retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("points exhausted")]
    struct SampleError;

    impl ErrorCode for SampleError {
        fn error_code(&self) -> &'static str {
            "insufficient_points"
        }

        fn retryable(&self) -> bool {
            false
        }
    }

    #[test]
    fn domain_errors_pass_codes_through() {
        let err: DispatchError<SampleError> = DispatchError::Domain(SampleError);
        assert_eq!(err.error_code(), "insufficient_points");
        assert!(!err.retryable());
        assert_eq!(err.to_string(), "points exhausted");
    }

    #[test]
    fn infrastructure_errors_are_retryable() {
        let err: DispatchError<SampleError> = DispatchError::Busy {
            key: "t/recipe/e".to_string(),
        };
        assert_eq!(err.error_code(), "busy");
        assert!(err.retryable());

        let err: DispatchError<SampleError> = DispatchError::Quarantined {
            key: "t/recipe/e".to_string(),
        };
        assert!(!err.retryable());
    }
}
