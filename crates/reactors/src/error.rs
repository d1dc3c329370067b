//! Reactor error types.

use runtime::DispatchError;
use thiserror::Error;

/// Errors a reactor can surface to its delivery loop.
///
/// Returning an error asks the host to re-deliver the event (bounded, with
/// backoff); reactors therefore only propagate retryable conditions and
/// swallow-and-log domain rejections.
#[derive(Debug, Error)]
pub enum ReactorError {
    /// A command dispatch into an actor runtime failed transiently.
    #[error("dispatch failed: {0}")]
    Dispatch(String),

    /// An external delivery transport failed.
    #[error("transport failed: {0}")]
    Transport(String),
}

impl<E: std::error::Error> From<DispatchError<E>> for ReactorError {
    fn from(err: DispatchError<E>) -> Self {
        ReactorError::Dispatch(err.to_string())
    }
}

/// Result type for reactor operations.
pub type Result<T> = std::result::Result<T, ReactorError>;
