//! Error types for scopekit.

use thiserror::Error;

/// Main error type for all scope operations.
///
/// Only *recoverable* runtime conditions live here. Misuse of the reply
/// state machine (terminating twice, pushing after a terminal call) and
/// passing an option id a filter does not own are programming errors and
/// panic instead, so they surface loudly in tests. The dispatcher confines
/// such panics to the one request that caused them.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// A push or terminal call could not reach the reply consumer
    /// (e.g. the host runtime disconnected). Does not change reply state;
    /// the caller decides whether to retry, push more, or terminate.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// A value passed to a serializing push could not be encoded.
    /// Reported to the caller; never terminates the reply implicitly.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing or malformed startup configuration. Fatal; reported before
    /// any request processing begins.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O error while reading configuration or settings.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure produced by handler code itself; the dispatcher turns this
    /// into an `error()` call on the reply.
    #[error("{0}")]
    Handler(String),
}

impl ScopeError {
    /// Build a handler failure from any displayable value.
    pub fn handler(msg: impl std::fmt::Display) -> Self {
        ScopeError::Handler(msg.to_string())
    }
}

/// Result type alias using ScopeError.
pub type Result<T> = std::result::Result<T, ScopeError>;
