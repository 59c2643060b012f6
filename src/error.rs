//! Error types for the Premia SDK.

use thiserror::Error;

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, PremiaError>;

/// Errors returned by the Premia SDK.
///
/// Every failure is reported as a value to the immediate caller; the SDK
/// never panics on bad input and never retries on its own. `TooManyRequests`
/// and `InvalidActivationState` are raised before any network traffic.
#[derive(Debug, Error)]
pub enum PremiaError {
    /// A required input was blank.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// The operation requires an active license and none is present.
    #[error("no active license for this install")]
    NotActive,

    /// A state-machine precondition failed; no network call was attempted.
    #[error("invalid activation state: {0}")]
    InvalidActivationState(String),

    /// The operation is throttled; retry after the marker expires.
    #[error("too many requests, a recent check is still in effect")]
    TooManyRequests,

    /// Network-level failure (DNS, connect, timeout, TLS).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service returned a structured `{error: {code, message}}` body.
    #[error("remote error [{code}]: {message}")]
    Remote { code: String, message: String },

    /// A success response was missing a field the remote contract guarantees.
    #[error("unexpected response shape: {0}")]
    ContractViolation(String),

    /// Client-side input validation failed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The option store rejected a write.
    #[error("storage error: {0}")]
    Storage(String),

    /// JSON (de)serialization failure outside the transport path.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PremiaError {
    /// Network-level failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Client-side validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Structured error returned by the licensing service.
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether this error was produced without touching the network.
    pub fn is_local(&self) -> bool {
        !matches!(
            self,
            Self::Transport(_) | Self::Remote { .. } | Self::ContractViolation(_)
        )
    }
}
