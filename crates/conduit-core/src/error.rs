//! Unified error types for Conduit.
//!
//! Every fallible operation in the workspace reports one of three families:
//! remote API calls ([`ApiError`]), bus delivery ([`BusError`]) and adapter
//! lifecycle ([`AdapterError`]).

use thiserror::Error;

// =============================================================================
// API Errors
// =============================================================================

/// Error type for remote API calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// No transport session is open.
    #[error("API session is not open")]
    NotConnected,

    /// The call exceeded its timeout.
    ///
    /// Expected during long polling and not treated as a failure there.
    #[error("API call timed out")]
    Timeout,

    /// Network-level failure (connect, I/O, unreadable response body).
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote API answered with `ok: false`.
    #[error("API rejected the call: {description}")]
    Rejected {
        /// Numeric error code reported by the API, if any.
        error_code: Option<i64>,
        /// Human-readable description reported by the API.
        description: String,
    },

    /// Failed to serialize a request or deserialize a result.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Returns `true` for [`ApiError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if the remote API declined the call.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Bus Errors
// =============================================================================

/// Errors reported by a [`MessageBus`](crate::MessageBus).
#[derive(Debug, Clone, Error)]
pub enum BusError {
    /// No handler is registered under the target name.
    #[error("no handler registered for '{0}'")]
    UnknownTarget(String),

    /// The bus is no longer accepting envelopes.
    #[error("message bus is closed")]
    Closed,

    /// An envelope payload did not match the expected shape.
    #[error("malformed envelope payload: {0}")]
    MalformedPayload(String),
}

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors that can occur in adapter operations.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// Missing or invalid configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A remote API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The bus refused an envelope.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Internal adapter error.
    #[error("adapter error: {0}")]
    Internal(String),
}

impl AdapterError {
    /// Creates a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an internal adapter error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_display() {
        let err = ApiError::Rejected {
            error_code: Some(400),
            description: "Bad Request: can't parse entities".into(),
        };
        assert_eq!(
            err.to_string(),
            "API rejected the call: Bad Request: can't parse entities"
        );
        assert!(err.is_rejected());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_adapter_error_from_api() {
        let err: AdapterError = ApiError::Timeout.into();
        assert!(matches!(err, AdapterError::Api(ApiError::Timeout)));
    }
}
