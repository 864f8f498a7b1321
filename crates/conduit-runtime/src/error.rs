//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Adapter configuration deserialization failed.
    #[error("Failed to deserialize adapter config: {0}")]
    AdapterConfigDeserialize(String),

    /// Adapter error.
    #[error("Adapter error: {0}")]
    Adapter(#[from] conduit_core::AdapterError),

    /// An adapter failed to initialize; adapters started before it were shut down.
    #[error("Adapter '{name}' failed to start: {source}")]
    AdapterStart {
        name: String,
        #[source]
        source: conduit_core::AdapterError,
    },

    /// A bus name is already taken by an adapter or handler.
    #[error("Bus name already registered: {0}")]
    NameTaken(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
