//! Conduit Runtime - Orchestration layer for the Conduit chat-to-bus bridge.
//!
//! This crate provides:
//! - Layered configuration (`conduit.toml`, `CONDUIT_*` environment overrides)
//! - Logging setup from configuration
//! - [`LocalBus`], an in-process [`MessageBus`](conduit_core::MessageBus)
//! - [`ConduitRuntime`], which builds adapters from config and drives their lifecycle
//!
//! ```ignore
//! use conduit_runtime::ConduitRuntime;
//! use conduit_adapter_telegram::TelegramAdapter;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = ConduitRuntime::new()?;
//!     runtime.register_handler("user_session", session)?;
//!     runtime.register_adapter::<TelegramAdapter>().await?;
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use bus::LocalBus;
pub use config::{ConduitConfig, ConfigError, ConfigLoader, ConfigResult};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{ConduitRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
