//! # Conduit Adapter for Telegram
//!
//! Bridges the Telegram Bot API to a Conduit message bus using long polling.
//!
//! ## Overview
//!
//! ```text
//!  getUpdates ─▶ PollingLoop ─▶ UpdateDispatcher ─┬─▶ /start, /other: reply
//!                                                 └─▶ typing + bus ─▶ session
//!
//!  session ─▶ bus ─▶ TelegramAdapter::handle ─┬─▶ MessageSender ─▶ sendMessage
//!                                             └─▶ TypingIndicatorManager
//! ```
//!
//! - [`PollingLoop`]: fetches updates and advances a forward-only [`Cursor`]
//! - [`UpdateDispatcher`]: answers commands, forwards text onto the bus
//! - [`TypingIndicatorManager`]: bounded pool of per-chat "typing" tasks
//! - [`MessageSender`]: chunked delivery with a plain-text fallback
//! - [`TelegramAdapter`]: lifecycle and bus envelope routing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use conduit_runtime::ConduitRuntime;
//! use conduit_adapter_telegram::TelegramAdapter;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = ConduitRuntime::new()?;
//!     runtime.register_adapter::<TelegramAdapter>().await?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

mod adapter;
pub mod bot;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod model;
pub mod polling;
pub mod sender;
pub mod templates;
pub mod typing;

#[cfg(test)]
mod testing;

pub use adapter::{TelegramAdapter, TelegramAdapterBuilder};
pub use bot::TelegramBot;
pub use commands::Command;
pub use config::TelegramConfig;
pub use dispatcher::UpdateDispatcher;
pub use model::{Chat, IncomingText, Message, Update, User};
pub use polling::{Cursor, PollOutcome, PollingLoop, PollingSettings, UpdateHandler};
pub use sender::{DeliveryReport, MessageSender, split_message};
pub use templates::MessageTemplates;
pub use typing::{TypingIndicatorManager, TypingSettings};
