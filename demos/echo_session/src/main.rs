//! Echo Session Demo
//!
//! Runs the Telegram adapter on an in-process bus next to a toy session
//! handler that answers every message with an echo.
//!
//! ```text
//! Telegram ─▶ telegram adapter ─▶ user_session (EchoSession)
//!     ▲                                  │
//!     └──────── bot_response ◀───────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! CONDUIT_ADAPTERS__TELEGRAM__BOT_TOKEN=123:abc cargo run --package echo-session
//! cargo run --package echo-session -- --config demos/echo_session/conduit.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use conduit_adapter_telegram::TelegramAdapter;
use conduit_core::{
    Adapter, BotResponsePayload, BoxedBus, Envelope, EnvelopeHandler, MessageBus, MessageType,
    UserMessagePayload,
};
use conduit_runtime::ConduitRuntime;
use tracing::{debug, error, info, warn};

/// Bus name the Telegram adapter forwards user messages to by default.
const SESSION_NAME: &str = "user_session";

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file to load instead of searching for conduit.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. "production".
    #[arg(short, long)]
    profile: Option<String>,
}

// ============================================================================
// Session Handler
// ============================================================================

/// Answers each user message with an echo of its text.
struct EchoSession {
    bus: BoxedBus,
    reply_to: String,
}

impl EchoSession {
    async fn reply(&self, message: UserMessagePayload) {
        let response = BotResponsePayload {
            chat_id: message.chat_id,
            text: format!("You said:\n\n{}", message.text),
        };

        let sent = match Envelope::with_payload(SESSION_NAME, MessageType::BotResponse, &response) {
            Ok(envelope) => self.bus.send(&self.reply_to, envelope).await,
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            error!(chat_id = message.chat_id, error = %e, "Failed to send response");
        }
    }
}

#[async_trait]
impl EnvelopeHandler for EchoSession {
    async fn handle(&self, envelope: Envelope) {
        match envelope.message_type {
            MessageType::UserMessage => match envelope.payload_as::<UserMessagePayload>() {
                Ok(message) => {
                    info!(
                        chat_id = message.chat_id,
                        user = message.username.as_deref().unwrap_or("unknown"),
                        "Echoing message"
                    );
                    self.reply(message).await;
                }
                Err(e) => warn!(error = %e, "Dropping malformed user message"),
            },
            // The adapter hands delivered responses back for persistence.
            MessageType::BotResponse => {
                debug!(sender = %envelope.sender_id, "Response delivered");
            }
            other => debug!(message_type = %other, "Ignoring envelope"),
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = ConduitRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build()?;

    let telegram = runtime.register_adapter::<TelegramAdapter>().await?;

    let session = EchoSession {
        bus: runtime.bus().clone(),
        reply_to: telegram.name().to_string(),
    };
    runtime.register_handler(SESSION_NAME, Arc::new(session))?;

    runtime.run().await?;

    Ok(())
}
