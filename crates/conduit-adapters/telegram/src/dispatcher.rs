//! Interpretation of incoming updates.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, error, info, trace, warn};

use conduit_core::{BoxedBus, BusError, BusResult, Envelope, MessageType, UserMessagePayload};

use crate::commands::Command;
use crate::model::{IncomingText, Update};
use crate::polling::UpdateHandler;
use crate::sender::MessageSender;
use crate::templates::MessageTemplates;
use crate::typing::TypingIndicatorManager;

/// Routes updates to the local command table or onto the bus.
///
/// Commands are answered right away. Any other text starts a typing
/// indicator and is sent to the adapter's own bus address as a
/// [`MessageType::ProcessUserMessage`]; the reply arrives later as a
/// separate envelope.
pub struct UpdateDispatcher {
    actor_id: String,
    bus: BoxedBus,
    sender: Arc<MessageSender>,
    typing: Arc<TypingIndicatorManager>,
    templates: Arc<MessageTemplates>,
}

impl UpdateDispatcher {
    pub fn new(
        actor_id: impl Into<String>,
        bus: BoxedBus,
        sender: Arc<MessageSender>,
        typing: Arc<TypingIndicatorManager>,
        templates: Arc<MessageTemplates>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            bus,
            sender,
            typing,
            templates,
        }
    }

    async fn run_command(&self, message: &IncomingText, command: Command) {
        let reply = match &command {
            Command::Start => {
                info!(
                    chat_id = message.chat_id,
                    user_id = message.user_id,
                    "User started the bot"
                );
                self.templates.welcome()
            }
            Command::Unknown(name) => {
                debug!(chat_id = message.chat_id, command = %name, "Unknown command");
                self.templates.unknown_command()
            }
        };
        self.sender.send(message.chat_id, reply).await;
    }

    /// Queues `message` on the bus. Only a closed bus is reported back, since
    /// the update can be fetched again once the bus accepts envelopes.
    async fn forward(&self, message: IncomingText) -> BusResult<()> {
        let chat_id = message.chat_id;
        self.typing.start(chat_id);

        let payload = UserMessagePayload {
            user_id: message.user_id.to_string(),
            chat_id,
            username: message.username,
            text: message.text,
            timestamp: now_rfc3339(),
        };

        let sent = match Envelope::with_payload(
            self.actor_id.as_str(),
            MessageType::ProcessUserMessage,
            &payload,
        ) {
            Ok(envelope) => self.bus.send(&self.actor_id, envelope).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => {
                debug!(chat_id, "User message queued for processing");
                Ok(())
            }
            Err(BusError::Closed) => {
                warn!(chat_id, "Bus is closed, user message not queued");
                self.typing.stop(chat_id);
                Err(BusError::Closed)
            }
            Err(e) => {
                error!(chat_id, error = %e, "Failed to queue user message");
                self.typing.stop(chat_id);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl UpdateHandler for UpdateDispatcher {
    async fn handle_update(&self, update: Update) -> BusResult<()> {
        let Some(message) = update.text_message() else {
            trace!(update_id = update.update_id, "Ignoring update without text");
            return Ok(());
        };

        match Command::parse(&message.text) {
            Some(command) => {
                self.run_command(&message, command).await;
                Ok(())
            }
            None => self.forward(message).await,
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
