//! Telegram adapter for Conduit.
//!
//! The adapter owns the polling task, the typing pool and the outbound
//! sender, and is the bus handler registered under its `actor_id`.
//!
//! # Configuration-Based Usage (Recommended)
//!
//! ```toml
//! [adapters.telegram]
//! bot_token = "123456:ABC-DEF"
//! ```
//!
//! ```rust,ignore
//! let runtime = ConduitRuntime::new()?;
//! runtime.register_adapter::<TelegramAdapter>().await?;
//! runtime.run().await?;
//! ```
//!
//! # Programmatic Usage
//!
//! ```rust,ignore
//! let adapter = TelegramAdapter::builder()
//!     .token("123456:ABC-DEF")
//!     .bus(bus)
//!     .build()?;
//! adapter.initialize().await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use conduit_core::{
    Adapter, AdapterError, AdapterResult, BotResponsePayload, BoxedApiCaller, BoxedBus,
    ConfigurableAdapter, Envelope, EnvelopeHandler, ErrorPayload, MessageType,
    UserMessagePayload,
};
use conduit_transport::{HttpApiClient, HttpClientConfig};

use crate::bot::TelegramBot;
use crate::config::TelegramConfig;
use crate::dispatcher::UpdateDispatcher;
use crate::polling::{Cursor, PollingLoop, PollingSettings};
use crate::sender::MessageSender;
use crate::templates::MessageTemplates;
use crate::typing::{TypingIndicatorManager, TypingSettings};

struct PollerHandle {
    cancel: CancellationToken,
    task: JoinHandle<Cursor>,
}

/// Occupancy of the polling slot.
enum PollerState {
    /// `initialize` is checking credentials.
    Starting,
    Running(PollerHandle),
}

/// The Telegram long-poll adapter.
pub struct TelegramAdapter {
    config: TelegramConfig,
    bot: TelegramBot,
    bus: BoxedBus,
    templates: Arc<MessageTemplates>,
    sender: Arc<MessageSender>,
    typing: Arc<TypingIndicatorManager>,
    dispatcher: Arc<UpdateDispatcher>,
    poller: Mutex<Option<PollerState>>,
}

impl TelegramAdapter {
    /// Creates an adapter builder.
    pub fn builder() -> TelegramAdapterBuilder {
        TelegramAdapterBuilder::default()
    }

    /// Returns the adapter configuration.
    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    /// Returns the typing pool.
    pub fn typing(&self) -> &TypingIndicatorManager {
        &self.typing
    }

    /// Returns whether the polling task is running.
    pub fn is_polling(&self) -> bool {
        matches!(
            self.poller.lock().as_ref(),
            Some(PollerState::Running(poller)) if !poller.task.is_finished()
        )
    }

    /// Cancels the polling task and waits for it to finish the batch it is
    /// dispatching.
    async fn stop_polling(&self) {
        let poller = self.poller.lock().take();
        if let Some(PollerState::Running(PollerHandle { cancel, task })) = poller {
            cancel.cancel();
            match task.await {
                Ok(cursor) => debug!(offset = cursor.value(), "Polling task finished"),
                Err(e) => warn!(error = %e, "Polling task ended abnormally"),
            }
        }
    }

    // =========================================================================
    // Envelope routing
    // =========================================================================

    /// Hands a user message produced by the dispatcher to the session handler.
    async fn forward_to_session(&self, envelope: Envelope) {
        let payload: UserMessagePayload = match envelope.payload_as() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Dropping envelope");
                return;
            }
        };

        let forwarded =
            envelope.readdressed(self.config.actor_id.as_str(), MessageType::UserMessage);
        let target = &self.config.session_target;
        match self.bus.send(target, forwarded).await {
            Ok(()) => debug!(
                chat_id = payload.chat_id,
                to = %target,
                "User message forwarded"
            ),
            Err(e) => {
                error!(
                    chat_id = payload.chat_id,
                    to = %target,
                    error = %e,
                    "Failed to forward user message"
                );
                self.typing.stop(payload.chat_id);
            }
        }
    }

    /// Delivers a finished reply and passes it on for persistence.
    async fn deliver_response(&self, envelope: Envelope) {
        let payload: BotResponsePayload = match envelope.payload_as() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Dropping envelope");
                return;
            }
        };

        self.typing.stop(payload.chat_id);
        let report = self.sender.send(payload.chat_id, &payload.text).await;
        if !report.is_complete() {
            warn!(
                chat_id = payload.chat_id,
                failed = report.failed,
                chunks = report.chunks,
                "Response was delivered partially"
            );
        }

        let target = &self.config.persistence_target;
        if let Err(e) = self.bus.send(target, envelope).await {
            error!(
                chat_id = payload.chat_id,
                to = %target,
                error = %e,
                "Failed to forward bot response"
            );
        }
    }

    /// Tells the user that no reply is coming.
    async fn deliver_error(&self, envelope: Envelope) {
        let payload: ErrorPayload = match envelope.payload_as() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Dropping envelope");
                return;
            }
        };

        self.typing.stop(payload.chat_id);
        debug!(
            chat_id = payload.chat_id,
            error_type = payload.error_type.as_deref().unwrap_or_default(),
            "Sending error message"
        );
        let text = self.templates.error(payload.error_type.as_deref());
        self.sender.send(payload.chat_id, text).await;
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`TelegramAdapter`].
#[derive(Default)]
pub struct TelegramAdapterBuilder {
    config: TelegramConfig,
    api: Option<BoxedApiCaller>,
    bus: Option<BoxedBus>,
}

impl TelegramAdapterBuilder {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: TelegramConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the bot token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.bot_token = token.into();
        self
    }

    /// Sets the Bot API base URL.
    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.config.api_url = api_url.into();
        self
    }

    /// Uses `api` instead of an HTTP client built from the config.
    pub fn api_caller(mut self, api: BoxedApiCaller) -> Self {
        self.api = Some(api);
        self
    }

    /// Sets the bus the adapter sends to.
    pub fn bus(mut self, bus: BoxedBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Builds the adapter.
    pub fn build(self) -> AdapterResult<Arc<TelegramAdapter>> {
        let Self { config, api, bus } = self;
        let bus = bus.ok_or_else(|| AdapterError::configuration("a message bus is required"))?;

        let api: BoxedApiCaller = match api {
            Some(api) => api,
            None => Arc::new(HttpApiClient::new(
                HttpClientConfig::new(config.bot_token.clone())
                    .with_api_url(config.api_url.clone())
                    .with_timeout(config.api_timeout()),
            )),
        };

        let bot = TelegramBot::new(api);
        let templates = Arc::new(MessageTemplates::new(
            &config.messages,
            config.daily_message_limit,
        ));
        let sender = Arc::new(MessageSender::new(
            bot.clone(),
            config.max_message_length,
            config.parse_mode.clone(),
        ));
        let typing = Arc::new(TypingIndicatorManager::new(
            bot.clone(),
            TypingSettings::from(&config),
        ));
        let dispatcher = Arc::new(UpdateDispatcher::new(
            config.actor_id.clone(),
            bus.clone(),
            sender.clone(),
            typing.clone(),
            templates.clone(),
        ));

        Ok(Arc::new(TelegramAdapter {
            config,
            bot,
            bus,
            templates,
            sender,
            typing,
            dispatcher,
            poller: Mutex::new(None),
        }))
    }
}

// =============================================================================
// Trait implementations
// =============================================================================

#[async_trait]
impl Adapter for TelegramAdapter {
    fn name(&self) -> &str {
        &self.config.actor_id
    }

    async fn initialize(&self) -> AdapterResult<()> {
        self.config.validate()?;

        {
            let mut slot = self.poller.lock();
            if slot.is_some() {
                warn!("Telegram adapter is already running");
                return Ok(());
            }
            *slot = Some(PollerState::Starting);
        }

        if let Err(e) = self.bot.open().await {
            *self.poller.lock() = None;
            return Err(e.into());
        }
        match self.bot.get_me().await {
            Ok(me) => info!(
                bot_id = me.id,
                username = me.username.as_deref().unwrap_or_default(),
                "Telegram bot authenticated"
            ),
            Err(e) => {
                error!(error = %e, "Telegram credential check failed");
                *self.poller.lock() = None;
                self.bot.close().await;
                return Err(e.into());
            }
        }

        let started = {
            let mut slot = self.poller.lock();
            if matches!(*slot, Some(PollerState::Starting)) {
                let cancel = CancellationToken::new();
                let polling = PollingLoop::new(
                    self.bot.clone(),
                    self.dispatcher.clone(),
                    PollingSettings::from(&self.config),
                );
                let task = tokio::spawn(polling.run(cancel.clone()));
                *slot = Some(PollerState::Running(PollerHandle { cancel, task }));
                true
            } else {
                false
            }
        };

        if !started {
            warn!("Telegram adapter was stopped while starting");
            self.bot.close().await;
            return Err(AdapterError::internal(
                "adapter was stopped before polling started",
            ));
        }

        info!(actor_id = %self.config.actor_id, "Telegram adapter started");
        Ok(())
    }

    async fn stop_receiving(&self) {
        self.stop_polling().await;
        debug!(actor_id = %self.config.actor_id, "Telegram polling stopped");
    }

    async fn shutdown(&self) {
        self.stop_polling().await;
        self.typing.stop_all().await;
        self.bot.close().await;
        info!(actor_id = %self.config.actor_id, "Telegram adapter stopped");
    }
}

#[async_trait]
impl EnvelopeHandler for TelegramAdapter {
    async fn handle(&self, envelope: Envelope) {
        trace!(
            message_type = %envelope.message_type,
            sender = %envelope.sender_id,
            "Envelope received"
        );

        match envelope.message_type {
            MessageType::ProcessUserMessage => self.forward_to_session(envelope).await,
            MessageType::BotResponse => self.deliver_response(envelope).await,
            MessageType::Error => self.deliver_error(envelope).await,
            // streaming delivery is not supported yet
            MessageType::StreamingChunk => {}
            other => debug!(message_type = %other, "Ignoring envelope"),
        }
    }
}

impl ConfigurableAdapter for TelegramAdapter {
    type Config = TelegramConfig;

    fn config_key() -> &'static str {
        "telegram"
    }

    fn from_config(config: Self::Config, bus: BoxedBus) -> AdapterResult<Arc<Self>> {
        Self::builder().config(config).bus(bus).build()
    }
}
