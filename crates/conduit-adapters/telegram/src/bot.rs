//! Typed Telegram Bot API.
//!
//! [`TelegramBot`] turns the handful of Bot API methods the adapter needs
//! into strongly-typed calls on top of any [`ApiCaller`]. It performs no
//! retries; callers decide what a failure means.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::trace;

use conduit_core::{ApiRequest, ApiResult, BoxedApiCaller};

use crate::model::{Update, User};

/// Extra HTTP time granted on top of the long-poll wait.
pub const LONG_POLL_GRACE: Duration = Duration::from_secs(5);

/// Chat action shown while an answer is being prepared.
pub const TYPING_ACTION: &str = "typing";

/// A Telegram bot bound to one API caller.
#[derive(Clone)]
pub struct TelegramBot {
    api: BoxedApiCaller,
}

impl TelegramBot {
    /// Creates a bot over `api`.
    pub fn new(api: BoxedApiCaller) -> Self {
        Self { api }
    }

    /// Returns the underlying API caller.
    pub fn api(&self) -> &BoxedApiCaller {
        &self.api
    }

    /// Opens the transport session.
    pub async fn open(&self) -> ApiResult<()> {
        self.api.open().await
    }

    /// Closes the transport session.
    pub async fn close(&self) {
        self.api.close().await;
    }

    // =========================================================================
    // Bot API methods
    // =========================================================================

    /// Returns the bot's own identity. Used as a credential check.
    pub async fn get_me(&self) -> ApiResult<User> {
        let result = self.api.call(ApiRequest::new("getMe")).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Long-polls for updates starting at `offset`.
    ///
    /// The server holds the request for up to `wait`; the HTTP timeout is
    /// `wait` plus [`LONG_POLL_GRACE`].
    pub async fn get_updates(&self, offset: i64, wait: Duration) -> ApiResult<Vec<Update>> {
        let request = ApiRequest::new("getUpdates")
            .query(json!({
                "offset": offset,
                "timeout": wait.as_secs(),
                "allowed_updates": ["message"],
            }))
            .timeout(wait + LONG_POLL_GRACE);

        let result = self.api.call(request).await?;
        let updates: Vec<Update> = serde_json::from_value(result)?;
        trace!(offset, count = updates.len(), "Fetched updates");
        Ok(updates)
    }

    /// Sends a text message, optionally with a formatting mode.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<&str>,
    ) -> ApiResult<Value> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = json!(mode);
        }

        self.api
            .call(ApiRequest::new("sendMessage").body(body))
            .await
    }

    /// Shows a chat action such as [`TYPING_ACTION`] in `chat_id`.
    pub async fn send_chat_action(&self, chat_id: i64, action: &str) -> ApiResult<()> {
        self.api
            .call(ApiRequest::new("sendChatAction").body(json!({
                "chat_id": chat_id,
                "action": action,
            })))
            .await?;
        Ok(())
    }
}
