//! Configuration types for the Telegram adapter.
//!
//! This module defines the `adapters.telegram` section of the global
//! `conduit.toml` configuration file.
//!
//! # Example Configuration
//!
//! ```toml
//! [adapters.telegram]
//! bot_token = "123456:ABC-DEF"        # or CONDUIT_ADAPTERS__TELEGRAM__BOT_TOKEN
//! polling_timeout_secs = 30
//! typing_interval_secs = 4
//! max_message_length = 4096
//! daily_message_limit = 50
//!
//! [adapters.telegram.messages]
//! welcome = "Hi! You can send me up to {daily_message_limit} messages a day."
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use conduit_core::{AdapterError, AdapterResult};
use conduit_transport::DEFAULT_API_URL;

/// Telegram adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot credential issued by BotFather.
    pub bot_token: String,

    /// Base URL of the Bot API.
    pub api_url: String,

    /// Long-poll wait passed to `getUpdates`, in seconds.
    pub polling_timeout_secs: u64,

    /// Interval between `sendChatAction` refreshes, in seconds.
    pub typing_interval_secs: u64,

    /// Maximum length of one outbound message, in characters.
    pub max_message_length: usize,

    /// Number of typing starts between two housekeeping sweeps.
    pub typing_cleanup_threshold: usize,

    /// Default timeout of an API call, in seconds.
    pub api_timeout_secs: u64,

    /// Upper bound on concurrently tracked typing tasks.
    pub max_typing_tasks: usize,

    /// Daily message quota, only used in templates.
    pub daily_message_limit: u32,

    /// Pause after a failed `getUpdates`, in seconds.
    pub poll_error_backoff_secs: u64,

    /// Formatting mode for outbound messages; `None` sends plain text.
    ///
    /// An empty value or `"none"` also selects plain text.
    #[serde(deserialize_with = "deserialize_parse_mode")]
    pub parse_mode: Option<String>,

    /// Bus address of this adapter.
    pub actor_id: String,

    /// Bus address of the session handler.
    pub session_target: String,

    /// Bus address that receives delivered bot responses.
    pub persistence_target: String,

    /// Overrides for the user-facing message templates.
    pub messages: HashMap<String, String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            polling_timeout_secs: 30,
            typing_interval_secs: 4,
            max_message_length: 4096,
            typing_cleanup_threshold: 10,
            api_timeout_secs: 10,
            max_typing_tasks: 1000,
            daily_message_limit: 50,
            poll_error_backoff_secs: 5,
            parse_mode: Some("Markdown".to_string()),
            actor_id: "telegram".to_string(),
            session_target: "user_session".to_string(),
            persistence_target: "user_session".to_string(),
            messages: HashMap::new(),
        }
    }
}

impl TelegramConfig {
    /// Creates a default config with the given token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            bot_token: token.into(),
            ..Self::default()
        }
    }

    /// Checks the values the adapter cannot run without.
    pub fn validate(&self) -> AdapterResult<()> {
        if self.bot_token.trim().is_empty() {
            return Err(AdapterError::configuration(
                "adapters.telegram.bot_token is required",
            ));
        }
        if self.max_message_length == 0 {
            return Err(AdapterError::configuration(
                "adapters.telegram.max_message_length must be greater than 0",
            ));
        }
        if self.max_typing_tasks == 0 {
            return Err(AdapterError::configuration(
                "adapters.telegram.max_typing_tasks must be greater than 0",
            ));
        }
        if self.typing_interval_secs == 0 {
            return Err(AdapterError::configuration(
                "adapters.telegram.typing_interval_secs must be greater than 0",
            ));
        }
        if self.typing_cleanup_threshold == 0 {
            return Err(AdapterError::configuration(
                "adapters.telegram.typing_cleanup_threshold must be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn polling_timeout(&self) -> Duration {
        Duration::from_secs(self.polling_timeout_secs)
    }

    pub fn typing_interval(&self) -> Duration {
        Duration::from_secs(self.typing_interval_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn poll_error_backoff(&self) -> Duration {
        Duration::from_secs(self.poll_error_backoff_secs)
    }
}

/// Maps a blank or `"none"` formatting mode to plain text.
pub(crate) fn normalize_parse_mode(mode: Option<String>) -> Option<String> {
    mode.map(|mode| mode.trim().to_string())
        .filter(|mode| !mode.is_empty() && !mode.eq_ignore_ascii_case("none"))
}

fn deserialize_parse_mode<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(normalize_parse_mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TelegramConfig::default();
        assert_eq!(config.api_url, "https://api.telegram.org");
        assert_eq!(config.polling_timeout(), Duration::from_secs(30));
        assert_eq!(config.typing_interval(), Duration::from_secs(4));
        assert_eq!(config.max_message_length, 4096);
        assert_eq!(config.typing_cleanup_threshold, 10);
        assert_eq!(config.max_typing_tasks, 1000);
        assert_eq!(config.parse_mode.as_deref(), Some("Markdown"));
        assert_eq!(config.session_target, "user_session");
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: TelegramConfig = serde_json::from_value(serde_json::json!({
            "bot_token": "123:abc",
            "max_message_length": 100,
            "messages": { "welcome": "hi" }
        }))
        .unwrap();

        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.max_message_length, 100);
        assert_eq!(config.polling_timeout_secs, 30);
        assert_eq!(config.messages.get("welcome").map(String::as_str), Some("hi"));
    }

    #[test]
    fn test_validate_requires_token() {
        let err = TelegramConfig::default().validate().unwrap_err();
        assert!(matches!(err, AdapterError::Configuration(msg) if msg.contains("bot_token")));
        assert!(TelegramConfig::with_token("123:abc").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let config = TelegramConfig {
            max_typing_tasks: 0,
            ..TelegramConfig::with_token("123:abc")
        };
        assert!(config.validate().is_err());

        let config = TelegramConfig {
            typing_interval_secs: 0,
            ..TelegramConfig::with_token("123:abc")
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, AdapterError::Configuration(msg) if msg.contains("typing_interval_secs"))
        );
    }

    #[test]
    fn test_parse_mode_can_be_disabled() {
        let parse = |value: serde_json::Value| -> TelegramConfig {
            serde_json::from_value(serde_json::json!({ "parse_mode": value })).unwrap()
        };

        assert_eq!(parse(serde_json::json!("")).parse_mode, None);
        assert_eq!(parse(serde_json::json!("None")).parse_mode, None);
        assert_eq!(parse(serde_json::Value::Null).parse_mode, None);
        assert_eq!(
            parse(serde_json::json!("HTML")).parse_mode.as_deref(),
            Some("HTML")
        );

        let config: TelegramConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(config.parse_mode.as_deref(), Some("Markdown"));
    }
}
