//! User-facing message templates.

use std::collections::HashMap;

/// Template used when an error kind has no template of its own.
pub const FALLBACK_ERROR_KEY: &str = "api_error";

const DEFAULTS: &[(&str, &str)] = &[
    (
        "welcome",
        "Hello! Send me a message and I will answer.\n\nYou can send up to {daily_message_limit} messages per day.",
    ),
    (
        "unknown_command",
        "Sorry, I don't know that command. Just send me a regular message.",
    ),
    (
        "api_error",
        "Something went wrong while preparing an answer. Please try again later.",
    ),
    (
        "timeout_error",
        "Preparing the answer took too long. Please try again.",
    ),
    (
        "rate_limit_exceeded",
        "You have reached today's limit of {daily_message_limit} messages. Please come back tomorrow.",
    ),
];

/// Rendered message templates, keyed by name.
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    templates: HashMap<String, String>,
}

impl MessageTemplates {
    /// Builds the template set from the defaults plus `overrides`, then
    /// substitutes `{daily_message_limit}`.
    pub fn new(overrides: &HashMap<String, String>, daily_message_limit: u32) -> Self {
        let limit = daily_message_limit.to_string();
        let templates = DEFAULTS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .chain(overrides.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect::<HashMap<_, _>>()
            .into_iter()
            .map(|(k, v)| (k, v.replace("{daily_message_limit}", &limit)))
            .collect();

        Self { templates }
    }

    /// Returns the template named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.templates.get(key).map(String::as_str)
    }

    pub fn welcome(&self) -> &str {
        self.get("welcome").unwrap_or_default()
    }

    pub fn unknown_command(&self) -> &str {
        self.get("unknown_command").unwrap_or_default()
    }

    /// Returns the template for an error kind, falling back to `api_error`.
    pub fn error(&self, error_type: Option<&str>) -> &str {
        error_type
            .and_then(|key| self.get(key))
            .or_else(|| self.get(FALLBACK_ERROR_KEY))
            .unwrap_or_default()
    }
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self::new(&HashMap::new(), 50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_substitution() {
        let templates = MessageTemplates::new(&HashMap::new(), 20);
        assert!(templates.welcome().contains("20 messages"));
        assert!(!templates.welcome().contains('{'));
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let overrides = HashMap::from([
            ("welcome".to_string(), "Hi, limit {daily_message_limit}".to_string()),
            ("quota_error".to_string(), "Quota!".to_string()),
        ]);
        let templates = MessageTemplates::new(&overrides, 7);
        assert_eq!(templates.welcome(), "Hi, limit 7");
        assert_eq!(templates.error(Some("quota_error")), "Quota!");
    }

    #[test]
    fn test_error_falls_back_to_api_error() {
        let templates = MessageTemplates::default();
        let fallback = templates.get("api_error").unwrap();
        assert_eq!(templates.error(Some("no_such_kind")), fallback);
        assert_eq!(templates.error(None), fallback);
        assert_ne!(templates.error(Some("timeout_error")), fallback);
    }
}
