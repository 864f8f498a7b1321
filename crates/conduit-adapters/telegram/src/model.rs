//! Telegram Bot API wire types.
//!
//! Only the fields the adapter reads are modelled; everything else in the
//! JSON is ignored on deserialization.

use serde::{Deserialize, Serialize};

/// One entry of a `getUpdates` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Monotonically increasing update identifier.
    pub update_id: i64,
    /// New incoming message, if this update carries one.
    #[serde(default)]
    pub message: Option<Message>,
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    /// Sender; empty for messages sent to channels.
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

/// A conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// A Telegram user or bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// A text message, normalized from an [`Update`].
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingText {
    pub update_id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub text: String,
}

impl Update {
    /// Returns the update's text message.
    ///
    /// `None` for updates without a message, without a sender, or without
    /// non-empty text.
    pub fn text_message(&self) -> Option<IncomingText> {
        let message = self.message.as_ref()?;
        let from = message.from.as_ref()?;
        let text = message.text.as_deref().filter(|t| !t.is_empty())?;

        Some(IncomingText {
            update_id: self.update_id,
            chat_id: message.chat.id,
            user_id: from.id,
            username: from.username.clone(),
            text: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_message() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 101,
            "message": {
                "message_id": 7,
                "date": 1700000000,
                "chat": { "id": 42, "type": "private" },
                "from": { "id": 9, "is_bot": false, "first_name": "Ann", "username": "ann" },
                "text": "hello"
            }
        }))
        .unwrap();

        let incoming = update.text_message().unwrap();
        assert_eq!(incoming.update_id, 101);
        assert_eq!(incoming.chat_id, 42);
        assert_eq!(incoming.user_id, 9);
        assert_eq!(incoming.username.as_deref(), Some("ann"));
        assert_eq!(incoming.text, "hello");
    }

    #[test]
    fn test_non_text_updates_are_dropped() {
        let photo: Update = serde_json::from_value(json!({
            "update_id": 5,
            "message": {
                "message_id": 1,
                "chat": { "id": 1 },
                "from": { "id": 2, "first_name": "B" },
                "photo": []
            }
        }))
        .unwrap();
        assert_eq!(photo.text_message(), None);

        let edited: Update = serde_json::from_value(json!({
            "update_id": 6,
            "edited_message": {}
        }))
        .unwrap();
        assert_eq!(edited.text_message(), None);
    }
}
