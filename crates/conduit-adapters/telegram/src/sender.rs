//! Outbound message delivery.
//!
//! Replies can be longer than the platform's message limit, so they are cut
//! into chunks at paragraph breaks and sent one after another. A chunk that
//! the API rejects with formatting enabled is retried once as plain text; a
//! chunk lost to a network failure or timeout is not resent, since it may
//! already have arrived. Delivery is best-effort per chunk: a chunk that still fails is logged and
//! skipped, so a reply can arrive partially.

use tracing::{debug, error, warn};

use crate::bot::TelegramBot;
use crate::config::normalize_parse_mode;

/// Separator between paragraphs.
pub const PARAGRAPH_BREAK: &str = "\n\n";

/// Outcome of one [`MessageSender::send`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Chunks that were attempted.
    pub chunks: usize,
    /// Chunks the API accepted.
    pub delivered: usize,
    /// Delivered chunks that needed the plain-text retry.
    pub plain_fallbacks: usize,
    /// Chunks that were given up on.
    pub failed: usize,
}

impl DeliveryReport {
    /// Returns `true` when every chunk was delivered.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Splits and sends replies.
pub struct MessageSender {
    bot: TelegramBot,
    max_length: usize,
    parse_mode: Option<String>,
}

impl MessageSender {
    pub fn new(bot: TelegramBot, max_length: usize, parse_mode: Option<String>) -> Self {
        Self {
            bot,
            max_length: max_length.max(1),
            parse_mode: normalize_parse_mode(parse_mode),
        }
    }

    /// Sends `text` to `chat_id`, chunk by chunk and in order.
    pub async fn send(&self, chat_id: i64, text: &str) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for chunk in split_message(text, self.max_length)
            .iter()
            .filter(|chunk| !chunk.trim().is_empty())
        {
            report.chunks += 1;
            match self.send_chunk(chat_id, chunk).await {
                ChunkOutcome::Delivered => report.delivered += 1,
                ChunkOutcome::DeliveredPlain => {
                    report.delivered += 1;
                    report.plain_fallbacks += 1;
                }
                ChunkOutcome::Failed => report.failed += 1,
            }
        }

        debug!(
            chat_id,
            chunks = report.chunks,
            delivered = report.delivered,
            failed = report.failed,
            "Message sent"
        );
        report
    }

    async fn send_chunk(&self, chat_id: i64, chunk: &str) -> ChunkOutcome {
        let Some(mode) = self.parse_mode.as_deref() else {
            return match self.bot.send_message(chat_id, chunk, None).await {
                Ok(_) => ChunkOutcome::Delivered,
                Err(e) => {
                    error!(chat_id, error = %e, "Failed to send message");
                    ChunkOutcome::Failed
                }
            };
        };

        match self.bot.send_message(chat_id, chunk, Some(mode)).await {
            Ok(_) => ChunkOutcome::Delivered,
            Err(e) if !e.is_rejected() => {
                error!(chat_id, error = %e, "Failed to send message");
                ChunkOutcome::Failed
            }
            Err(e) => {
                warn!(
                    chat_id,
                    parse_mode = mode,
                    error = %e,
                    "Formatted send failed, retrying as plain text"
                );
                match self.bot.send_message(chat_id, chunk, None).await {
                    Ok(_) => ChunkOutcome::DeliveredPlain,
                    Err(e) => {
                        error!(chat_id, error = %e, "Failed to send plain message");
                        ChunkOutcome::Failed
                    }
                }
            }
        }
    }
}

enum ChunkOutcome {
    Delivered,
    DeliveredPlain,
    Failed,
}

/// Splits `text` into chunks of at most `max_length` characters.
///
/// Paragraphs are packed greedily: a paragraph joins the current chunk while
/// the result, separator included, still fits. A paragraph that alone exceeds
/// the limit is cut at its last newline or space before the limit, or at the
/// limit itself when it has neither. Nothing is trimmed, so joining the chunks
/// with [`PARAGRAPH_BREAK`] gives back `text` unless a paragraph had to be cut.
pub fn split_message(text: &str, max_length: usize) -> Vec<String> {
    let max_length = max_length.max(1);
    let separator_len = PARAGRAPH_BREAK.chars().count();

    let mut chunks = Vec::new();
    let mut current: Option<(String, usize)> = None;

    for paragraph in text.split(PARAGRAPH_BREAK) {
        let len = paragraph.chars().count();

        if len > max_length {
            if let Some((chunk, _)) = current.take() {
                chunks.push(chunk);
            }
            chunks.extend(split_paragraph(paragraph, max_length));
            continue;
        }

        current = match current.take() {
            Some((mut chunk, chunk_len)) if chunk_len + separator_len + len <= max_length => {
                chunk.push_str(PARAGRAPH_BREAK);
                chunk.push_str(paragraph);
                Some((chunk, chunk_len + separator_len + len))
            }
            Some((chunk, _)) => {
                chunks.push(chunk);
                Some((paragraph.to_string(), len))
            }
            None => Some((paragraph.to_string(), len)),
        };
    }

    if let Some((chunk, _)) = current {
        chunks.push(chunk);
    }
    chunks
}

/// Cuts one oversized paragraph into pieces of at most `max_length` chars.
fn split_paragraph(paragraph: &str, max_length: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = paragraph;

    while let Some((limit, _)) = rest.char_indices().nth(max_length) {
        let window = &rest[..limit];
        match window.rfind('\n').or_else(|| window.rfind(' ')) {
            Some(cut) if cut > 0 => {
                pieces.push(window[..cut].to_string());
                // the separator itself is dropped
                rest = &rest[cut + 1..];
            }
            _ => {
                pieces.push(window.to_string());
                rest = &rest[limit..];
            }
        }
    }

    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}
