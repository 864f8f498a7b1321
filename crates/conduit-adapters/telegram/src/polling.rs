//! Long-poll ingestion.
//!
//! [`PollingLoop`] fetches updates with `getUpdates`, hands each one to an
//! [`UpdateHandler`] in the order received, and moves its [`Cursor`] past
//! each update only once the handler has taken it over. A crash mid-batch
//! therefore redelivers the rest of that batch on restart, and an update the
//! handler refuses is fetched again after a backoff. No update is skipped.
//!
//! ```text
//!            ┌──────────── cancelled ────────────┐
//!            ▼                                   │
//!   Stopped ◀── Running: fetch ─▶ dispatch ─▶ advance
//!                          │          │
//!                          │          └─ refused ─┐
//!                          └─ error ──────────────┴─▶ backoff ─▶ fetch
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use conduit_core::{ApiResult, BusResult};

use crate::bot::TelegramBot;
use crate::config::TelegramConfig;
use crate::model::Update;

/// The next update id to request.
///
/// Only moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(i64);

impl Cursor {
    pub fn new(offset: i64) -> Self {
        Self(offset)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    /// Moves past a batch whose highest update id is `max_update_id`.
    pub fn advance(&mut self, max_update_id: i64) {
        self.0 = self.0.max(max_update_id.saturating_add(1));
    }
}

/// Receives fetched updates.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    /// Handles one update.
    ///
    /// An error means the update was not taken over. The loop stops the
    /// batch there and fetches that update again.
    async fn handle_update(&self, update: Update) -> BusResult<()>;
}

/// Result of one poll step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A batch of this many updates was dispatched.
    Batch(usize),
    /// Nothing new, including a long poll that timed out.
    Idle,
    /// The handler refused an update after taking this many; the caller
    /// should back off.
    Refused(usize),
    /// The fetch failed; the caller should back off.
    Failed,
}

/// Timing of the polling loop.
#[derive(Debug, Clone, Copy)]
pub struct PollingSettings {
    /// Long-poll wait passed to the server.
    pub wait: Duration,
    /// Pause after a failed fetch.
    pub backoff: Duration,
}

impl From<&TelegramConfig> for PollingSettings {
    fn from(config: &TelegramConfig) -> Self {
        Self {
            wait: config.polling_timeout(),
            backoff: config.poll_error_backoff(),
        }
    }
}

pub struct PollingLoop {
    bot: TelegramBot,
    handler: Arc<dyn UpdateHandler>,
    settings: PollingSettings,
    cursor: Cursor,
}

impl PollingLoop {
    pub fn new(
        bot: TelegramBot,
        handler: Arc<dyn UpdateHandler>,
        settings: PollingSettings,
    ) -> Self {
        Self {
            bot,
            handler,
            settings,
            cursor: Cursor::default(),
        }
    }

    /// Starts from `cursor` instead of zero.
    pub fn with_cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Fetches once, dispatches the batch and advances the cursor.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let fetched = self.fetch().await;
        self.process(fetched).await
    }

    /// Polls until `cancel` fires and returns the final cursor.
    ///
    /// Cancellation interrupts a pending fetch or backoff, never a dispatch.
    pub async fn run(mut self, cancel: CancellationToken) -> Cursor {
        info!(offset = self.cursor.value(), "Polling started");

        loop {
            let fetched = tokio::select! {
                _ = cancel.cancelled() => break,
                fetched = self.fetch() => fetched,
            };

            let outcome = self.process(fetched).await;
            if matches!(outcome, PollOutcome::Failed | PollOutcome::Refused(_)) {
                debug!(backoff = ?self.settings.backoff, "Backing off before next poll");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.settings.backoff) => {}
                }
            }
        }

        info!(offset = self.cursor.value(), "Polling stopped");
        self.cursor
    }

    async fn fetch(&self) -> ApiResult<Vec<Update>> {
        self.bot
            .get_updates(self.cursor.value(), self.settings.wait)
            .await
    }

    async fn process(&mut self, fetched: ApiResult<Vec<Update>>) -> PollOutcome {
        let mut updates = match fetched {
            Ok(updates) => updates,
            Err(e) if e.is_timeout() => {
                trace!("Long poll timed out");
                return PollOutcome::Idle;
            }
            Err(e) => {
                error!(error = %e, "Failed to get updates");
                return PollOutcome::Failed;
            }
        };

        if updates.is_empty() {
            return PollOutcome::Idle;
        }
        updates.sort_by_key(|update| update.update_id);

        let count = updates.len();
        for (handled, update) in updates.into_iter().enumerate() {
            let update_id = update.update_id;
            trace!(update_id, "Dispatching update");
            if let Err(e) = self.handler.handle_update(update).await {
                warn!(update_id, error = %e, "Update was not taken, fetching it again");
                return PollOutcome::Refused(handled);
            }
            self.cursor.advance(update_id);
        }

        debug!(count, offset = self.cursor.value(), "Processed updates");
        PollOutcome::Batch(count)
    }
}
