//! Typing indicators.
//!
//! While a reply is being prepared the adapter keeps the platform's "typing"
//! action visible by re-sending it on a fixed interval. Each chat has at most
//! one such background task. The pool of tasks is bounded: finished tasks are
//! swept every few starts, and when the pool is full the oldest tasks are
//! evicted. Indicators are advisory, so losing one never loses data.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::bot::{TYPING_ACTION, TelegramBot};
use crate::config::TelegramConfig;

/// Tuning of the typing pool.
#[derive(Debug, Clone, Copy)]
pub struct TypingSettings {
    /// Time between two `sendChatAction` calls.
    pub interval: Duration,
    /// Starts between two housekeeping sweeps.
    pub cleanup_threshold: usize,
    /// Pool capacity.
    pub max_tasks: usize,
}

impl From<&TelegramConfig> for TypingSettings {
    fn from(config: &TelegramConfig) -> Self {
        Self {
            interval: config.typing_interval(),
            cleanup_threshold: config.typing_cleanup_threshold.max(1),
            max_tasks: config.max_typing_tasks.max(1),
        }
    }
}

/// A running indicator for one chat.
struct TypingTask {
    /// Insertion order, used for eviction.
    seq: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl TypingTask {
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }
}

#[derive(Default)]
struct TypingPool {
    tasks: HashMap<i64, TypingTask>,
    next_seq: u64,
    starts: usize,
}

impl TypingPool {
    /// Drops tasks that already ended. Returns how many were removed.
    fn sweep(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| !task.is_finished());
        before - self.tasks.len()
    }

    /// Cancels and removes the oldest tenth of the pool, at least one task.
    fn evict_oldest(&mut self) -> usize {
        let count = self.tasks.len().div_ceil(10).max(1);

        let mut by_age: Vec<(u64, i64)> = self
            .tasks
            .iter()
            .map(|(chat_id, task)| (task.seq, *chat_id))
            .collect();
        by_age.sort_unstable();

        for (_, chat_id) in by_age.into_iter().take(count) {
            if let Some(task) = self.tasks.remove(&chat_id) {
                task.cancel();
            }
        }
        count
    }
}

/// Owner of all typing tasks.
pub struct TypingIndicatorManager {
    bot: TelegramBot,
    settings: TypingSettings,
    pool: Mutex<TypingPool>,
}

impl TypingIndicatorManager {
    pub fn new(bot: TelegramBot, settings: TypingSettings) -> Self {
        Self {
            bot,
            settings,
            pool: Mutex::new(TypingPool::default()),
        }
    }

    /// Starts the indicator for `chat_id`, replacing any running one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, chat_id: i64) {
        let mut pool = self.pool.lock();

        if let Some(previous) = pool.tasks.remove(&chat_id) {
            previous.cancel();
        }

        pool.starts += 1;
        if pool.starts % self.settings.cleanup_threshold == 0 {
            let swept = pool.sweep();
            if swept > 0 {
                trace!(swept, "Swept finished typing tasks");
            }
        }

        if pool.tasks.len() >= self.settings.max_tasks {
            pool.sweep();
            if pool.tasks.len() >= self.settings.max_tasks {
                let evicted = pool.evict_oldest();
                warn!(
                    evicted,
                    remaining = pool.tasks.len(),
                    max = self.settings.max_tasks,
                    "Typing pool is full, evicted oldest indicators"
                );
            }
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(typing_loop(
            self.bot.clone(),
            chat_id,
            self.settings.interval,
            cancel.clone(),
        ));

        let seq = pool.next_seq;
        pool.next_seq += 1;
        pool.tasks.insert(
            chat_id,
            TypingTask {
                seq,
                cancel,
                handle,
            },
        );
        debug!(chat_id, active = pool.tasks.len(), "Typing indicator started");
    }

    /// Stops the indicator for `chat_id`. Returns `false` if none was tracked.
    pub fn stop(&self, chat_id: i64) -> bool {
        let removed = self.pool.lock().tasks.remove(&chat_id);
        match removed {
            Some(task) => {
                task.cancel();
                debug!(chat_id, "Typing indicator stopped");
                true
            }
            None => false,
        }
    }

    /// Cancels every indicator, clears the pool and waits for the tasks to end.
    pub async fn stop_all(&self) {
        let tasks: Vec<TypingTask> = {
            let mut pool = self.pool.lock();
            pool.tasks.drain().map(|(_, task)| task).collect()
        };
        if tasks.is_empty() {
            return;
        }

        debug!(count = tasks.len(), "Stopping all typing indicators");
        for task in &tasks {
            task.cancel();
        }
        for task in tasks {
            // cancelled tasks end at their next suspension point
            let _ = task.handle.await;
        }
    }

    /// Number of tracked tasks, finished ones included.
    pub fn len(&self) -> usize {
        self.pool.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether a still-running indicator exists for `chat_id`.
    pub fn is_active(&self, chat_id: i64) -> bool {
        self.pool
            .lock()
            .tasks
            .get(&chat_id)
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for TypingIndicatorManager {
    fn drop(&mut self) {
        for task in self.pool.get_mut().tasks.values() {
            task.cancel();
        }
    }
}

async fn typing_loop(
    bot: TelegramBot,
    chat_id: i64,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = bot.send_chat_action(chat_id, TYPING_ACTION) => {
                if let Err(e) = result {
                    debug!(chat_id, error = %e, "Typing indicator gave up");
                    break;
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    trace!(chat_id, "Typing task ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedApi, rejected};
    use std::sync::Arc;

    fn manager(
        api: &Arc<ScriptedApi>,
        cleanup_threshold: usize,
        max_tasks: usize,
    ) -> TypingIndicatorManager {
        TypingIndicatorManager::new(
            TelegramBot::new(api.clone()),
            TypingSettings {
                interval: Duration::from_secs(4),
                cleanup_threshold,
                max_tasks,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_task_per_chat() {
        let api = Arc::new(ScriptedApi::new());
        let typing = manager(&api, 10, 100);

        typing.start(7);
        typing.start(7);
        typing.start(8);

        assert_eq!(typing.len(), 2);
        assert!(typing.is_active(7));
        assert!(typing.is_active(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let api = Arc::new(ScriptedApi::new());
        let typing = manager(&api, 10, 100);

        typing.start(7);
        assert!(typing.stop(7));
        assert!(!typing.stop(7));
        assert!(!typing.is_active(7));
        assert!(typing.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_until_stopped() {
        let api = Arc::new(ScriptedApi::new());
        let typing = manager(&api, 10, 100);

        typing.start(7);
        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(api.calls_to("sendChatAction").len(), 3);

        typing.stop(7);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(api.calls_to("sendChatAction").len(), 3);

        let body = api.calls_to("sendChatAction")[0].body.clone().unwrap();
        assert_eq!(body["chat_id"], 7);
        assert_eq!(body["action"], "typing");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_action_ends_task_and_is_swept() {
        let api = Arc::new(ScriptedApi::new());
        api.push_err("sendChatAction", rejected("Forbidden: bot was blocked by the user"));
        let typing = manager(&api, 2, 100);

        typing.start(1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!typing.is_active(1));
        assert_eq!(typing.len(), 1);

        // second start triggers housekeeping before inserting
        typing.start(2);
        assert_eq!(typing.len(), 1);
        assert!(typing.is_active(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_pool_evicts_oldest() {
        let api = Arc::new(ScriptedApi::new());
        let max = 20;
        let typing = manager(&api, 1000, max);

        for chat_id in 0..max as i64 {
            typing.start(chat_id);
        }
        assert_eq!(typing.len(), max);

        typing.start(100);

        // ceil(20 / 10) = 2 evicted, one inserted
        assert_eq!(typing.len(), max - 2 + 1);
        assert!(typing.len() <= max);
        assert!(!typing.is_active(0));
        assert!(!typing.is_active(1));
        assert!(typing.is_active(2));
        assert!(typing.is_active(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_pool_prefers_sweeping() {
        let api = Arc::new(ScriptedApi::new());
        api.push_err("sendChatAction", rejected("Forbidden"));
        let typing = manager(&api, 1000, 3);

        typing.start(1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        typing.start(2);
        typing.start(3);
        assert_eq!(typing.len(), 3);

        typing.start(4);

        // chat 1 had already finished, so nothing live is evicted
        assert_eq!(typing.len(), 3);
        assert!(typing.is_active(2));
        assert!(typing.is_active(3));
        assert!(typing.is_active(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_all_clears_pool() {
        let api = Arc::new(ScriptedApi::new());
        let typing = manager(&api, 10, 100);

        for chat_id in 0..5 {
            typing.start(chat_id);
        }
        typing.stop_all().await;

        assert!(typing.is_empty());
        let calls = api.calls_to("sendChatAction").len();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.calls_to("sendChatAction").len(), calls);
    }
}
