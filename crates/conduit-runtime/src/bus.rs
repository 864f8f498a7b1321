//! In-process message bus.
//!
//! [`LocalBus`] routes an envelope to the handler registered under its target
//! name and runs that handler on its own task, so `send` returns as soon as
//! the envelope is accepted. Every spawned handler is tracked; [`LocalBus::drain`]
//! waits for the in-flight ones during shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use conduit_core::{BusError, BusResult, Envelope, EnvelopeHandler, MessageBus};
use parking_lot::RwLock;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace, warn};

/// Routes envelopes by target name to registered handlers.
#[derive(Default)]
pub struct LocalBus {
    handlers: RwLock<HashMap<String, Arc<dyn EnvelopeHandler>>>,
    closed: AtomicBool,
    tracker: TaskTracker,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any previous handler.
    ///
    /// Returns `true` if a handler was replaced.
    pub fn register(&self, name: impl Into<String>, handler: Arc<dyn EnvelopeHandler>) -> bool {
        let name = name.into();
        debug!(handler = %name, "Registering bus handler");
        self.handlers.write().insert(name, handler).is_some()
    }

    /// Removes the handler registered under `name`.
    pub fn unregister(&self, name: &str) -> bool {
        self.handlers.write().remove(name).is_some()
    }

    /// Returns `true` if a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }

    /// Names of every registered handler, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Stops accepting envelopes. Handlers already running are unaffected.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.tracker.close();
    }

    /// Accepts envelopes again after [`close`](Self::close).
    pub fn reopen(&self) {
        self.closed.store(false, Ordering::SeqCst);
        self.tracker.reopen();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of handler invocations still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits for in-flight handlers, up to `timeout`.
    ///
    /// The bus keeps routing while it drains, and handlers started by the
    /// ones being waited on are waited for too. Returns `false` if some were
    /// still running when the timeout elapsed.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        if tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok() {
            return true;
        }
        warn!(
            in_flight = self.tracker.len(),
            "Timed out waiting for bus handlers"
        );
        false
    }
}

#[async_trait]
impl MessageBus for LocalBus {
    async fn send(&self, target: &str, envelope: Envelope) -> BusResult<()> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }

        let handler = self
            .handlers
            .read()
            .get(target)
            .cloned()
            .ok_or_else(|| BusError::UnknownTarget(target.to_string()))?;

        trace!(
            target_name = %target,
            sender = %envelope.sender_id,
            message_type = %envelope.message_type,
            "Routing envelope"
        );
        self.tracker.spawn(async move { handler.handle(envelope).await });
        Ok(())
    }
}
