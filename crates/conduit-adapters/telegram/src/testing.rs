//! Test doubles shared by the adapter's unit tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use conduit_core::{
    ApiCaller, ApiError, ApiRequest, ApiResult, BusError, BusResult, Envelope, MessageBus,
};

use crate::model::{Chat, Message, Update, User};

/// An [`ApiCaller`] that answers from per-method scripts.
///
/// Unscripted calls get a sensible default: `getUpdates` behaves like an
/// empty long poll (sleeps for the request timeout, then times out), every
/// other method succeeds.
#[derive(Default)]
pub struct ScriptedApi {
    scripts: Mutex<HashMap<String, VecDeque<ApiResult<Value>>>>,
    calls: Mutex<Vec<ApiRequest>>,
    events: Mutex<Vec<String>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful result for the next call to `method`.
    pub fn push_ok(&self, method: &str, result: Value) {
        self.push(method, Ok(result));
    }

    /// Queues a failure for the next call to `method`.
    pub fn push_err(&self, method: &str, err: ApiError) {
        self.push(method, Err(err));
    }

    /// Makes every call to `method` wait `delay` before answering.
    pub fn delay(&self, method: &str, delay: Duration) {
        self.delays.lock().insert(method.to_string(), delay);
    }

    fn push(&self, method: &str, result: ApiResult<Value>) {
        self.scripts
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(result);
    }

    /// Every request received so far.
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().clone()
    }

    /// Requests received for `method`.
    pub fn calls_to(&self, method: &str) -> Vec<ApiRequest> {
        self.calls
            .lock()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    /// Lifecycle and call log: `"open"`, `"close"` and method names in order.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

pub fn rejected(description: &str) -> ApiError {
    ApiError::Rejected {
        error_code: Some(400),
        description: description.to_string(),
    }
}

#[async_trait]
impl ApiCaller for ScriptedApi {
    async fn call(&self, request: ApiRequest) -> ApiResult<Value> {
        self.events.lock().push(request.method.clone());
        self.calls.lock().push(request.clone());

        let delay = self.delays.lock().get(&request.method).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .scripts
            .lock()
            .get_mut(&request.method)
            .and_then(VecDeque::pop_front);
        if let Some(result) = scripted {
            return result;
        }

        match request.method.as_str() {
            "getUpdates" => {
                let wait = request.timeout.unwrap_or(Duration::from_secs(35));
                tokio::time::sleep(wait).await;
                Err(ApiError::Timeout)
            }
            "getMe" => Ok(json!({
                "id": 1,
                "is_bot": true,
                "first_name": "Conduit",
                "username": "conduit_bot"
            })),
            _ => Ok(json!(true)),
        }
    }

    async fn open(&self) -> ApiResult<()> {
        self.events.lock().push("open".to_string());
        Ok(())
    }

    async fn close(&self) {
        self.events.lock().push("close".to_string());
    }
}

/// A [`MessageBus`] that records every send.
#[derive(Default)]
pub struct RecordingBus {
    sent: Mutex<Vec<(String, Envelope)>>,
    closed: bool,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus that refuses every envelope.
    pub fn closed() -> Self {
        Self {
            sent: Mutex::default(),
            closed: true,
        }
    }

    pub fn sent(&self) -> Vec<(String, Envelope)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MessageBus for RecordingBus {
    async fn send(&self, target: &str, envelope: Envelope) -> BusResult<()> {
        if self.closed {
            return Err(BusError::Closed);
        }
        self.sent.lock().push((target.to_string(), envelope));
        Ok(())
    }
}

/// Builds a text-message update from user `chat_id + 1000`.
pub fn text_update(update_id: i64, chat_id: i64, text: &str) -> Update {
    Update {
        update_id,
        message: Some(Message {
            message_id: update_id,
            chat: Chat {
                id: chat_id,
                kind: Some("private".to_string()),
            },
            from: Some(User {
                id: chat_id + 1000,
                is_bot: false,
                first_name: "Test".to_string(),
                username: Some(format!("user{chat_id}")),
            }),
            text: Some(text.to_string()),
        }),
    }
}
