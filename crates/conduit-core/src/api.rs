//! Remote API call abstraction.
//!
//! [`ApiCaller`] decouples *how* a remote API call travels (HTTP session,
//! test double) from the protocol logic that issues it. Protocol code builds
//! an [`ApiRequest`] and receives the call's `result` value or an
//! [`ApiError`](crate::ApiError) that says how the call failed.
//!
//! Callers own the retry policy: an `ApiCaller` performs exactly one attempt
//! per [`call`](ApiCaller::call).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiResult;

/// One remote API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Method name, e.g. `"sendMessage"`.
    pub method: String,
    /// JSON request body.
    pub body: Option<Value>,
    /// Query parameters as a JSON object.
    pub query: Option<Value>,
    /// Per-call timeout; `None` uses the caller's default.
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    /// Creates a request for `method` with no body, query or timeout.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            body: None,
            query: None,
            timeout: None,
        }
    }

    /// Sets the JSON body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the query parameters.
    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    /// Overrides the timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Transport-specific API call mechanism.
#[async_trait]
pub trait ApiCaller: Send + Sync {
    /// Performs one call and returns its result value.
    ///
    /// # Errors
    /// - [`ApiError::Timeout`](crate::ApiError::Timeout) when the call timed out
    /// - [`ApiError::Transport`](crate::ApiError::Transport) on network failure
    /// - [`ApiError::Rejected`](crate::ApiError::Rejected) when the API declined it
    async fn call(&self, request: ApiRequest) -> ApiResult<Value>;

    /// Opens the underlying session. Idempotent.
    ///
    /// The default implementation is a no-op.
    async fn open(&self) -> ApiResult<()> {
        Ok(())
    }

    /// Closes the underlying session; later calls fail with
    /// [`ApiError::NotConnected`](crate::ApiError::NotConnected).
    ///
    /// The default implementation is a no-op.
    async fn close(&self) {}
}

/// A shared API caller.
pub type BoxedApiCaller = Arc<dyn ApiCaller>;
