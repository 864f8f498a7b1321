//! HTTP client implementation of [`ApiCaller`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, ClientBuilder, Url};
use serde_json::Value;
use tracing::{debug, info, trace};

use conduit_core::{ApiCaller, ApiError, ApiRequest, ApiResult};

/// Default base URL of the Telegram Bot API.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Configuration for [`HttpApiClient`].
#[derive(Clone)]
pub struct HttpClientConfig {
    /// Base URL, without the `/bot<token>` part.
    pub api_url: String,
    /// Bot credential, embedded in every request path.
    pub token: String,
    /// Timeout for calls that do not set their own.
    pub timeout: Duration,
}

impl HttpClientConfig {
    /// Creates a config for `token` against the public API.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Sets the base URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Sets the default call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for HttpClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClientConfig")
            .field("api_url", &self.api_url)
            .field("token", &mask_token(&self.token))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Masks a credential for logging, keeping the first and last four characters.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

/// Bot API client over HTTP.
///
/// Each [`call`](ApiCaller::call) is a single `POST {api_url}/bot{token}/{method}`.
/// The underlying `reqwest` client is the session: it is created by
/// [`open`](ApiCaller::open) and dropped by [`close`](ApiCaller::close).
pub struct HttpApiClient {
    config: HttpClientConfig,
    session: RwLock<Option<Client>>,
}

impl HttpApiClient {
    /// Creates a client. No session is open yet.
    pub fn new(config: HttpClientConfig) -> Self {
        Self {
            config,
            session: RwLock::new(None),
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Returns whether a session is open.
    pub fn is_open(&self) -> bool {
        self.session.read().is_some()
    }

    fn client(&self) -> ApiResult<Client> {
        self.session.read().clone().ok_or(ApiError::NotConnected)
    }

    /// Builds the request URL, with `query` flattened into query pairs.
    fn method_url(&self, method: &str, query: Option<&Value>) -> ApiResult<Url> {
        let base = self.config.api_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/bot{}/{method}", self.config.token))
            .map_err(|e| ApiError::Transport(format!("invalid API URL: {e}")))?;

        if let Some(query) = query {
            let pairs = query_pairs(query)?;
            if !pairs.is_empty() {
                url.query_pairs_mut().extend_pairs(pairs);
            }
        }

        Ok(url)
    }
}

impl fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("config", &self.config)
            .field("open", &self.is_open())
            .finish()
    }
}

#[async_trait]
impl ApiCaller for HttpApiClient {
    async fn call(&self, request: ApiRequest) -> ApiResult<Value> {
        let client = self.client()?;
        let url = self.method_url(&request.method, request.query.as_ref())?;
        let timeout = request.timeout.unwrap_or(self.config.timeout);

        debug!(method = %request.method, timeout = ?timeout, "Calling bot API");

        let mut builder = client.post(url).timeout(timeout);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(classify_error)?;

        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            ApiError::Transport(format!(
                "HTTP {}: unreadable response body: {e}",
                status.as_u16()
            ))
        })?;
        trace!(method = %request.method, status = status.as_u16(), "Bot API responded");

        parse_response(value)
    }

    async fn open(&self) -> ApiResult<()> {
        let mut session = self.session.write();
        if session.is_none() {
            let client = ClientBuilder::new()
                .build()
                .map_err(|e| ApiError::Transport(e.without_url().to_string()))?;
            *session = Some(client);
            info!(api_url = %self.config.api_url, "HTTP session opened");
        }
        Ok(())
    }

    async fn close(&self) {
        if self.session.write().take().is_some() {
            info!(api_url = %self.config.api_url, "HTTP session closed");
        }
    }
}

/// Maps a reqwest error onto the API error taxonomy.
///
/// The URL is stripped because it carries the bot token.
fn classify_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(err.without_url().to_string())
    }
}

/// Interprets a Bot API response envelope (`{ok, result}` or
/// `{ok: false, error_code, description}`).
fn parse_response(mut value: Value) -> ApiResult<Value> {
    match value.get("ok").and_then(Value::as_bool) {
        Some(true) => Ok(value
            .get_mut("result")
            .map(Value::take)
            .unwrap_or(Value::Null)),
        Some(false) => Err(ApiError::Rejected {
            error_code: value.get("error_code").and_then(Value::as_i64),
            description: value
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        }),
        None => Err(ApiError::Transport(
            "response is missing the 'ok' field".to_string(),
        )),
    }
}

/// Flattens a JSON object into query pairs.
///
/// Strings are used verbatim, nulls are skipped, everything else is
/// JSON-encoded (`["message"]` stays `["message"]`).
fn query_pairs(query: &Value) -> ApiResult<Vec<(String, String)>> {
    let Some(object) = query.as_object() else {
        return Err(ApiError::Serialization(
            "query parameters must be a JSON object".to_string(),
        ));
    };

    Ok(object
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect())
}
