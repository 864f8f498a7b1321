//! # Conduit Transport
//!
//! Network transport for Conduit adapters.
//!
//! ```text
//! ┌─────────────────────┐
//! │  Adapter Layer      │  (Telegram)
//! │  (uses ApiCaller)   │
//! ├─────────────────────┤
//! │  conduit-core       │  (ApiCaller trait)
//! ├─────────────────────┤
//! │  conduit-transport  │  <- This crate (HTTP implementation)
//! ├─────────────────────┤
//! │  Network (HTTP)     │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use conduit_core::{ApiCaller, ApiRequest};
//! use conduit_transport::{HttpApiClient, HttpClientConfig};
//!
//! let client = HttpApiClient::new(HttpClientConfig::new(token));
//! client.open().await?;
//! let me = client.call(ApiRequest::new("getMe")).await?;
//! client.close().await;
//! ```

pub mod http_client;

pub use http_client::{DEFAULT_API_URL, HttpApiClient, HttpClientConfig, mask_token};
