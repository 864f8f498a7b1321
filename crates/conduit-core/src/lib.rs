//! # Conduit Core
//!
//! Shared building blocks for Conduit, a bridge between chat platforms and an
//! actor-style message bus.
//!
//! ```text
//! ┌───────────────┐  ApiCaller   ┌─────────┐   MessageBus    ┌─────────────┐
//! │ Chat platform │◀────────────▶│ Adapter │────────────────▶│ Bus runtime │
//! │  (HTTP API)   │              │         │◀────────────────│ (handlers)  │
//! └───────────────┘              └─────────┘ EnvelopeHandler └─────────────┘
//! ```
//!
//! - [`Envelope`] and its payloads: what travels over the bus
//! - [`MessageBus`] / [`EnvelopeHandler`]: the send-by-name contract
//! - [`ApiCaller`] / [`ApiRequest`]: one remote API call, no retries
//! - [`Adapter`] / [`ConfigurableAdapter`]: lifecycle driven by the runtime
//! - [`ApiError`], [`BusError`], [`AdapterError`]: the error taxonomy

pub mod adapter;
pub mod api;
pub mod bus;
pub mod envelope;
pub mod error;

pub use adapter::{Adapter, BoxedAdapter, ConfigurableAdapter};
pub use api::{ApiCaller, ApiRequest, BoxedApiCaller};
pub use bus::{BoxedBus, EnvelopeHandler, MessageBus};
pub use envelope::{BotResponsePayload, Envelope, ErrorPayload, MessageType, UserMessagePayload};
pub use error::{AdapterError, AdapterResult, ApiError, ApiResult, BusError, BusResult};
