//! Adapter traits.
//!
//! An adapter connects one chat platform to the bus. The runtime drives its
//! lifecycle through [`Adapter`] and routes envelopes addressed to the
//! adapter's [`name`](Adapter::name) to its
//! [`EnvelopeHandler`](crate::EnvelopeHandler) implementation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::bus::{BoxedBus, EnvelopeHandler};
use crate::error::AdapterResult;

/// Lifecycle of a platform adapter.
#[async_trait]
pub trait Adapter: EnvelopeHandler {
    /// Bus address of this adapter, also the key of its config section.
    fn name(&self) -> &str;

    /// Opens the platform session and starts receiving.
    async fn initialize(&self) -> AdapterResult<()>;

    /// Stops taking in new platform events.
    ///
    /// Called before the bus drains, so envelopes addressed to the adapter
    /// are still delivered afterwards. The default does nothing.
    async fn stop_receiving(&self) {}

    /// Stops receiving and releases every resource.
    ///
    /// Must be best-effort: a failing step is logged and the rest still run.
    async fn shutdown(&self);
}

/// A boxed adapter trait object.
pub type BoxedAdapter = Arc<dyn Adapter>;

/// An adapter that can be built from a deserialized config section.
pub trait ConfigurableAdapter: Adapter + Sized {
    /// Config section type.
    type Config: DeserializeOwned + Default + Send;

    /// Name of the config section under `adapters`.
    fn config_key() -> &'static str;

    /// Creates the adapter.
    fn from_config(config: Self::Config, bus: BoxedBus) -> AdapterResult<Arc<Self>>;
}
