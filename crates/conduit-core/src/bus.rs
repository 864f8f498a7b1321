//! The message-bus contract.
//!
//! Conduit does not own the bus. Adapters only need to send envelopes to a
//! logical name and to be called back with envelopes addressed to them; the
//! routing itself is provided by whoever implements these traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::envelope::Envelope;
use crate::error::BusResult;

/// Send-by-name side of the bus.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Delivers `envelope` to the handler registered as `target`.
    ///
    /// Returns once the bus has accepted the envelope, not once the handler
    /// has processed it.
    async fn send(&self, target: &str, envelope: Envelope) -> BusResult<()>;
}

/// A shared bus handle.
pub type BoxedBus = Arc<dyn MessageBus>;

/// Receiving side of the bus.
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    /// Handles one envelope addressed to this handler.
    ///
    /// Handlers must not fail: anything they cannot process is logged and
    /// dropped.
    async fn handle(&self, envelope: Envelope);
}
