//! The transport capability boundary.
//!
//! Implementations wrap whatever actually carries bytes to the companion
//! device. The relay only needs three things: lazy activation, a
//! reachability probe, and a per-message send that resolves with the
//! peer's reply or an error.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, oneshot};

use crate::error::TransportError;

/// Boxed future returned by transport operations.
///
/// `'static` so the relay can drive activation and sends in spawned tasks
/// without blocking its own loop on a peer of unknown latency.
pub type TransportFuture<T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'static>>;

/// Connection to the companion device.
pub trait Transport: Send + 'static {
    /// Begins establishing the connection. Resolves once the protocol
    /// layer reports activation complete, successfully or not.
    fn activate(&mut self) -> TransportFuture<()>;

    /// Whether the peer can currently receive messages.
    fn is_reachable(&self) -> bool;

    /// Sends one wire dictionary. Resolves with the peer's reply.
    fn send(&mut self, wire: JsonValue) -> TransportFuture<JsonValue>;
}

/// A raw inbound dictionary from the peer, with an optional reply
/// continuation when the peer expects an answer.
pub struct InboundWire {
    pub wire: JsonValue,
    pub reply: Option<oneshot::Sender<JsonValue>>,
}

/// Everything the relay needs from a transport implementation.
pub struct TransportParts {
    pub link: Box<dyn Transport>,
    pub inbound_rx: mpsc::UnboundedReceiver<InboundWire>,
}
