//! Fake transport for unit testing the relay without a paired device.
//!
//! Provides an in-memory transport whose reachability, activation outcome,
//! and per-send failures are all controlled from the test.
//!
//! # Example
//!
//! ```ignore
//! let (parts, controller) = FakeTransportBuilder::new().build();
//! let relay = PeerRelay::spawn(parts);
//!
//! relay.send(WorkoutMessage::state(WorkoutState::Running));
//! controller.complete_activation(Ok(()));
//! controller.set_reachable(true);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, oneshot};

use crate::error::TransportError;
use crate::transport::{InboundWire, Transport, TransportFuture, TransportParts};

/// Builder for creating fake transport instances.
pub struct FakeTransportBuilder {
    reachable: bool,
    auto_activate: bool,
}

impl FakeTransportBuilder {
    /// A transport that starts unreachable and holds activation open until
    /// the controller completes it.
    pub fn new() -> Self {
        Self {
            reachable: false,
            auto_activate: false,
        }
    }

    /// Sets the initial reachability.
    pub fn reachable(mut self, reachable: bool) -> Self {
        self.reachable = reachable;
        self
    }

    /// Makes activation succeed immediately instead of waiting for the
    /// controller. Convenient for tests that only exercise the session
    /// side.
    pub fn auto_activate(mut self) -> Self {
        self.auto_activate = true;
        self
    }

    /// Build the fake transport and return both parts and a controller.
    ///
    /// Returns [`TransportParts`] for spawning a [`PeerRelay`] and a
    /// [`FakeTransportController`] for driving activation, reachability,
    /// and inbound traffic.
    ///
    /// [`PeerRelay`]: crate::relay::PeerRelay
    pub fn build(self) -> (TransportParts, FakeTransportController) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            reachable: AtomicBool::new(self.reachable),
            auto_activate: self.auto_activate,
            activation_attempts: AtomicUsize::new(0),
            activation_waiters: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            planned_send_errors: Mutex::new(VecDeque::new()),
        });

        let parts = TransportParts {
            link: Box::new(FakeTransport {
                shared: Arc::clone(&shared),
            }),
            inbound_rx,
        };

        let controller = FakeTransportController { shared, inbound_tx };

        (parts, controller)
    }
}

impl Default for FakeTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Shared {
    reachable: AtomicBool,
    auto_activate: bool,
    activation_attempts: AtomicUsize,
    activation_waiters: Mutex<Vec<oneshot::Sender<Result<(), TransportError>>>>,
    sent: Mutex<Vec<JsonValue>>,
    planned_send_errors: Mutex<VecDeque<TransportError>>,
}

/// Controller for driving the fake transport and inspecting sent traffic.
pub struct FakeTransportController {
    shared: Arc<Shared>,
    inbound_tx: mpsc::UnboundedSender<InboundWire>,
}

impl FakeTransportController {
    /// Flips whether the peer appears reachable.
    pub fn set_reachable(&self, reachable: bool) {
        self.shared.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Resolves every activation currently in flight with `result`.
    pub fn complete_activation(&self, result: Result<(), TransportError>) {
        for waiter in self.shared.activation_waiters.lock().drain(..) {
            let _ = waiter.send(result.clone());
        }
    }

    /// Number of times `activate()` has been called.
    pub fn activation_attempts(&self) -> usize {
        self.shared.activation_attempts.load(Ordering::SeqCst)
    }

    /// The next `count` sends will fail with the given error, in dispatch
    /// order.
    pub fn plan_send_errors(&self, err: TransportError, count: usize) {
        let mut planned = self.shared.planned_send_errors.lock();
        for _ in 0..count {
            planned.push_back(err.clone());
        }
    }

    /// Take all sent wire dictionaries, clearing the buffer.
    pub fn take_sent(&self) -> Vec<JsonValue> {
        std::mem::take(&mut *self.shared.sent.lock())
    }

    pub fn sent_count(&self) -> usize {
        self.shared.sent.lock().len()
    }

    /// Inject a raw inbound wire dictionary with no reply continuation.
    pub fn inject(&self, wire: JsonValue) {
        let _ = self.inbound_tx.send(InboundWire { wire, reply: None });
    }

    /// Inject an inbound wire dictionary the peer expects a reply to.
    /// Returns the receiver the reply will arrive on.
    pub fn inject_with_reply(&self, wire: JsonValue) -> oneshot::Receiver<JsonValue> {
        let (tx, rx) = oneshot::channel();
        let _ = self.inbound_tx.send(InboundWire {
            wire,
            reply: Some(tx),
        });
        rx
    }
}

struct FakeTransport {
    shared: Arc<Shared>,
}

impl Transport for FakeTransport {
    fn activate(&mut self) -> TransportFuture<()> {
        self.shared.activation_attempts.fetch_add(1, Ordering::SeqCst);

        if self.shared.auto_activate {
            return Box::pin(std::future::ready(Ok(())));
        }

        let (tx, rx) = oneshot::channel();
        self.shared.activation_waiters.lock().push(tx);
        Box::pin(async move { rx.await.unwrap_or(Err(TransportError::Closed)) })
    }

    fn is_reachable(&self) -> bool {
        self.shared.reachable.load(Ordering::SeqCst)
    }

    fn send(&mut self, wire: JsonValue) -> TransportFuture<JsonValue> {
        // Record at dispatch time so `take_sent` observes queue order.
        self.shared.sent.lock().push(wire);
        let planned = self.shared.planned_send_errors.lock().pop_front();
        Box::pin(std::future::ready(match planned {
            Some(err) => Err(err),
            None => Ok(serde_json::json!({})),
        }))
    }
}
