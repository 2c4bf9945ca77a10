//! Fire-and-forget message relay to the companion device.
//!
//! [`PeerRelay`] is a cloneable handle over an actor task that exclusively
//! owns the pending-message queue, the transport, and the single inbound
//! listener binding. Sending never blocks and never fails synchronously;
//! once a message is queued the relay owns it outright, so delivery does
//! not depend on the caller staying alive.
//!
//! # Queue semantics
//!
//! Messages leave the queue when a send is dispatched to the transport,
//! not when delivery is confirmed. A hard activation failure fails the
//! whole queued generation together and does not auto-retry; the next
//! `send` call re-triggers activation.

use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use wk_protocol::WorkoutMessage;

use crate::error::TransportError;
use crate::transport::{InboundWire, TransportParts};

/// Fixed delay before re-attempting a send while activation is in flight
/// or the peer is unreachable.
pub const RETRY_BACKOFF: std::time::Duration = std::time::Duration::from_secs(2);

/// Invoked with the peer's reply once a message is delivered.
pub type ReplyHandler = Box<dyn FnOnce(JsonValue) + Send + 'static>;

/// Invoked when a message cannot be delivered.
pub type SendErrorHandler = Box<dyn FnOnce(TransportError) + Send + 'static>;

/// A decoded inbound message forwarded to the bound listener.
pub struct InboundMessage {
    pub message: WorkoutMessage,
    /// Present when the peer expects an answer.
    pub reply: Option<oneshot::Sender<JsonValue>>,
}

impl InboundMessage {
    /// Sends `reply` back to the peer if a continuation is attached.
    pub fn respond(&mut self, reply: &WorkoutMessage) {
        if let Some(tx) = self.reply.take() {
            let _ = tx.send(reply.to_wire());
        }
    }

    /// Answers with an empty map, the acknowledgement for messages the
    /// receiver refuses to act on.
    pub fn respond_empty(&mut self) {
        if let Some(tx) = self.reply.take() {
            let _ = tx.send(JsonValue::Object(Default::default()));
        }
    }
}

/// Handle to the relay actor. Cheap to clone; typically lives for the
/// whole process while session connectors come and go.
#[derive(Clone)]
pub struct PeerRelay {
    ops: mpsc::UnboundedSender<RelayOp>,
}

enum RelayOp {
    Send {
        message: WorkoutMessage,
        on_reply: ReplyHandler,
        on_error: SendErrorHandler,
    },
    Bind(mpsc::UnboundedSender<InboundMessage>),
    Unbind,
    Flush,
    ActivationComplete(Result<(), TransportError>),
    Inbound(InboundWire),
}

impl PeerRelay {
    /// Spawns the relay actor over the given transport.
    pub fn spawn(parts: TransportParts) -> Self {
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();

        // Forward raw inbound wires into the actor's single op stream so
        // the actor loop has one source of events.
        let inbound_ops = ops_tx.clone();
        let mut inbound_rx = parts.inbound_rx;
        tokio::spawn(async move {
            while let Some(inbound) = inbound_rx.recv().await {
                if inbound_ops.send(RelayOp::Inbound(inbound)).is_err() {
                    break;
                }
            }
        });

        let actor = RelayActor {
            link: parts.link,
            ops_tx: ops_tx.clone(),
            queue: Vec::new(),
            listener: None,
            activated: false,
            activating: false,
            retry_scheduled: false,
        };
        tokio::spawn(actor.run(ops_rx));

        Self { ops: ops_tx }
    }

    /// Queues a message for delivery. Returns immediately; the reply and
    /// any failure are only logged.
    pub fn send(&self, message: WorkoutMessage) {
        self.send_with_handlers(
            message,
            Box::new(|reply| debug!(target: "wk.relay", %reply, "message delivered")),
            Box::new(|err| debug!(target: "wk.relay", error = %err, "message failed")),
        );
    }

    /// Queues a message with per-message reply and failure callbacks.
    pub fn send_with_handlers(
        &self,
        message: WorkoutMessage,
        on_reply: ReplyHandler,
        on_error: SendErrorHandler,
    ) {
        let _ = self.ops.send(RelayOp::Send {
            message,
            on_reply,
            on_error,
        });
    }

    /// Binds the single inbound listener, replacing any previous one, and
    /// re-attempts the outbound queue.
    pub fn bind(&self, listener: mpsc::UnboundedSender<InboundMessage>) {
        let _ = self.ops.send(RelayOp::Bind(listener));
    }

    /// Clears the inbound listener.
    pub fn unbind(&self) {
        let _ = self.ops.send(RelayOp::Unbind);
    }
}

struct PendingMessage {
    message: WorkoutMessage,
    on_reply: ReplyHandler,
    on_error: SendErrorHandler,
}

struct RelayActor {
    link: Box<dyn crate::transport::Transport>,
    ops_tx: mpsc::UnboundedSender<RelayOp>,
    queue: Vec<PendingMessage>,
    listener: Option<mpsc::UnboundedSender<InboundMessage>>,
    activated: bool,
    activating: bool,
    retry_scheduled: bool,
}

impl RelayActor {
    async fn run(mut self, mut ops_rx: mpsc::UnboundedReceiver<RelayOp>) {
        while let Some(op) = ops_rx.recv().await {
            match op {
                RelayOp::Send {
                    message,
                    on_reply,
                    on_error,
                } => {
                    debug!(
                        target: "wk.relay",
                        identifier = %message.identifier,
                        queued = self.queue.len() + 1,
                        "message queued"
                    );
                    self.queue.push(PendingMessage {
                        message,
                        on_reply,
                        on_error,
                    });
                    self.attempt_send();
                }
                RelayOp::Bind(listener) => {
                    self.listener = Some(listener);
                    self.attempt_send();
                }
                RelayOp::Unbind => {
                    self.listener = None;
                }
                RelayOp::Flush => {
                    self.retry_scheduled = false;
                    if !self.queue.is_empty() {
                        self.attempt_send();
                    }
                }
                RelayOp::ActivationComplete(result) => {
                    self.activating = false;
                    match result {
                        Ok(()) => {
                            debug!(target: "wk.relay", "transport activated");
                            self.activated = true;
                            self.attempt_send();
                        }
                        Err(err) => {
                            warn!(
                                target: "wk.relay",
                                error = %err,
                                failed = self.queue.len(),
                                "activation failed; failing queued messages"
                            );
                            self.fail_queued(err);
                        }
                    }
                }
                RelayOp::Inbound(inbound) => self.handle_inbound(inbound),
            }
        }
    }

    /// Three-way dispatch: send everything if the peer is ready, kick off
    /// activation if it has not been attempted, otherwise back off.
    fn attempt_send(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        if self.activated && self.link.is_reachable() {
            debug!(
                target: "wk.relay",
                count = self.queue.len(),
                "peer reachable; dispatching queued messages"
            );
            for pending in self.queue.drain(..) {
                let fut = self.link.send(pending.message.to_wire());
                let on_reply = pending.on_reply;
                let on_error = pending.on_error;
                tokio::spawn(async move {
                    match fut.await {
                        Ok(reply) => on_reply(reply),
                        Err(err) => on_error(err),
                    }
                });
            }
        } else if !self.activated && !self.activating {
            debug!(target: "wk.relay", "requesting transport activation");
            self.activating = true;
            let fut = self.link.activate();
            let ops = self.ops_tx.clone();
            tokio::spawn(async move {
                let _ = ops.send(RelayOp::ActivationComplete(fut.await));
            });
        } else if !self.retry_scheduled {
            debug!(target: "wk.relay", "waiting for reachability; will retry");
            self.retry_scheduled = true;
            let ops = self.ops_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(RETRY_BACKOFF).await;
                let _ = ops.send(RelayOp::Flush);
            });
        }
    }

    fn fail_queued(&mut self, err: TransportError) {
        for pending in self.queue.drain(..) {
            (pending.on_error)(err.clone());
        }
    }

    fn handle_inbound(&mut self, inbound: InboundWire) {
        let Some(message) = WorkoutMessage::from_wire(&inbound.wire) else {
            debug!(target: "wk.relay", wire = %inbound.wire, "dropping malformed inbound message");
            return;
        };

        let Some(listener) = &self.listener else {
            debug!(
                target: "wk.relay",
                identifier = %message.identifier,
                "no listener bound; dropping inbound message"
            );
            return;
        };

        let forwarded = listener.send(InboundMessage {
            message,
            reply: inbound.reply,
        });
        if forwarded.is_err() {
            debug!(target: "wk.relay", "listener gone; clearing binding");
            self.listener = None;
        }
    }
}
