//! Peer transport lifecycle and the outbound message relay.
//!
//! The transport to the companion device is unreliable: the peer may be
//! unreachable for minutes and connection establishment has no useful
//! latency bound. This crate owns that problem so callers never wait on
//! it - [`PeerRelay::send`] returns immediately and the relay keeps the
//! message queued until the transport reports the peer reachable.

pub mod error;
pub mod fake_transport;
pub mod relay;
pub mod transport;

pub use error::{Result, TransportError};
pub use fake_transport::{FakeTransportBuilder, FakeTransportController};
pub use relay::{InboundMessage, PeerRelay, ReplyHandler, SendErrorHandler};
pub use transport::{InboundWire, Transport, TransportFuture, TransportParts};
