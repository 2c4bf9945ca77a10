//! Transport-layer error types.

use thiserror::Error;

/// Failure reported by the transport capability.
///
/// `Clone` because a single activation failure fans out to the failure
/// callback of every message queued at that moment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport could not be activated at the protocol layer.
    #[error("transport activation failed: {0}")]
    ActivationFailed(String),

    /// The peer is not currently reachable.
    #[error("peer is not reachable")]
    NotReachable,

    /// A single message failed to send after activation.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The transport has shut down and will not recover.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
