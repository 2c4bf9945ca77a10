//! Error types for the session side.

use thiserror::Error;

/// Failure reported by the sensor/session capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    /// The user or platform refused access to the requested measurements.
    #[error("sensor access denied")]
    AccessDenied,

    /// The underlying session could not be constructed or started.
    #[error("sensor session unavailable: {0}")]
    SessionUnavailable(String),

    /// The hardware failed while a session was running.
    #[error("sensor hardware failure: {0}")]
    Hardware(String),
}

/// Failure starting a workout, surfaced to the local caller. The same
/// failure is also forwarded to the peer as an error message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkoutError {
    #[error("authorization denied: {0}")]
    AuthorizationDenied(SensorError),

    #[error("could not start the workout session: {0}")]
    SessionStart(SensorError),
}

impl WorkoutError {
    /// Stable numeric code carried in the wire error message.
    pub fn error_code(&self) -> i64 {
        match self {
            WorkoutError::AuthorizationDenied(_) => 1,
            WorkoutError::SessionStart(_) => 2,
        }
    }
}

/// Wire error code for failures reported by an already-running session.
pub const SESSION_FAILURE_CODE: i64 = 3;

/// Failure persisting a finished activity record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to persist activity record: {0}")]
pub struct StoreError(pub String);
