//! The sensor/session capability boundary.
//!
//! Implementations wrap the platform's biometric APIs. The connector
//! drives them through commands and receives everything back as typed
//! events on a channel, which the connector's run loop serializes onto
//! its single mutation context.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use wk_protocol::{QuantityKind, Sample, WorkoutConfiguration, WorkoutEvent};

use crate::error::SensorError;

/// Boxed future returned by sensor operations, `'static` so the caller
/// can await it without pinning the service borrow.
pub type SensorFuture<T> =
    Pin<Box<dyn Future<Output = Result<T, SensorError>> + Send + 'static>>;

/// Identifier for an active per-measurement-kind query subscription.
pub type QueryHandle = u64;

/// The platform session's own phase, delivered as an input event. The
/// connector never re-queries this; it keeps its own state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    Running,
    Paused,
    Ended,
}

/// Event emitted by the sensor capability, possibly from an arbitrary
/// thread; the connector marshals these onto its run loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    /// The platform session changed phase at the given epoch-second time.
    StateChanged {
        from: SessionPhase,
        to: SessionPhase,
        at: f64,
    },
    /// The platform session generated a workout event (pause, lap, ...).
    Generated(WorkoutEvent),
    /// A query subscription produced new samples.
    Samples {
        kind: QuantityKind,
        samples: Vec<Sample>,
    },
    /// The session failed while running.
    Failed(SensorError),
}

/// Commands accepted by the sensor/session capability.
pub trait SensorService: Send {
    /// Asks the platform for read access to the given measurement kinds.
    fn request_authorization(&mut self, kinds: &[QuantityKind]) -> SensorFuture<()>;

    /// Constructs and starts the underlying session. Phase changes arrive
    /// later as [`SensorEvent::StateChanged`].
    fn start_session(&mut self, config: &WorkoutConfiguration) -> Result<(), SensorError>;

    fn pause_session(&mut self);

    fn resume_session(&mut self);

    fn end_session(&mut self);

    /// Subscribes to samples of one measurement kind.
    fn start_query(&mut self, kind: QuantityKind) -> QueryHandle;

    fn stop_query(&mut self, handle: QueryHandle);
}

/// Everything the connector needs from a sensor implementation.
pub struct SensorParts {
    pub service: Box<dyn SensorService>,
    pub events_rx: mpsc::UnboundedReceiver<SensorEvent>,
}
