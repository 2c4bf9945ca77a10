//! Observer interface for connector lifecycle and measurement updates.

use wk_protocol::{Quantity, Sample, WorkoutConfiguration, WorkoutMessage};

use crate::record::ActivityRecord;

/// Receives connector callbacks. All methods are invoked from the
/// connector's run loop with no internal locks held.
pub trait ConnectorDelegate: Send + Sync + 'static {
    /// The workout transitioned to running for the first time.
    fn did_start_workout(&self, configuration: WorkoutConfiguration);

    /// The workout ended; `record` has already been persisted.
    fn did_end_workout(&self, record: ActivityRecord);

    /// A fresh peer message was accepted, after any command dispatch.
    fn did_receive_message(&self, message: WorkoutMessage);

    fn did_pause(&self) {}

    fn did_resume(&self) {}

    fn did_update_total_energy(&self, _total: Quantity) {}

    fn did_update_total_distance(&self, _total: Quantity) {}

    fn did_update_heart_rate(&self, _sample: Sample) {}

    /// The peer asked for user attention (stop or movement instruction).
    fn did_request_alert(&self) {}
}
