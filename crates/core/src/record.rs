//! Finished-workout summary record and its persistence boundary.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use wk_protocol::{ActivityKind, LocationKind, Quantity, Sample, WorkoutEvent};

use crate::duration::active_duration;
use crate::error::StoreError;

/// Summary of a completed workout, assembled by the connector when the
/// underlying session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub activity: ActivityKind,
    pub location: LocationKind,
    /// Epoch seconds when the workout started.
    pub start: f64,
    /// Epoch seconds when the workout was stopped.
    pub end: f64,
    /// Session-generated events in arrival order.
    pub events: Vec<WorkoutEvent>,
    pub total_energy: Quantity,
    pub total_distance: Quantity,
    pub first_heart_rate: Option<Sample>,
    pub last_heart_rate: Option<Sample>,
}

impl ActivityRecord {
    /// Active (unpaused) duration in seconds.
    pub fn active_duration(&self) -> f64 {
        active_duration(&self.events, Some(self.start), Some(self.end))
    }
}

/// Destination for finished activity records.
pub trait RecordStore: Send + Sync {
    fn save(&self, record: &ActivityRecord) -> Result<(), StoreError>;
}

/// In-memory store, used in tests and as a buffer before export.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ActivityRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<ActivityRecord> {
        self.records.lock().clone()
    }
}

impl RecordStore for MemoryStore {
    fn save(&self, record: &ActivityRecord) -> Result<(), StoreError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
