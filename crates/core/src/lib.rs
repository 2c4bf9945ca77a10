//! Session-side workout coordination.
//!
//! This crate ties together the pieces a workout session device needs:
//! a [`WorkoutConnector`] state machine driving a platform
//! [`SensorService`], a [`PeerRelay`](wk_runtime::PeerRelay) carrying
//! messages to the companion device, a [`ConnectorDelegate`] observing
//! progress, and a [`RecordStore`] receiving the finished
//! [`ActivityRecord`].
//!
//! Wire types live in [`wk_protocol`], transport plumbing in
//! [`wk_runtime`]; both are re-exported here for convenience.

pub mod connector;
pub mod delegate;
pub mod duration;
pub mod error;
pub mod fake_sensor;
pub mod options;
pub mod record;
pub mod sensor;

pub use connector::WorkoutConnector;
pub use delegate::ConnectorDelegate;
pub use duration::active_duration;
pub use error::{SESSION_FAILURE_CODE, SensorError, StoreError, WorkoutError};
pub use fake_sensor::{FakeSensorBuilder, FakeSensorController};
pub use options::{ConnectorOptions, DEFAULT_WORKOUT_DURATION};
pub use record::{ActivityRecord, MemoryStore, RecordStore};
pub use sensor::{
    QueryHandle, SensorEvent, SensorFuture, SensorParts, SensorService, SessionPhase,
};

pub use wk_protocol as protocol;
pub use wk_runtime as runtime;
