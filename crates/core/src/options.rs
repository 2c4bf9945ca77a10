//! Connector construction options.

use std::time::Duration;

use wk_protocol::QuantityKind;

/// Workouts stop automatically after this long unless configured
/// otherwise.
pub const DEFAULT_WORKOUT_DURATION: Duration = Duration::from_secs(15 * 60);

/// Tunables for a [`WorkoutConnector`](crate::connector::WorkoutConnector).
#[derive(Debug, Clone)]
pub struct ConnectorOptions {
    /// Maximum running time before the connector stops the workout on its
    /// own. Zero disables the watchdog.
    pub workout_duration: Duration,
    /// Relay mode: the workout was initiated by the peer, which wants raw
    /// sample batches forwarded to it.
    pub started_from_peer: bool,
    /// Measurement kinds to subscribe to. Empty means derive the default
    /// set from the activity at start time.
    pub query_kinds: Vec<QuantityKind>,
}

impl Default for ConnectorOptions {
    fn default() -> Self {
        Self {
            workout_duration: DEFAULT_WORKOUT_DURATION,
            started_from_peer: false,
            query_kinds: Vec::new(),
        }
    }
}

impl ConnectorOptions {
    pub fn with_workout_duration(mut self, duration: Duration) -> Self {
        self.workout_duration = duration;
        self
    }

    pub fn with_started_from_peer(mut self, started_from_peer: bool) -> Self {
        self.started_from_peer = started_from_peer;
        self
    }

    pub fn with_query_kinds(mut self, kinds: Vec<QuantityKind>) -> Self {
        self.query_kinds = kinds;
        self
    }
}
