//! Session lifecycle state and remote command tokens.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a workout session.
///
/// The connector stores and mutates this directly; the platform session's
/// own phase is treated as an input event, never re-queried as the source
/// of truth. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkoutState {
    NotStarted,
    Starting,
    Running,
    Paused,
    Stopping,
    Ended,
}

impl WorkoutState {
    /// Returns `true` once no further transitions are accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkoutState::Ended)
    }

    /// Stable string token used on the wire and in logs.
    pub fn identifier(&self) -> &'static str {
        match self {
            WorkoutState::NotStarted => "notStarted",
            WorkoutState::Starting => "starting",
            WorkoutState::Running => "running",
            WorkoutState::Paused => "paused",
            WorkoutState::Stopping => "stopping",
            WorkoutState::Ended => "ended",
        }
    }
}

impl std::fmt::Display for WorkoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Command sent by the companion device to change the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkoutCommand {
    Stop,
    Pause,
    Resume,
    StartMoving,
    StopMoving,
    Ping,
}

impl WorkoutCommand {
    pub fn identifier(&self) -> &'static str {
        match self {
            WorkoutCommand::Stop => "stop",
            WorkoutCommand::Pause => "pause",
            WorkoutCommand::Resume => "resume",
            WorkoutCommand::StartMoving => "startMoving",
            WorkoutCommand::StopMoving => "stopMoving",
            WorkoutCommand::Ping => "ping",
        }
    }
}

impl std::fmt::Display for WorkoutCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identifier())
    }
}
