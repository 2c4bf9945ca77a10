//! The message exchanged between the session device and its companion.
//!
//! Every message serializes to one flat JSON map so it can ride on
//! transports that only carry key-value dictionaries. The map always
//! contains `identifier`, `timestamp`, and `type`; messages sent by the
//! session device also echo `workoutState` so the companion can track the
//! remote state machine without a separate channel.
//!
//! Messages are immutable once constructed. A reply shares the
//! `identifier` of the message it answers; everything else gets a fresh
//! UUID.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::quantity::Sample;
use crate::state::{WorkoutCommand, WorkoutState};
use crate::taxonomy::{EventKind, QuantityKind, WorkoutEvent};

/// Current wall-clock time as epoch seconds, the protocol's timestamp
/// representation.
pub fn epoch_now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}

/// A message between the two peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutMessage {
    /// Stable across a request/reply pair; a UUID otherwise.
    pub identifier: String,
    /// Epoch seconds, set at construction.
    pub timestamp: f64,
    /// The sender's session state, set on messages from the session device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout_state: Option<WorkoutState>,
    #[serde(flatten)]
    pub body: MessageBody,
}

/// The variant payload of a [`WorkoutMessage`].
///
/// Internally tagged as `type` so the variant keys land in the same flat
/// map as the header fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageBody {
    /// A bare state notification; the payload is the `workoutState` header.
    State,
    /// Companion-to-session instruction, optionally carrying a command.
    #[serde(rename_all = "camelCase")]
    Instruction {
        #[serde(skip_serializing_if = "Option::is_none")]
        command: Option<WorkoutCommand>,
        #[serde(skip_serializing_if = "Option::is_none")]
        instruction_text: Option<String>,
        #[serde(default)]
        step_duration: f64,
    },
    /// A batch of sensor samples forwarded to the companion.
    #[serde(rename_all = "camelCase")]
    Samples {
        quantity_kind: QuantityKind,
        samples: Vec<Sample>,
    },
    /// A session event (pause, resume, lap, ...). The event's own time is
    /// `eventTimestamp` on the wire; the header `timestamp` stays the
    /// send time.
    #[serde(rename_all = "camelCase")]
    Event {
        event_kind: EventKind,
        event_timestamp: f64,
    },
    /// A failure report, best-effort.
    #[serde(rename_all = "camelCase")]
    Error { error_code: i64, error_description: String },
}

impl WorkoutMessage {
    fn with_body(body: MessageBody) -> Self {
        Self {
            identifier: Uuid::new_v4().to_string(),
            timestamp: epoch_now(),
            workout_state: None,
            body,
        }
    }

    /// A state notification.
    pub fn state(state: WorkoutState) -> Self {
        Self::with_body(MessageBody::State).echoing(state)
    }

    /// An empty reply to the message with the given identifier.
    pub fn reply_to(identifier: impl Into<String>) -> Self {
        let mut message = Self::with_body(MessageBody::State);
        message.identifier = identifier.into();
        message
    }

    /// An instruction for the session device.
    pub fn instruction(
        command: Option<WorkoutCommand>,
        instruction_text: Option<String>,
        step_duration: f64,
    ) -> Self {
        Self::with_body(MessageBody::Instruction {
            command,
            instruction_text,
            step_duration,
        })
    }

    /// A batch of samples for one measurement kind.
    pub fn samples(quantity_kind: QuantityKind, samples: Vec<Sample>) -> Self {
        Self::with_body(MessageBody::Samples {
            quantity_kind,
            samples,
        })
    }

    /// A session event report.
    pub fn event(event: WorkoutEvent) -> Self {
        Self::with_body(MessageBody::Event {
            event_kind: event.kind,
            event_timestamp: event.timestamp,
        })
    }

    /// A failure report.
    pub fn error(error_code: i64, error_description: impl Into<String>) -> Self {
        Self::with_body(MessageBody::Error {
            error_code,
            error_description: error_description.into(),
        })
    }

    /// Returns the message with the sender's state echoed in the header.
    pub fn echoing(mut self, state: WorkoutState) -> Self {
        self.workout_state = Some(state);
        self
    }

    /// The flat key-value wire representation.
    pub fn to_wire(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    /// Reconstructs a message from its wire representation.
    ///
    /// Fails closed: anything malformed yields `None` so the relay can
    /// drop it without surfacing an error to the caller.
    pub fn from_wire(wire: &JsonValue) -> Option<Self> {
        serde_json::from_value(wire.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::Unit;

    #[test]
    fn state_message_round_trips() {
        let message = WorkoutMessage::state(WorkoutState::Running);
        let wire = message.to_wire();
        assert_eq!(wire["type"], "state");
        assert_eq!(wire["workoutState"], "running");

        let back = WorkoutMessage::from_wire(&wire).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn instruction_round_trips_with_all_fields() {
        let message = WorkoutMessage::instruction(
            Some(WorkoutCommand::Pause),
            Some("Take a breather".to_string()),
            30.0,
        );
        let wire = message.to_wire();
        assert_eq!(wire["type"], "instruction");
        assert_eq!(wire["command"], "pause");
        assert_eq!(wire["instructionText"], "Take a breather");
        assert_eq!(wire["stepDuration"], 30.0);

        let back = WorkoutMessage::from_wire(&wire).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn instruction_tolerates_missing_optionals() {
        let wire = serde_json::json!({
            "identifier": "abc-123",
            "timestamp": 1700000000.5,
            "type": "instruction",
        });
        let message = WorkoutMessage::from_wire(&wire).unwrap();
        match message.body {
            MessageBody::Instruction {
                command,
                instruction_text,
                step_duration,
            } => {
                assert!(command.is_none());
                assert!(instruction_text.is_none());
                assert_eq!(step_duration, 0.0);
            }
            other => panic!("expected instruction, got {other:?}"),
        }
    }

    #[test]
    fn samples_round_trip() {
        let message = WorkoutMessage::samples(
            QuantityKind::HeartRate,
            vec![
                Sample::new(72.0, Unit::BeatsPerMinute, 10.0, 11.0),
                Sample::new(75.0, Unit::BeatsPerMinute, 11.0, 12.0),
            ],
        )
        .echoing(WorkoutState::Running);

        let wire = message.to_wire();
        assert_eq!(wire["quantityKind"], "heartRate");
        assert_eq!(wire["samples"][1]["value"], 75.0);

        let back = WorkoutMessage::from_wire(&wire).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn event_and_error_round_trip() {
        let event = WorkoutMessage::event(WorkoutEvent::new(EventKind::Lap, 42.0));
        let wire = event.to_wire();
        // The event time must not collide with the header send time in
        // the flat map, or the whole message fails to decode.
        assert_eq!(wire["eventTimestamp"], 42.0);
        assert_ne!(wire["timestamp"], 42.0);
        let back = WorkoutMessage::from_wire(&wire).unwrap();
        assert_eq!(back, event);

        let error = WorkoutMessage::error(3, "sensor offline");
        let wire = error.to_wire();
        assert_eq!(wire["errorCode"], 3);
        assert_eq!(wire["errorDescription"], "sensor offline");
        let back = WorkoutMessage::from_wire(&wire).unwrap();
        assert_eq!(back, error);
    }

    #[test]
    fn reply_shares_the_identifier_it_answers() {
        let request = WorkoutMessage::instruction(Some(WorkoutCommand::Ping), None, 0.0);
        let reply = WorkoutMessage::reply_to(request.identifier.clone())
            .echoing(WorkoutState::Running);
        assert_eq!(reply.identifier, request.identifier);
        assert_ne!(reply.timestamp, 0.0);
    }

    #[test]
    fn fresh_messages_get_distinct_identifiers() {
        let a = WorkoutMessage::state(WorkoutState::Running);
        let b = WorkoutMessage::state(WorkoutState::Running);
        assert_ne!(a.identifier, b.identifier);
    }

    #[test]
    fn malformed_wire_fails_closed() {
        for wire in [
            serde_json::json!({}),
            serde_json::json!({"identifier": "x"}),
            serde_json::json!({"identifier": "x", "timestamp": 1.0, "type": "telepathy"}),
            serde_json::json!({"identifier": "x", "timestamp": "not-a-number", "type": "state"}),
            serde_json::json!(null),
            serde_json::json!([1, 2, 3]),
        ] {
            assert!(WorkoutMessage::from_wire(&wire).is_none(), "accepted {wire}");
        }
    }
}
