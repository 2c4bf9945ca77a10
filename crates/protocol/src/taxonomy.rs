//! Stable string identifiers for platform enumerations.
//!
//! The platform's activity, event, and measurement enumerations are opaque
//! integers; the wire format carries these string tokens instead so that
//! either peer can decode a message without sharing the platform headers.

use serde::{Deserialize, Serialize};

/// The kind of physical activity a workout session tracks.
///
/// Unknown identifiers decode to [`ActivityKind::Other`] rather than
/// failing the whole message, so new activities on one peer degrade
/// gracefully on the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    CrossTraining,
    CrossCountrySkiing,
    Cycling,
    Dance,
    Elliptical,
    FunctionalStrengthTraining,
    Golf,
    HighIntensityIntervalTraining,
    Hiking,
    Rowing,
    Running,
    Soccer,
    StairClimbing,
    Swimming,
    Tennis,
    Walking,
    WheelchairRunPace,
    WheelchairWalkPace,
    Yoga,
    Other,
}

impl ActivityKind {
    const IDENTIFIERS: [(ActivityKind, &'static str); 20] = [
        (ActivityKind::CrossTraining, "crossTraining"),
        (ActivityKind::CrossCountrySkiing, "crossCountrySkiing"),
        (ActivityKind::Cycling, "cycling"),
        (ActivityKind::Dance, "dance"),
        (ActivityKind::Elliptical, "elliptical"),
        (ActivityKind::FunctionalStrengthTraining, "functionalStrengthTraining"),
        (ActivityKind::Golf, "golf"),
        (ActivityKind::HighIntensityIntervalTraining, "highIntensityIntervalTraining"),
        (ActivityKind::Hiking, "hiking"),
        (ActivityKind::Rowing, "rowing"),
        (ActivityKind::Running, "running"),
        (ActivityKind::Soccer, "soccer"),
        (ActivityKind::StairClimbing, "stairClimbing"),
        (ActivityKind::Swimming, "swimming"),
        (ActivityKind::Tennis, "tennis"),
        (ActivityKind::Walking, "walking"),
        (ActivityKind::WheelchairRunPace, "wheelchairRunPace"),
        (ActivityKind::WheelchairWalkPace, "wheelchairWalkPace"),
        (ActivityKind::Yoga, "yoga"),
        (ActivityKind::Other, "other"),
    ];

    pub fn identifier(&self) -> &'static str {
        Self::IDENTIFIERS
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, identifier)| *identifier)
            .unwrap_or("other")
    }

    /// Decodes an identifier token; anything unrecognized maps to `Other`.
    pub fn from_identifier(identifier: &str) -> Self {
        Self::IDENTIFIERS
            .iter()
            .find(|(_, candidate)| *candidate == identifier)
            .map(|(kind, _)| *kind)
            .unwrap_or(ActivityKind::Other)
    }
}

impl Serialize for ActivityKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.identifier())
    }
}

impl<'de> Deserialize<'de> for ActivityKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let identifier = String::deserialize(deserializer)?;
        Ok(ActivityKind::from_identifier(&identifier))
    }
}

/// Event generated by the platform session during a workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Pause,
    Resume,
    Lap,
    Marker,
    MotionPaused,
    MotionResumed,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Pause,
        EventKind::Resume,
        EventKind::Lap,
        EventKind::Marker,
        EventKind::MotionPaused,
        EventKind::MotionResumed,
    ];

    pub fn identifier(&self) -> &'static str {
        match self {
            EventKind::Pause => "pause",
            EventKind::Resume => "resume",
            EventKind::Lap => "lap",
            EventKind::Marker => "marker",
            EventKind::MotionPaused => "motionPaused",
            EventKind::MotionResumed => "motionResumed",
        }
    }

    /// Decodes an identifier token. Unknown event kinds have no safe
    /// fallback, so this returns `None` for them.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.identifier() == identifier)
    }
}

/// A timestamped session event, the element of the workout event log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkoutEvent {
    pub kind: EventKind,
    /// Epoch seconds.
    pub timestamp: f64,
}

impl WorkoutEvent {
    pub fn new(kind: EventKind, timestamp: f64) -> Self {
        Self { kind, timestamp }
    }
}

/// Measurement kind a sensor query subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuantityKind {
    ActiveEnergyBurned,
    HeartRate,
    DistanceWalkingRunning,
    DistanceCycling,
    DistanceSwimming,
    DistanceWheelchair,
}

/// The distance-like measurement kinds, in preference order.
pub const SUPPORTED_DISTANCE_KINDS: [QuantityKind; 4] = [
    QuantityKind::DistanceWalkingRunning,
    QuantityKind::DistanceCycling,
    QuantityKind::DistanceSwimming,
    QuantityKind::DistanceWheelchair,
];

impl QuantityKind {
    pub fn is_distance(&self) -> bool {
        SUPPORTED_DISTANCE_KINDS.contains(self)
    }
}

/// Whether the workout happens indoors or outdoors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocationKind {
    #[default]
    Unknown,
    Indoor,
    Outdoor,
}

/// Configuration for a workout session: what is being done and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutConfiguration {
    pub activity: ActivityKind,
    pub location: LocationKind,
}

impl WorkoutConfiguration {
    pub fn new(activity: ActivityKind, location: LocationKind) -> Self {
        Self { activity, location }
    }
}

/// The measurement kinds to subscribe to by default for an activity:
/// energy and heart rate always, plus the matching distance kind.
pub fn default_query_kinds(activity: ActivityKind) -> Vec<QuantityKind> {
    let mut kinds = vec![QuantityKind::ActiveEnergyBurned, QuantityKind::HeartRate];

    match activity {
        ActivityKind::CrossTraining
        | ActivityKind::CrossCountrySkiing
        | ActivityKind::Golf
        | ActivityKind::Hiking
        | ActivityKind::Running
        | ActivityKind::Walking => kinds.push(QuantityKind::DistanceWalkingRunning),
        ActivityKind::Cycling => kinds.push(QuantityKind::DistanceCycling),
        ActivityKind::Swimming => kinds.push(QuantityKind::DistanceSwimming),
        ActivityKind::WheelchairWalkPace | ActivityKind::WheelchairRunPace => {
            kinds.push(QuantityKind::DistanceWheelchair)
        }
        _ => {}
    }

    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_identifiers_round_trip() {
        for kind in [
            ActivityKind::Running,
            ActivityKind::WheelchairWalkPace,
            ActivityKind::HighIntensityIntervalTraining,
        ] {
            assert_eq!(ActivityKind::from_identifier(kind.identifier()), kind);
        }
    }

    #[test]
    fn unknown_activity_decodes_to_other() {
        assert_eq!(ActivityKind::from_identifier("underwaterBasketWeaving"), ActivityKind::Other);
        let decoded: ActivityKind = serde_json::from_value("baseball".into()).unwrap();
        assert_eq!(decoded, ActivityKind::Other);
    }

    #[test]
    fn unknown_event_kind_fails_to_decode() {
        assert_eq!(EventKind::from_identifier("resume"), Some(EventKind::Resume));
        assert_eq!(EventKind::from_identifier("teleport"), None);
    }

    #[test]
    fn distance_predicate_matches_supported_list() {
        assert!(QuantityKind::DistanceCycling.is_distance());
        assert!(QuantityKind::DistanceWheelchair.is_distance());
        assert!(!QuantityKind::HeartRate.is_distance());
        assert!(!QuantityKind::ActiveEnergyBurned.is_distance());
    }

    #[test]
    fn default_kinds_always_include_energy_and_heart_rate() {
        for activity in [ActivityKind::Running, ActivityKind::Yoga, ActivityKind::Other] {
            let kinds = default_query_kinds(activity);
            assert!(kinds.contains(&QuantityKind::ActiveEnergyBurned));
            assert!(kinds.contains(&QuantityKind::HeartRate));
        }
    }

    #[test]
    fn default_kinds_pick_the_matching_distance() {
        assert!(default_query_kinds(ActivityKind::Running).contains(&QuantityKind::DistanceWalkingRunning));
        assert!(default_query_kinds(ActivityKind::Cycling).contains(&QuantityKind::DistanceCycling));
        assert!(default_query_kinds(ActivityKind::Swimming).contains(&QuantityKind::DistanceSwimming));
        assert!(
            default_query_kinds(ActivityKind::WheelchairRunPace).contains(&QuantityKind::DistanceWheelchair)
        );
        assert_eq!(default_query_kinds(ActivityKind::Yoga).len(), 2);
    }
}
