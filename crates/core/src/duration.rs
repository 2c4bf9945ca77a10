//! Active-duration computation over a workout's event history.

use wk_protocol::{EventKind, WorkoutEvent, epoch_now};

/// Computes the active (unpaused) duration of a workout, in seconds.
///
/// Walks the event history in order, accumulating the gap between the
/// last resume point and each pause. Time after a trailing unmatched
/// pause is excluded. With `end` unset the workout is considered still
/// running and the final span extends to the current time.
///
/// Returns `0.0` when the workout never started.
pub fn active_duration(events: &[WorkoutEvent], start: Option<f64>, end: Option<f64>) -> f64 {
    let Some(start) = start else {
        return 0.0;
    };

    let mut duration = 0.0;
    let mut resume_point = start;
    let mut paused = false;

    for event in events {
        match event.kind {
            EventKind::Pause if !paused => {
                duration += event.timestamp - resume_point;
                paused = true;
            }
            EventKind::Resume => {
                resume_point = event.timestamp;
                paused = false;
            }
            _ => {}
        }
    }

    if !paused {
        duration += end.unwrap_or_else(epoch_now) - resume_point;
    }

    duration
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind, timestamp: f64) -> WorkoutEvent {
        WorkoutEvent { kind, timestamp }
    }

    #[test]
    fn no_events_spans_start_to_end() {
        assert_eq!(active_duration(&[], Some(100.0), Some(160.0)), 60.0);
    }

    #[test]
    fn never_started_is_zero() {
        let events = [event(EventKind::Pause, 10.0)];
        assert_eq!(active_duration(&events, None, Some(50.0)), 0.0);
    }

    #[test]
    fn pause_and_resume_excludes_the_gap() {
        let events = [
            event(EventKind::Pause, 110.0),
            event(EventKind::Resume, 140.0),
        ];
        assert_eq!(active_duration(&events, Some(100.0), Some(160.0)), 30.0);
    }

    #[test]
    fn multiple_pauses_each_exclude_their_gap() {
        let events = [
            event(EventKind::Pause, 110.0),
            event(EventKind::Resume, 120.0),
            event(EventKind::Pause, 150.0),
            event(EventKind::Resume, 155.0),
        ];
        // 100..110 active, 120..150 active, 155..160 active.
        assert_eq!(active_duration(&events, Some(100.0), Some(160.0)), 45.0);
    }

    #[test]
    fn trailing_unmatched_pause_excludes_the_rest() {
        let events = [event(EventKind::Pause, 130.0)];
        assert_eq!(active_duration(&events, Some(100.0), Some(500.0)), 30.0);
    }

    #[test]
    fn repeated_pause_does_not_double_count() {
        let events = [
            event(EventKind::Pause, 110.0),
            event(EventKind::Pause, 115.0),
            event(EventKind::Resume, 120.0),
        ];
        assert_eq!(active_duration(&events, Some(100.0), Some(130.0)), 20.0);
    }

    #[test]
    fn non_pause_events_are_ignored() {
        let events = [
            event(EventKind::Lap, 110.0),
            event(EventKind::Marker, 120.0),
            event(EventKind::MotionPaused, 125.0),
        ];
        assert_eq!(active_duration(&events, Some(100.0), Some(160.0)), 60.0);
    }

    #[test]
    fn missing_end_extends_to_now() {
        let start = epoch_now() - 10.0;
        let measured = active_duration(&[], Some(start), None);
        assert!(measured >= 10.0 && measured < 11.0, "got {measured}");
    }

    #[test]
    fn never_exceeds_wall_clock_span() {
        let events = [
            event(EventKind::Pause, 105.0),
            event(EventKind::Resume, 106.0),
            event(EventKind::Pause, 107.0),
            event(EventKind::Pause, 107.0),
            event(EventKind::Resume, 150.0),
        ];
        let active = active_duration(&events, Some(100.0), Some(160.0));
        assert!(active <= 60.0, "got {active}");
    }
}
