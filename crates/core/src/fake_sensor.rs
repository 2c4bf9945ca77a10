//! Fake sensor capability for testing the connector without hardware.
//!
//! The service half records every command it receives; the controller
//! half lets a test script session phase changes, sample batches, and
//! failures, exactly as a platform implementation would report them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use wk_protocol::{QuantityKind, Sample, WorkoutConfiguration, WorkoutEvent, epoch_now};

use crate::error::SensorError;
use crate::sensor::{
    QueryHandle, SensorEvent, SensorFuture, SensorParts, SensorService, SessionPhase,
};

/// Builder for creating fake sensor instances.
pub struct FakeSensorBuilder {
    authorized: bool,
    session_start_error: Option<SensorError>,
}

impl FakeSensorBuilder {
    /// A sensor that grants authorization and starts sessions successfully.
    pub fn new() -> Self {
        Self {
            authorized: true,
            session_start_error: None,
        }
    }

    /// Makes authorization requests fail with [`SensorError::AccessDenied`].
    pub fn deny_authorization(mut self) -> Self {
        self.authorized = false;
        self
    }

    /// Makes the next `start_session` call fail with the given error.
    pub fn fail_session_start(mut self, err: SensorError) -> Self {
        self.session_start_error = Some(err);
        self
    }

    /// Build the fake sensor, returning parts for the connector and a
    /// controller for the test.
    pub fn build(self) -> (SensorParts, FakeSensorController) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            authorized: self.authorized,
            session_start_error: Mutex::new(self.session_start_error),
            next_query: AtomicU64::new(1),
            log: Mutex::new(CallLog::default()),
        });

        let parts = SensorParts {
            service: Box::new(FakeSensor {
                shared: Arc::clone(&shared),
            }),
            events_rx,
        };

        let controller = FakeSensorController { shared, events_tx };

        (parts, controller)
    }
}

impl Default for FakeSensorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct CallLog {
    authorization_requests: Vec<Vec<QuantityKind>>,
    sessions_started: Vec<WorkoutConfiguration>,
    pauses: usize,
    resumes: usize,
    ends: usize,
    queries_started: Vec<QuantityKind>,
    queries_stopped: Vec<QueryHandle>,
}

struct Shared {
    authorized: bool,
    session_start_error: Mutex<Option<SensorError>>,
    next_query: AtomicU64,
    log: Mutex<CallLog>,
}

/// Controller for scripting the fake sensor and inspecting recorded calls.
pub struct FakeSensorController {
    shared: Arc<Shared>,
    events_tx: mpsc::UnboundedSender<SensorEvent>,
}

impl FakeSensorController {
    /// Reports the session transitioning from not-started to running.
    pub fn report_running(&self) {
        self.report_phase(SessionPhase::NotStarted, SessionPhase::Running);
    }

    pub fn report_paused(&self) {
        self.report_phase(SessionPhase::Running, SessionPhase::Paused);
    }

    pub fn report_resumed(&self) {
        self.report_phase(SessionPhase::Paused, SessionPhase::Running);
    }

    pub fn report_ended(&self) {
        self.report_phase(SessionPhase::Running, SessionPhase::Ended);
    }

    pub fn report_phase(&self, from: SessionPhase, to: SessionPhase) {
        let _ = self.events_tx.send(SensorEvent::StateChanged {
            from,
            to,
            at: epoch_now(),
        });
    }

    /// Emits a batch of samples as if a query subscription produced them.
    pub fn emit_samples(&self, kind: QuantityKind, samples: Vec<Sample>) {
        let _ = self.events_tx.send(SensorEvent::Samples { kind, samples });
    }

    /// Emits a session-generated workout event.
    pub fn emit_event(&self, event: WorkoutEvent) {
        let _ = self.events_tx.send(SensorEvent::Generated(event));
    }

    /// Reports a mid-session failure.
    pub fn fail(&self, err: SensorError) {
        let _ = self.events_tx.send(SensorEvent::Failed(err));
    }

    pub fn authorization_requests(&self) -> Vec<Vec<QuantityKind>> {
        self.shared.log.lock().authorization_requests.clone()
    }

    pub fn sessions_started(&self) -> Vec<WorkoutConfiguration> {
        self.shared.log.lock().sessions_started.clone()
    }

    pub fn pauses(&self) -> usize {
        self.shared.log.lock().pauses
    }

    pub fn resumes(&self) -> usize {
        self.shared.log.lock().resumes
    }

    pub fn ends(&self) -> usize {
        self.shared.log.lock().ends
    }

    pub fn queries_started(&self) -> Vec<QuantityKind> {
        self.shared.log.lock().queries_started.clone()
    }

    pub fn queries_stopped(&self) -> Vec<QueryHandle> {
        self.shared.log.lock().queries_stopped.clone()
    }
}

struct FakeSensor {
    shared: Arc<Shared>,
}

impl SensorService for FakeSensor {
    fn request_authorization(&mut self, kinds: &[QuantityKind]) -> SensorFuture<()> {
        self.shared
            .log
            .lock()
            .authorization_requests
            .push(kinds.to_vec());

        let result = if self.shared.authorized {
            Ok(())
        } else {
            Err(SensorError::AccessDenied)
        };
        Box::pin(std::future::ready(result))
    }

    fn start_session(&mut self, config: &WorkoutConfiguration) -> Result<(), SensorError> {
        if let Some(err) = self.shared.session_start_error.lock().take() {
            return Err(err);
        }
        self.shared.log.lock().sessions_started.push(*config);
        Ok(())
    }

    fn pause_session(&mut self) {
        self.shared.log.lock().pauses += 1;
    }

    fn resume_session(&mut self) {
        self.shared.log.lock().resumes += 1;
    }

    fn end_session(&mut self) {
        self.shared.log.lock().ends += 1;
    }

    fn start_query(&mut self, kind: QuantityKind) -> QueryHandle {
        self.shared.log.lock().queries_started.push(kind);
        self.shared.next_query.fetch_add(1, Ordering::SeqCst)
    }

    fn stop_query(&mut self, handle: QueryHandle) {
        self.shared.log.lock().queries_stopped.push(handle);
    }
}
