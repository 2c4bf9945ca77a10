//! The workout session connector.
//!
//! [`WorkoutConnector`] owns the session-side state machine. All inputs
//! (sensor events, peer messages, the duration watchdog) funnel through
//! the single [`run`](WorkoutConnector::run) loop, so state mutations are
//! serialized without callers needing to coordinate. Locks are only held
//! to read or mutate state; delegate callbacks and sensor commands happen
//! with no lock held.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use wk_protocol::{
    MessageBody, Quantity, QuantityKind, Sample, Unit, WorkoutCommand, WorkoutConfiguration,
    WorkoutMessage, WorkoutState, default_query_kinds, epoch_now,
};
use wk_runtime::{InboundMessage, PeerRelay};

use crate::delegate::ConnectorDelegate;
use crate::error::{SESSION_FAILURE_CODE, SensorError, WorkoutError};
use crate::options::ConnectorOptions;
use crate::record::{ActivityRecord, RecordStore};
use crate::sensor::{QueryHandle, SensorEvent, SensorParts, SensorService, SessionPhase};

/// Watchdog granularity for the automatic duration stop.
const WATCHDOG_TICK: Duration = Duration::from_secs(1);

struct ConnectorState {
    phase: WorkoutState,
    session_active: bool,
    config: Option<WorkoutConfiguration>,
    query_kinds: Vec<QuantityKind>,
    active_queries: Vec<QueryHandle>,
    workout_duration: Duration,
    timer_started: Option<Instant>,
    start_timestamp: Option<f64>,
    end_timestamp: Option<f64>,
    started_from_peer: bool,
    total_energy: Quantity,
    total_distance: Quantity,
    first_heart_rate: Option<Sample>,
    current_heart_rate: Option<Sample>,
    events: Vec<wk_protocol::WorkoutEvent>,
}

struct Receivers {
    sensor_events: mpsc::UnboundedReceiver<SensorEvent>,
    inbound: mpsc::UnboundedReceiver<InboundMessage>,
}

/// Coordinates one workout between the sensor capability, the peer relay,
/// the delegate, and the record store.
///
/// Typically wrapped in an [`Arc`]: one clone drives [`run`], the others
/// issue commands like [`start_workout`] and [`stop_workout`].
///
/// [`run`]: WorkoutConnector::run
/// [`start_workout`]: WorkoutConnector::start_workout
/// [`stop_workout`]: WorkoutConnector::stop_workout
pub struct WorkoutConnector<D: ConnectorDelegate> {
    relay: PeerRelay,
    delegate: D,
    store: Arc<dyn RecordStore>,
    sensor: Mutex<Box<dyn SensorService>>,
    state: Mutex<ConnectorState>,
    inbound_tx: mpsc::UnboundedSender<InboundMessage>,
    receivers: Mutex<Option<Receivers>>,
}

impl<D: ConnectorDelegate> WorkoutConnector<D> {
    pub fn new(
        relay: PeerRelay,
        sensor: SensorParts,
        store: Arc<dyn RecordStore>,
        delegate: D,
        options: ConnectorOptions,
    ) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        Self {
            relay,
            delegate,
            store,
            sensor: Mutex::new(sensor.service),
            state: Mutex::new(ConnectorState {
                phase: WorkoutState::NotStarted,
                session_active: false,
                config: None,
                query_kinds: options.query_kinds,
                active_queries: Vec::new(),
                workout_duration: options.workout_duration,
                timer_started: None,
                start_timestamp: None,
                end_timestamp: None,
                started_from_peer: options.started_from_peer,
                total_energy: Quantity::zero(Unit::Kilocalories),
                total_distance: Quantity::zero(Unit::Meters),
                first_heart_rate: None,
                current_heart_rate: None,
                events: Vec::new(),
            }),
            inbound_tx,
            receivers: Mutex::new(Some(Receivers {
                sensor_events: sensor.events_rx,
                inbound: inbound_rx,
            })),
        }
    }

    /// The connector's current lifecycle state.
    pub fn workout_state(&self) -> WorkoutState {
        self.state.lock().phase
    }

    pub fn total_energy(&self) -> Quantity {
        self.state.lock().total_energy
    }

    pub fn total_distance(&self) -> Quantity {
        self.state.lock().total_distance
    }

    pub fn first_heart_rate(&self) -> Option<Sample> {
        self.state.lock().first_heart_rate
    }

    pub fn current_heart_rate(&self) -> Option<Sample> {
        self.state.lock().current_heart_rate
    }

    /// Requests authorization and starts the underlying session.
    ///
    /// No-op when a session already exists or the workout has ended.
    /// Success here means the session was created; the transition to
    /// `Running` arrives later through the sensor event stream.
    pub async fn start_workout(&self, config: WorkoutConfiguration) -> Result<(), WorkoutError> {
        let kinds = {
            let mut state = self.state.lock();
            if state.session_active || state.phase.is_terminal() {
                debug!(target: "wk.connector", phase = %state.phase, "start ignored");
                return Ok(());
            }
            state.phase = WorkoutState::Starting;
            state.config = Some(config);
            if state.query_kinds.is_empty() {
                state.query_kinds = default_query_kinds(config.activity);
            }
            state.query_kinds.clone()
        };

        info!(
            target: "wk.connector",
            activity = config.activity.identifier(),
            "starting workout"
        );
        self.relay.bind(self.inbound_tx.clone());

        let authorization = self.sensor.lock().request_authorization(&kinds);
        if let Err(err) = authorization.await {
            return Err(self.fail_start(WorkoutError::AuthorizationDenied(err)));
        }

        let started = self.sensor.lock().start_session(&config);
        if let Err(err) = started {
            return Err(self.fail_start(WorkoutError::SessionStart(err)));
        }

        {
            let mut state = self.state.lock();
            state.session_active = true;
            state.start_timestamp = Some(epoch_now());
        }
        Ok(())
    }

    /// Ends the underlying session. No-op without an active session or
    /// once stopping is already underway. The transition to `Ended`
    /// arrives later through the sensor event stream.
    pub fn stop_workout(&self) {
        {
            let mut state = self.state.lock();
            if !state.session_active
                || matches!(state.phase, WorkoutState::Stopping | WorkoutState::Ended)
            {
                debug!(target: "wk.connector", phase = %state.phase, "stop ignored");
                return;
            }
            state.phase = WorkoutState::Stopping;
            state.end_timestamp = Some(epoch_now());
        }

        info!(target: "wk.connector", "stopping workout");
        self.sensor.lock().end_session();
    }

    /// Replaces the duration budget, restarting the countdown. Zero
    /// disables the automatic stop.
    pub fn set_workout_duration(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.workout_duration = duration;
        state.timer_started = (!duration.is_zero()).then(Instant::now);
    }

    /// Drives the connector until the workout ends.
    ///
    /// Serializes sensor events, inbound peer messages, and the duration
    /// watchdog onto one task.
    ///
    /// # Panics
    ///
    /// Panics if called more than once.
    pub async fn run(&self) {
        let Receivers {
            mut sensor_events,
            mut inbound,
        } = self
            .receivers
            .lock()
            .take()
            .expect("run() can only be called once");

        let mut watchdog = tokio::time::interval(WATCHDOG_TICK);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = sensor_events.recv() => match event {
                    Some(event) => self.handle_sensor_event(event),
                    None => break,
                },
                message = inbound.recv() => {
                    if let Some(message) = message {
                        self.handle_inbound(message);
                    }
                }
                _ = watchdog.tick() => self.check_workout_duration(),
            }

            if self.state.lock().phase.is_terminal() {
                break;
            }
        }
    }

    fn fail_start(&self, err: WorkoutError) -> WorkoutError {
        {
            let mut state = self.state.lock();
            state.phase = WorkoutState::NotStarted;
            state.config = None;
        }
        error!(target: "wk.connector", error = %err, "workout failed to start");
        self.relay
            .send(WorkoutMessage::error(err.error_code(), err.to_string()));
        err
    }

    fn handle_sensor_event(&self, event: SensorEvent) {
        match event {
            SensorEvent::StateChanged { from, to, .. } => self.handle_phase_change(from, to),
            SensorEvent::Generated(event) => {
                {
                    let mut state = self.state.lock();
                    if state.phase.is_terminal() {
                        return;
                    }
                    state.events.push(event);
                }
                self.relay
                    .send(WorkoutMessage::event(event).echoing(self.workout_state()));
            }
            SensorEvent::Samples { kind, samples } => self.process_samples(kind, samples),
            SensorEvent::Failed(err) => self.handle_sensor_failure(err),
        }
    }

    fn handle_phase_change(&self, from: SessionPhase, to: SessionPhase) {
        debug!(target: "wk.connector", ?from, ?to, "session phase change");
        match to {
            SessionPhase::Running => {
                let resumed = matches!(from, SessionPhase::Paused);
                let started_config = {
                    let mut state = self.state.lock();
                    if state.phase.is_terminal() {
                        return;
                    }
                    state.phase = WorkoutState::Running;
                    if !resumed && state.active_queries.is_empty() {
                        if !state.workout_duration.is_zero() {
                            state.timer_started = Some(Instant::now());
                        }
                        state.config
                    } else {
                        None
                    }
                };

                self.relay.send(WorkoutMessage::state(WorkoutState::Running));

                if let Some(config) = started_config {
                    self.start_queries();
                    info!(
                        target: "wk.connector",
                        activity = config.activity.identifier(),
                        "workout running"
                    );
                    self.delegate.did_start_workout(config);
                } else if resumed {
                    self.delegate.did_resume();
                }
            }
            SessionPhase::Paused => {
                {
                    let mut state = self.state.lock();
                    if state.phase.is_terminal() {
                        return;
                    }
                    state.phase = WorkoutState::Paused;
                }
                self.delegate.did_pause();
            }
            SessionPhase::Ended => self.finish_workout(),
            SessionPhase::NotStarted => {}
        }
    }

    fn start_queries(&self) {
        let kinds = self.state.lock().query_kinds.clone();
        let handles: Vec<QueryHandle> = {
            let mut sensor = self.sensor.lock();
            kinds.iter().map(|kind| sensor.start_query(*kind)).collect()
        };
        self.state.lock().active_queries = handles;
    }

    /// Terminal transition: tear down queries, assemble and persist the
    /// record, release the relay, then notify both peers.
    fn finish_workout(&self) {
        let (record, queries) = {
            let mut state = self.state.lock();
            if state.phase.is_terminal() {
                return;
            }
            state.phase = WorkoutState::Ended;
            state.session_active = false;
            state.timer_started = None;

            let config = state
                .config
                .unwrap_or(WorkoutConfiguration::new(
                    wk_protocol::ActivityKind::Other,
                    wk_protocol::LocationKind::Unknown,
                ));
            let end = state.end_timestamp.unwrap_or_else(epoch_now);
            let record = ActivityRecord {
                activity: config.activity,
                location: config.location,
                start: state.start_timestamp.unwrap_or(end),
                end,
                events: state.events.clone(),
                total_energy: state.total_energy,
                total_distance: state.total_distance,
                first_heart_rate: state.first_heart_rate,
                last_heart_rate: state.current_heart_rate,
            };
            (record, std::mem::take(&mut state.active_queries))
        };

        {
            let mut sensor = self.sensor.lock();
            for handle in queries {
                sensor.stop_query(handle);
            }
        }

        if let Err(err) = self.store.save(&record) {
            warn!(target: "wk.connector", error = %err, "record not persisted");
        }

        info!(
            target: "wk.connector",
            active_seconds = record.active_duration(),
            "workout ended"
        );
        self.relay.unbind();
        self.relay.send(WorkoutMessage::state(WorkoutState::Ended));
        self.delegate.did_end_workout(record);
    }

    fn process_samples(&self, kind: QuantityKind, samples: Vec<Sample>) {
        if samples.is_empty() {
            return;
        }

        let mut energy_total = None;
        let mut distance_total = None;
        let mut heart_rate = None;
        let forward = {
            let mut state = self.state.lock();
            if state.phase.is_terminal() {
                return;
            }
            match kind {
                QuantityKind::ActiveEnergyBurned => {
                    let added: f64 = samples.iter().map(|sample| sample.quantity.value).sum();
                    state.total_energy = state.total_energy.adding(added);
                    energy_total = Some(state.total_energy);
                }
                QuantityKind::HeartRate => {
                    for sample in &samples {
                        if state.first_heart_rate.is_none() {
                            state.first_heart_rate = Some(*sample);
                        }
                        state.current_heart_rate = Some(*sample);
                    }
                    heart_rate = state.current_heart_rate;
                }
                distance if distance.is_distance() => {
                    let added: f64 = samples.iter().map(|sample| sample.quantity.value).sum();
                    state.total_distance = state.total_distance.adding(added);
                    distance_total = Some(state.total_distance);
                }
                _ => {}
            }
            state.started_from_peer
        };

        if let Some(total) = energy_total {
            self.delegate.did_update_total_energy(total);
        }
        if let Some(total) = distance_total {
            self.delegate.did_update_total_distance(total);
        }
        if let Some(sample) = heart_rate {
            self.delegate.did_update_heart_rate(sample);
        }

        if forward {
            self.relay
                .send(WorkoutMessage::samples(kind, samples).echoing(self.workout_state()));
        }
    }

    fn handle_sensor_failure(&self, err: SensorError) {
        error!(target: "wk.connector", error = %err, "sensor failure");
        self.relay.send(
            WorkoutMessage::error(SESSION_FAILURE_CODE, err.to_string())
                .echoing(self.workout_state()),
        );
    }

    /// Accepts a peer message: drop stale ones with an empty reply,
    /// dispatch any command, then notify the delegate and acknowledge.
    fn handle_inbound(&self, mut inbound: InboundMessage) {
        let start = self.state.lock().start_timestamp;
        let fresh = start.is_some_and(|start| inbound.message.timestamp > start);
        if !fresh {
            debug!(
                target: "wk.connector",
                identifier = %inbound.message.identifier,
                "stale peer message"
            );
            inbound.respond_empty();
            return;
        }

        if let MessageBody::Instruction {
            command: Some(command),
            ..
        } = &inbound.message.body
        {
            self.dispatch_command(*command);
        }

        self.delegate.did_receive_message(inbound.message.clone());

        let reply = WorkoutMessage::reply_to(inbound.message.identifier.clone())
            .echoing(self.workout_state());
        inbound.respond(&reply);
    }

    fn dispatch_command(&self, command: WorkoutCommand) {
        if !self.state.lock().session_active {
            debug!(target: "wk.connector", ?command, "command ignored without session");
            return;
        }
        debug!(target: "wk.connector", ?command, "dispatching peer command");

        match command {
            WorkoutCommand::Pause => self.sensor.lock().pause_session(),
            WorkoutCommand::Resume => self.sensor.lock().resume_session(),
            WorkoutCommand::Stop => {
                self.stop_workout();
                self.delegate.did_request_alert();
            }
            WorkoutCommand::StartMoving | WorkoutCommand::StopMoving => {
                self.delegate.did_request_alert();
            }
            WorkoutCommand::Ping => {}
        }
    }

    fn check_workout_duration(&self) {
        let expired = {
            let state = self.state.lock();
            state.phase == WorkoutState::Running
                && !state.workout_duration.is_zero()
                && state
                    .timer_started
                    .is_some_and(|started| started.elapsed() > state.workout_duration)
        };

        if expired {
            info!(target: "wk.connector", "duration budget exhausted");
            self.stop_workout();
        }
    }
}
