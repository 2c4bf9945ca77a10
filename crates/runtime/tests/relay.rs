//! Behavioral tests for the peer relay: queueing, lazy activation,
//! backoff, and inbound routing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use wk_protocol::{WorkoutCommand, WorkoutMessage, WorkoutState};
use wk_runtime::{FakeTransportBuilder, PeerRelay, TransportError};

/// Polls `condition` under the paused test clock until it holds.
async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(60), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition not met within virtual minute");
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test(start_paused = true)]
async fn queued_sends_deliver_in_order_after_activation() {
    init_tracing();
    let (parts, controller) = FakeTransportBuilder::new().reachable(true).build();
    let relay = PeerRelay::spawn(parts);

    let first = WorkoutMessage::state(WorkoutState::Starting);
    let second = WorkoutMessage::state(WorkoutState::Running);
    relay.send(first.clone());
    relay.send(second.clone());

    // Nothing goes out until the transport reports activated.
    wait_until(|| controller.activation_attempts() == 1).await;
    assert_eq!(controller.sent_count(), 0);

    controller.complete_activation(Ok(()));
    wait_until(|| controller.sent_count() == 2).await;

    let sent = controller.take_sent();
    assert_eq!(sent[0]["identifier"], first.identifier.as_str());
    assert_eq!(sent[1]["identifier"], second.identifier.as_str());
}

#[tokio::test(start_paused = true)]
async fn send_survives_caller_drop() {
    init_tracing();
    let (parts, controller) = FakeTransportBuilder::new().build();
    let relay = PeerRelay::spawn(parts);

    {
        let caller = relay.clone();
        caller.send(WorkoutMessage::state(WorkoutState::Ended));
    }
    drop(relay);

    wait_until(|| controller.activation_attempts() == 1).await;
    controller.complete_activation(Ok(()));
    controller.set_reachable(true);

    wait_until(|| controller.sent_count() == 1).await;
}

#[tokio::test(start_paused = true)]
async fn activation_failure_fails_every_queued_message_once() {
    init_tracing();
    let (parts, controller) = FakeTransportBuilder::new().build();
    let relay = PeerRelay::spawn(parts);

    let failures = Arc::new(Mutex::new(Vec::new()));
    let replies = Arc::new(AtomicUsize::new(0));

    for n in 0..3 {
        let failures = Arc::clone(&failures);
        let replies = Arc::clone(&replies);
        relay.send_with_handlers(
            WorkoutMessage::error(n, "pending"),
            Box::new(move |_| {
                replies.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(move |err| failures.lock().push(err)),
        );
    }

    wait_until(|| controller.activation_attempts() == 1).await;
    controller.complete_activation(Err(TransportError::ActivationFailed("no pairing".into())));

    wait_until(|| failures.lock().len() == 3).await;
    assert_eq!(replies.load(Ordering::SeqCst), 0);
    assert_eq!(controller.sent_count(), 0);
    for err in failures.lock().iter() {
        assert_eq!(err, &TransportError::ActivationFailed("no pairing".into()));
    }

    // The failed generation is not retried; a fresh send re-triggers
    // activation from scratch.
    relay.send(WorkoutMessage::state(WorkoutState::Running));
    wait_until(|| controller.activation_attempts() == 2).await;
    controller.complete_activation(Ok(()));
    controller.set_reachable(true);
    wait_until(|| controller.sent_count() == 1).await;
    assert_eq!(failures.lock().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn per_message_failure_leaves_other_messages_alone() {
    init_tracing();
    let (parts, controller) = FakeTransportBuilder::new().reachable(true).auto_activate().build();
    let relay = PeerRelay::spawn(parts);

    let failed = Arc::new(AtomicUsize::new(0));
    let delivered = Arc::new(AtomicUsize::new(0));

    controller.plan_send_errors(TransportError::SendFailed("payload too large".into()), 1);

    for _ in 0..2 {
        let failed = Arc::clone(&failed);
        let delivered = Arc::clone(&delivered);
        relay.send_with_handlers(
            WorkoutMessage::state(WorkoutState::Running),
            Box::new(move |_| {
                delivered.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(move |_| {
                failed.fetch_add(1, Ordering::SeqCst);
            }),
        );
    }

    wait_until(|| failed.load(Ordering::SeqCst) + delivered.load(Ordering::SeqCst) == 2).await;
    assert_eq!(failed.load(Ordering::SeqCst), 1);
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    assert_eq!(controller.sent_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn unreachable_peer_retries_until_reachable() {
    init_tracing();
    let (parts, controller) = FakeTransportBuilder::new().auto_activate().build();
    let relay = PeerRelay::spawn(parts);

    relay.send(WorkoutMessage::state(WorkoutState::Running));

    // Activated but unreachable: the message stays queued across several
    // backoff rounds.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.sent_count(), 0);

    controller.set_reachable(true);
    wait_until(|| controller.sent_count() == 1).await;
}

#[tokio::test(start_paused = true)]
async fn inbound_routes_to_bound_listener_with_reply_continuation() {
    init_tracing();
    let (parts, controller) = FakeTransportBuilder::new().build();
    let relay = PeerRelay::spawn(parts);

    let (listener_tx, mut listener_rx) = mpsc::unbounded_channel();
    relay.bind(listener_tx);

    let instruction = WorkoutMessage::instruction(Some(WorkoutCommand::Pause), None, 0.0);
    let reply_rx = controller.inject_with_reply(instruction.to_wire());

    let mut inbound = tokio::time::timeout(Duration::from_secs(5), listener_rx.recv())
        .await
        .expect("listener should receive inbound")
        .expect("channel open");
    assert_eq!(inbound.message, instruction);

    let reply = WorkoutMessage::reply_to(inbound.message.identifier.clone())
        .echoing(WorkoutState::Paused);
    inbound.respond(&reply);

    let wire = reply_rx.await.expect("reply should arrive");
    assert_eq!(wire["identifier"], instruction.identifier.as_str());
    assert_eq!(wire["workoutState"], "paused");
}

#[tokio::test(start_paused = true)]
async fn inbound_without_listener_or_with_bad_wire_is_dropped() {
    init_tracing();
    let (parts, controller) = FakeTransportBuilder::new().build();
    let relay = PeerRelay::spawn(parts);

    // No listener bound yet; let the wire reach the relay before one is.
    controller.inject(WorkoutMessage::state(WorkoutState::Running).to_wire());
    tokio::time::sleep(Duration::from_millis(50)).await;
    // Malformed even with a listener bound.
    let (listener_tx, mut listener_rx) = mpsc::unbounded_channel();
    relay.bind(listener_tx);
    controller.inject(serde_json::json!({"garbage": true}));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(listener_rx.try_recv().is_err());

    // A well-formed message still gets through afterwards.
    let event = WorkoutMessage::state(WorkoutState::Paused);
    controller.inject(event.to_wire());
    let inbound = tokio::time::timeout(Duration::from_secs(5), listener_rx.recv())
        .await
        .expect("listener should receive inbound")
        .expect("channel open");
    assert_eq!(inbound.message, event);
}

#[tokio::test(start_paused = true)]
async fn unbind_stops_inbound_forwarding() {
    init_tracing();
    let (parts, controller) = FakeTransportBuilder::new().build();
    let relay = PeerRelay::spawn(parts);

    let (listener_tx, mut listener_rx) = mpsc::unbounded_channel();
    relay.bind(listener_tx);
    relay.unbind();

    controller.inject(WorkoutMessage::state(WorkoutState::Running).to_wire());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(listener_rx.try_recv().is_err());
}
