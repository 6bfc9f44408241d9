//! End-to-end acknowledgement flow over the in-process delta bus.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use notification_acker::adapters::DeltaBusAdapter;
use notification_acker::{AckerApi, AckerConfig, AckerError, AckerSettings, LifecyclePhase, NotificationAcker};
use serde_json::{json, Value};
use signalk_bus::{AppEvent, DeltaBus, InboundMessage};
use signalk_types::{Delta, NMEA2000_OUT_EVENT};
use tokio::sync::broadcast;
use tokio::time::{timeout, Instant};

type BusAcker = NotificationAcker<DeltaBusAdapter, DeltaBusAdapter, DeltaBusAdapter>;

struct Harness {
    bus: Arc<DeltaBus>,
    acker: BusAcker,
    messages: broadcast::Receiver<InboundMessage>,
    events: broadcast::Receiver<AppEvent>,
}

fn harness() -> Harness {
    let bus = Arc::new(DeltaBus::new());
    let host = Arc::new(DeltaBusAdapter::new(Arc::clone(&bus)));
    let acker = NotificationAcker::new(AckerSettings::default(), Arc::clone(&host), Arc::clone(&host), host);
    let messages = bus.messages();
    let events = bus.events();
    Harness {
        bus,
        acker,
        messages,
        events,
    }
}

fn config(value: Value) -> AckerConfig {
    serde_json::from_value(value).unwrap()
}

fn mob_config() -> AckerConfig {
    config(json!({"notifications": [{
        "path": "mob",
        "state": "alarm",
        "enabled": true,
        "delay": 2,
        "sendN2KMessages": "127.0.0.1"
    }]}))
}

fn notification(path: &str, state: &str) -> Delta {
    Delta::single(
        format!("notifications.{path}"),
        json!({
            "state": state,
            "method": ["visual", "sound"],
            "message": "Man overboard!"
        }),
    )
}

/// Let router and timer tasks run without advancing past any timer.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

async fn next_message(h: &mut Harness, within: Duration) -> InboundMessage {
    timeout(within, h.messages.recv())
        .await
        .expect("timeout waiting for acknowledgement")
        .expect("message channel closed")
}

async fn next_n2k(h: &mut Harness) -> String {
    let event = timeout(Duration::from_secs(1), h.events.recv())
        .await
        .expect("timeout waiting for nmea2000out")
        .expect("event channel closed");
    assert_eq!(event.name, NMEA2000_OUT_EVENT);
    event.payload
}

#[tokio::test(start_paused = true)]
async fn test_mob_alarm_is_acknowledged_after_delay() {
    let mut h = harness();
    h.acker.start(&mob_config()).await.unwrap();
    let published = Instant::now();

    h.bus.publish(notification("mob", "alarm"));

    let message = next_message(&mut h, Duration::from_secs(10)).await;
    let waited = published.elapsed();
    assert!(waited >= Duration::from_secs(2), "acknowledged after {waited:?}");
    assert!(waited < Duration::from_millis(2100), "acknowledged after {waited:?}");
    assert_eq!(message.source_id, "signalk-notification-acker");
    assert_eq!(
        serde_json::to_value(&message.delta).unwrap(),
        json!({"updates": [{"values": [{"path": "mob", "value": {
            "state": "alarm",
            "method": [],
            "message": "Man overboard!"
        }}]}]})
    );

    let line = next_n2k(&mut h).await;
    let (timestamp, body) = line.split_once(',').unwrap();
    assert_eq!(body, "127.0.0.1");
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());

    settle().await;
    assert!(h.messages.try_recv().is_err());
    assert_eq!(h.acker.status().await.pending, 0);
}

#[tokio::test(start_paused = true)]
async fn test_state_mismatch_schedules_nothing() {
    let mut h = harness();
    h.acker.start(&mob_config()).await.unwrap();

    h.bus.publish(notification("mob", "warn"));
    settle().await;
    assert_eq!(h.acker.status().await.pending, 0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(h.messages.try_recv().is_err());
    assert!(h.events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_any_rule_acknowledges_every_non_normal_value() {
    let mut h = harness();
    h.acker
        .start(&config(json!({"notifications": [{"path": "engine.overheat", "state": "any"}]})))
        .await
        .unwrap();

    for state in ["alert", "normal", "warn", "alarm", "emergency", "normal"] {
        h.bus.publish(notification("engine.overheat", state));
    }

    let mut states = Vec::new();
    for _ in 0..4 {
        let message = next_message(&mut h, Duration::from_secs(1)).await;
        states.push(message.delta.updates[0].values[0].value["state"].as_str().unwrap().to_string());
    }
    // Each match runs on its own timer; only the set is fixed
    states.sort();
    assert_eq!(states, vec!["alarm", "alert", "emergency", "warn"]);

    settle().await;
    assert!(h.messages.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_other_paths_are_ignored() {
    let mut h = harness();
    h.acker.start(&mob_config()).await.unwrap();

    h.bus.publish(notification("fire", "alarm"));
    h.bus.publish(Delta::single("navigation.speedOverGround", json!(3.2)));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(h.messages.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_disabled_rule_never_subscribes() {
    let mut h = harness();
    let report = h
        .acker
        .start(&config(json!({"notifications": [{"path": "mob", "state": "any", "enabled": false}]})))
        .await
        .unwrap();

    assert!(report.subscribed.is_empty());
    assert_eq!(h.bus.subscriber_count(), 0);

    h.bus.publish(notification("mob", "alarm"));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.messages.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_two_messages_are_sent_in_order() {
    let mut h = harness();
    h.acker
        .start(&config(json!({"notifications": [{
            "path": "mob",
            "state": "alarm",
            "sendN2KMessages": "A;B"
        }]})))
        .await
        .unwrap();

    h.bus.publish(notification("mob", "alarm"));
    next_message(&mut h, Duration::from_secs(1)).await;

    let first = next_n2k(&mut h).await;
    let second = next_n2k(&mut h).await;
    assert!(first.ends_with(",A"), "{first}");
    assert!(second.ends_with(",B"), "{second}");
    for line in [&first, &second] {
        let (timestamp, _) = line.split_once(',').unwrap();
        assert!(timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }
    assert!(h.events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_stop_removes_subscriptions_and_cancels() {
    let mut h = harness();
    h.acker.start(&mob_config()).await.unwrap();
    assert_eq!(h.bus.subscriber_count(), 1);

    h.bus.publish(notification("mob", "alarm"));
    settle().await;
    assert_eq!(h.acker.status().await.pending, 1);

    let report = h.acker.stop().await;
    assert_eq!(report.unsubscribed, 1);
    assert_eq!(report.cancelled, 1);
    assert_eq!(h.bus.subscriber_count(), 0);

    h.bus.publish(notification("mob", "alarm"));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(h.messages.try_recv().is_err());
    assert!(h.events.try_recv().is_err());

    let again = h.acker.stop().await;
    assert_eq!(again.unsubscribed, 0);
    assert_eq!(h.acker.status().await.phase, LifecyclePhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_and_restart() {
    let mut h = harness();
    h.acker.start(&mob_config()).await.unwrap();

    let err = h.acker.start(&mob_config()).await.unwrap_err();
    assert!(matches!(err, AckerError::AlreadyRunning));
    assert_eq!(h.bus.subscriber_count(), 1);

    h.acker.stop().await;
    h.acker
        .start(&config(json!({"notifications": [{"path": "fire", "state": "warn"}]})))
        .await
        .unwrap();
    assert_eq!(h.bus.active_paths(), vec!["notifications.fire".to_string()]);

    h.bus.publish(notification("mob", "alarm"));
    h.bus.publish(notification("fire", "warn"));

    let message = next_message(&mut h, Duration::from_secs(1)).await;
    assert_eq!(message.delta.updates[0].values[0].path, "fire");
}

#[tokio::test(start_paused = true)]
async fn test_acknowledgement_does_not_retrigger() {
    let mut h = harness();
    h.acker
        .start(&config(json!({"notifications": [{"path": "mob", "state": "any"}]})))
        .await
        .unwrap();

    h.bus.publish(notification("mob", "alarm"));
    next_message(&mut h, Duration::from_secs(1)).await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(h.messages.try_recv().is_err());
    assert_eq!(h.acker.status().await.pending, 0);
}
