//! Integration tests for recording keyboard activity and replaying it

mod common;

use common::mock_helpers::Harness;
use keyhistory_rs::{HistoryConfig, KeyEvent, KeyboardHistory, RawKeySignal, SignalHub};
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn test_record_then_replay_round_trip() {
    let mut h = Harness::new(HistoryConfig::default());
    common::advance_ms(500).await;

    h.history.start();
    h.tap("h", "KeyH", 120.0, 200.0);
    h.tap("i", "KeyI", 260.0, 310.5);
    h.history.stop();

    let recorded = h.history.get_recorded_keys();
    assert_eq!(
        recorded,
        vec![
            KeyEvent::new("h", "KeyH", 80.0, 120.0),
            KeyEvent::new("i", "KeyI", 50.5, 260.0),
        ]
    );

    h.history.replay(None).unwrap();
    h.history.wait_until_idle().await;

    let replayed: Vec<KeyEvent> = h.drain().iter().map(|n| n.to_event()).collect();
    assert_eq!(replayed, recorded);
    assert!(!h.history.is_replaying());
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_presses_ordered_by_press_time() {
    let mut h = Harness::new(HistoryConfig::default());
    h.history.start();

    // Shift held across a letter
    h.send(RawKeySignal::down("Shift", "ShiftLeft", 10.0));
    h.send(RawKeySignal::down("A", "KeyA", 30.0));
    h.send(RawKeySignal::up("A", "KeyA", 60.0));
    h.send(RawKeySignal::up("Shift", "ShiftLeft", 90.0));

    let keys = h.history.get_recorded_keys();
    let labels: Vec<&str> = keys.iter().map(|e| e.key.as_str()).collect();
    // Events are stored on release
    assert_eq!(labels, vec!["A", "Shift"]);
    assert_eq!(keys[1].timestamp, 10.0);
    assert_eq!(keys[1].duration, 80.0);
}

#[tokio::test(start_paused = true)]
async fn test_control_and_space_keys_normalized() {
    let mut h = Harness::new(HistoryConfig::default());
    h.history.start();

    h.tap(" ", "Space", 5.0, 15.0);
    h.tap("\r", "NumpadEnter", 20.0, 25.0);
    h.tap("Unidentified", "IntlRo", 30.0, 35.0);

    let labels: Vec<String> = h
        .history
        .get_recorded_keys()
        .into_iter()
        .map(|e| e.key)
        .collect();
    assert_eq!(labels, vec!["Space", "Enter", "IntlRo"]);
}

#[tokio::test(start_paused = true)]
async fn test_auto_repeat_follows_config() {
    for (capture_repeats, expected_start) in [(false, 10.0), (true, 40.0)] {
        let mut h = Harness::new(HistoryConfig::default().with_capture_repeats(capture_repeats));
        h.history.start();

        h.send(RawKeySignal::down("j", "KeyJ", 10.0));
        h.send(RawKeySignal::down("j", "KeyJ", 40.0).repeated());
        h.send(RawKeySignal::up("j", "KeyJ", 70.0));

        let keys = h.history.get_recorded_keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].timestamp, expected_start);
        assert_eq!(keys[0].duration, 70.0 - expected_start);
    }
}

#[tokio::test(start_paused = true)]
async fn test_held_keys_discarded_on_stop() {
    let mut h = Harness::new(HistoryConfig::default());
    h.history.start();
    let start = h.start_time();

    h.hub.key_down("a", "KeyA", start + 10.0);
    h.history.stop();
    h.hub.key_up("a", "KeyA", start + 20.0);

    assert_eq!(h.history.get_event_count(), 0);
    assert_eq!(h.hub.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_signals_ignored_when_not_recording() {
    let h = Harness::new(HistoryConfig::default());
    h.hub.key_down("a", "KeyA", 10.0);
    h.hub.key_up("a", "KeyA", 20.0);
    assert_eq!(h.history.get_event_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_bounded_history_keeps_newest() {
    let mut h = Harness::new(HistoryConfig::default().with_max_events(3));
    h.history.start();

    for (i, key) in "abcde".chars().enumerate() {
        let key = key.to_string();
        let code = format!("Key{}", key.to_uppercase());
        let t = 10.0 * (i as f64 + 1.0);
        h.tap(&key, &code, t, t + 5.0);
    }

    let labels: Vec<String> = h
        .history
        .get_recorded_keys()
        .into_iter()
        .map(|e| e.key)
        .collect();
    assert_eq!(labels, vec!["c", "d", "e"]);
}

#[tokio::test(start_paused = true)]
async fn test_independent_histories_share_a_hub() {
    let hub = Arc::new(SignalHub::new());
    let bus = Arc::new(keyhistory_rs::EventBus::new());
    let mut first = KeyboardHistory::new(HistoryConfig::default(), hub.clone(), bus.clone());
    let mut second = KeyboardHistory::new(HistoryConfig::default(), hub.clone(), bus.clone());

    first.start();
    second.start();
    assert_eq!(hub.subscriber_count(), 2);

    let start = first.get_session().start_time.unwrap();
    hub.key_down("z", "KeyZ", start + 1.0);
    hub.key_up("z", "KeyZ", start + 2.0);
    second.stop();
    hub.key_down("y", "KeyY", start + 3.0);
    hub.key_up("y", "KeyY", start + 4.0);

    assert_eq!(first.get_event_count(), 2);
    assert_eq!(second.get_event_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_recording_continues_during_replay() {
    let mut h = Harness::new(HistoryConfig::default());
    h.history.start();
    h.tap("a", "KeyA", 10.0, 20.0);

    h.history
        .replay(Some(vec![KeyEvent::new("x", "KeyX", 5.0, 1000.0)]))
        .unwrap();
    h.tap("b", "KeyB", 30.0, 40.0);

    assert!(h.history.is_replaying());
    assert!(h.history.is_recording());
    assert_eq!(h.history.get_event_count(), 2);

    h.history.wait_until_idle().await;
    // Replayed notifications never feed back into the recording
    assert_eq!(h.history.get_event_count(), 2);
    assert_eq!(h.drain().len(), 1);
}
