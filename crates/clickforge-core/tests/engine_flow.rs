//! End-to-end flows through the public engine API, driven by synthetic raw
//! events exactly as the platform hook would deliver them.

use clickforge_core::dispatcher::{Dispatch, RecordingDispatcher};
use clickforge_core::types::{KeyChordDelta, ModifierKey, NamedKey, Primary, RawEvent};
use clickforge_core::{Action, ClickButton, Engine, Settings};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn key_down(named: NamedKey) -> RawEvent {
    RawEvent::now(KeyChordDelta::KeyPressed(Primary::Named(named)))
}

fn key_up(named: NamedKey) -> RawEvent {
    RawEvent::now(KeyChordDelta::KeyReleased(Primary::Named(named)))
}

fn wait_for<F: Fn() -> bool>(cond: F, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn engine_with_recorder() -> (Engine, Arc<RecordingDispatcher>) {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let engine = Engine::new(dispatcher.clone() as Arc<dyn Dispatch>);
    (engine, dispatcher)
}

#[test]
fn hold_mode_clicks_only_while_chord_is_held() {
    let (engine, dispatcher) = engine_with_recorder();

    let mut settings = Settings::default();
    settings.hold_mode = true;
    settings.click_speed = 10.0;
    settings.hotkey_left = "Ctrl+F5".to_string();
    settings.hotkey_right = String::new();
    engine.apply_settings(&settings).unwrap();

    engine.process_raw(RawEvent::now(KeyChordDelta::ModifierPressed(
        ModifierKey::Ctrl,
    )));
    engine.process_raw(key_down(NamedKey::F5));
    wait_for(|| engine.status().left_active, "hold start");

    std::thread::sleep(Duration::from_millis(120));

    // Releasing the modifier first still ends the chord.
    engine.process_raw(RawEvent::now(KeyChordDelta::ModifierReleased(
        ModifierKey::Ctrl,
    )));
    wait_for(|| !engine.status().left_active, "hold stop");

    let clicks = dispatcher.clicks_for(ClickButton::Left);
    assert!(clicks >= 4, "held ~120ms at 10ms/tick, got {} clicks", clicks);

    // New ticks must halt within one interval of the release.
    std::thread::sleep(Duration::from_millis(40));
    let settled = dispatcher.clicks_for(ClickButton::Left);
    assert!(
        settled <= clicks + 1,
        "ticks kept firing after release: {} -> {}",
        clicks,
        settled
    );

    engine.process_raw(key_up(NamedKey::F5)); // stale release, already idle
    assert!(!engine.status().left_active);
}

#[test]
fn left_and_right_actions_click_their_own_buttons_concurrently() {
    let (engine, dispatcher) = engine_with_recorder();
    engine.set_interval(Duration::from_millis(10));
    engine.bind(Action::TriggerLeft, "F5").unwrap();
    engine.bind(Action::TriggerRight, "F6").unwrap();

    engine.process_raw(key_down(NamedKey::F5));
    engine.process_raw(key_down(NamedKey::F6));
    wait_for(
        || engine.status().left_active && engine.status().right_active,
        "both actions running",
    );

    std::thread::sleep(Duration::from_millis(80));

    engine.process_raw(key_up(NamedKey::F5));
    engine.process_raw(key_down(NamedKey::F5));
    engine.process_raw(key_up(NamedKey::F6));
    engine.process_raw(key_down(NamedKey::F6));
    wait_for(
        || !engine.status().is_running,
        "both actions stopped by second toggle press",
    );

    assert!(dispatcher.clicks_for(ClickButton::Left) >= 3);
    assert!(dispatcher.clicks_for(ClickButton::Right) >= 3);
}

#[test]
fn mouse_button_hotkey_toggles_clicking() {
    let (engine, dispatcher) = engine_with_recorder();
    engine.set_interval(Duration::from_millis(10));
    engine.bind(Action::TriggerLeft, "MouseButton4").unwrap();

    engine.process_raw(RawEvent::now(KeyChordDelta::ButtonPressed(4)));
    wait_for(|| engine.status().left_active, "toggle on via MouseButton4");
    engine.process_raw(RawEvent::now(KeyChordDelta::ButtonReleased(4)));

    std::thread::sleep(Duration::from_millis(50));

    engine.process_raw(RawEvent::now(KeyChordDelta::ButtonPressed(4)));
    wait_for(|| !engine.status().left_active, "toggle off via MouseButton4");

    assert!(dispatcher.clicks_for(ClickButton::Left) >= 2);
}

#[test]
fn tick_count_tracks_the_configured_rate() {
    let (engine, dispatcher) = engine_with_recorder();
    let interval = Duration::from_millis(20);
    engine.set_interval(interval);
    engine.bind(Action::TriggerLeft, "F8").unwrap();

    engine.process_raw(key_down(NamedKey::F8));
    wait_for(|| engine.status().left_active, "run start");
    let started = Instant::now();

    std::thread::sleep(Duration::from_millis(410));

    engine.process_raw(key_up(NamedKey::F8));
    engine.process_raw(key_down(NamedKey::F8));
    wait_for(|| !engine.status().left_active, "run stop");
    let elapsed = started.elapsed();

    let count = dispatcher.clicks_for(ClickButton::Left) as u64;
    let nominal = clickforge_core::scheduler::expected_ticks(elapsed, interval);
    // No drift and no burst catch-up; slack covers scheduler-jitter skips on
    // a loaded machine.
    assert!(
        count <= nominal + 1 && count + 4 >= nominal,
        "elapsed {:?}: got {} ticks, nominal {}",
        elapsed,
        count,
        nominal
    );
}

#[test]
fn settings_roundtrip_drives_the_engine() {
    let (engine, _dispatcher) = engine_with_recorder();

    let mut settings = Settings::default();
    settings.click_speed = 25.0;
    settings.hotkey_left = "Ctrl+Shift+A".to_string();
    settings.hotkey_right = "MouseButton5".to_string();
    engine.apply_settings(&settings).unwrap();

    assert_eq!(
        engine.chord_for(Action::TriggerLeft),
        Some("Ctrl+Shift+A".to_string())
    );
    assert_eq!(
        engine.chord_for(Action::TriggerRight),
        Some("MouseButton5".to_string())
    );

    // Canonical forms survive a store round-trip.
    let json = serde_json::to_string(&settings).unwrap();
    let restored: Settings = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, settings);
    engine.apply_settings(&restored).unwrap();
}
