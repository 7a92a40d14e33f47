//! Glue state machine: chord events in, scheduler transitions out.
//!
//! Deliberately thin. It resolves chords against the registry, drives the
//! per-action Idle/Armed/Running lifecycle, and publishes active flags; the
//! hard logic lives in the tracker and the scheduler.

use crate::dispatcher::Dispatch;
use crate::listener::{ChordEvent, ControlEvent};
use crate::registry::HotkeyRegistry;
use crate::scheduler::{spawn_worker, SchedulerHandle};
use crate::types::{Action, ClickButton, ClickConfig, RunState, TriggerMode};
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Externally-observable engine status, mirrored into the settings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    pub is_running: bool,
    pub left_active: bool,
    pub right_active: bool,
}

type StatusCallback = Box<dyn Fn(StatusSnapshot) + Send + Sync>;

struct ActionSlot {
    config: Arc<Mutex<ClickConfig>>,
    run_state: RunState,
    active: Arc<AtomicBool>,
    handle: Option<SchedulerHandle>,
}

impl ActionSlot {
    fn new(button: ClickButton) -> Self {
        Self {
            config: Arc::new(Mutex::new(ClickConfig {
                button,
                ..ClickConfig::default()
            })),
            run_state: RunState::Idle,
            active: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

pub struct StateController {
    registry: Arc<Mutex<HotkeyRegistry>>,
    dispatcher: Arc<dyn Dispatch>,
    enabled: Arc<AtomicBool>,
    slots: [ActionSlot; 2],
    on_change: Option<StatusCallback>,
}

impl StateController {
    pub fn new(
        registry: Arc<Mutex<HotkeyRegistry>>,
        dispatcher: Arc<dyn Dispatch>,
        enabled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            enabled,
            slots: [
                ActionSlot::new(ClickButton::Left),
                ActionSlot::new(ClickButton::Right),
            ],
            on_change: None,
        }
    }

    /// The callback runs on the control thread with the controller locked;
    /// it must not call back into the engine.
    pub fn set_on_status_change(&mut self, cb: impl Fn(StatusSnapshot) + Send + Sync + 'static) {
        self.on_change = Some(Box::new(cb));
    }

    /// Drain the control channel until every sender is gone.
    pub fn run(controller: &Mutex<StateController>, rx: Receiver<ControlEvent>) {
        info!("state controller started");
        while let Ok(event) = rx.recv() {
            controller.lock().handle_control(event);
        }
        info!("state controller stopped");
    }

    pub fn handle_control(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Chord(ev) => self.handle_event(ev),
            ControlEvent::StopAll => {
                warn!("emergency stop, forcing all actions idle");
                self.stop_all();
            }
        }
    }

    /// Apply one chord transition.
    pub fn handle_event(&mut self, event: ChordEvent) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }

        let action = match self.registry.lock().resolve(event.chord()) {
            Some(a) => a,
            None => return,
        };

        let mode = { self.slots[action.index()].config.lock().mode };
        let state = self.slots[action.index()].run_state;

        match (event, mode) {
            (ChordEvent::Pressed(_), TriggerMode::Toggle) => match state {
                RunState::Idle => self.start_action(action),
                // Next press while running stops it; a later press restarts.
                RunState::Armed | RunState::Running => self.stop_action(action),
            },
            (ChordEvent::Pressed(_), TriggerMode::Hold) => {
                if state == RunState::Idle {
                    self.start_action(action);
                }
            }
            (ChordEvent::Released(_), TriggerMode::Hold) => {
                if state != RunState::Idle {
                    self.stop_action(action);
                }
            }
            // Toggle mode ignores releases.
            (ChordEvent::Released(_), TriggerMode::Toggle) => {}
        }
    }

    fn start_action(&mut self, action: Action) {
        let button = { self.slots[action.index()].config.lock().button };

        // Concurrency policy: actions on different physical buttons run
        // independently; the same button is never driven by two schedulers.
        let other = action.other();
        if self.slots[other.index()].run_state == RunState::Running {
            let other_button = { self.slots[other.index()].config.lock().button };
            if other_button == button {
                debug!(%other, %action, "same target button, stopping prior action");
                self.stop_action(other);
            }
        }

        let slot = &mut self.slots[action.index()];
        slot.run_state = RunState::Armed;
        let handle = spawn_worker(
            action,
            Arc::clone(&slot.config),
            Arc::clone(&self.dispatcher),
        );
        slot.handle = Some(handle);
        slot.run_state = RunState::Running;
        slot.active.store(true, Ordering::Release);
        info!(%action, "action running");
        self.publish();
    }

    fn stop_action(&mut self, action: Action) {
        let slot = &mut self.slots[action.index()];
        if let Some(handle) = slot.handle.take() {
            handle.stop();
        }
        // RunState always reaches Idle and is published, even on an abnormal
        // stop path.
        slot.run_state = RunState::Idle;
        slot.active.store(false, Ordering::Release);
        info!(%action, "action idle");
        self.publish();
    }

    pub fn stop_all(&mut self) {
        for action in Action::ALL {
            if self.slots[action.index()].run_state != RunState::Idle {
                self.stop_action(action);
            }
        }
    }

    pub fn run_state(&self, action: Action) -> RunState {
        self.slots[action.index()].run_state
    }

    /// Atomic flag readable without the control-plane lock.
    pub fn active_flag(&self, action: Action) -> Arc<AtomicBool> {
        Arc::clone(&self.slots[action.index()].active)
    }

    pub fn set_interval(&self, interval: Duration) {
        for slot in &self.slots {
            slot.config.lock().interval = interval;
        }
    }

    pub fn set_mode(&self, mode: TriggerMode) {
        for slot in &self.slots {
            slot.config.lock().mode = mode;
        }
    }

    pub fn set_button(&self, action: Action, button: ClickButton) {
        self.slots[action.index()].config.lock().button = button;
    }

    pub fn config(&self, action: Action) -> ClickConfig {
        self.slots[action.index()].config.lock().clone()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let left = self.slots[Action::TriggerLeft.index()].run_state == RunState::Running;
        let right = self.slots[Action::TriggerRight.index()].run_state == RunState::Running;
        StatusSnapshot {
            is_running: left || right,
            left_active: left,
            right_active: right,
        }
    }

    fn publish(&self) {
        if let Some(ref cb) = self.on_change {
            cb(self.snapshot());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::KeyChord;
    use crate::dispatcher::RecordingDispatcher;

    fn setup() -> (StateController, Arc<RecordingDispatcher>) {
        let registry = Arc::new(Mutex::new(HotkeyRegistry::new()));
        {
            let mut reg = registry.lock();
            reg.bind(Action::TriggerLeft, chord("F5")).unwrap();
            reg.bind(Action::TriggerRight, chord("F6")).unwrap();
        }
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let controller = StateController::new(
            registry,
            dispatcher.clone() as Arc<dyn Dispatch>,
            Arc::new(AtomicBool::new(true)),
        );
        (controller, dispatcher)
    }

    fn chord(s: &str) -> KeyChord {
        s.parse().unwrap()
    }

    fn press(c: &str) -> ChordEvent {
        ChordEvent::Pressed(chord(c))
    }

    fn release(c: &str) -> ChordEvent {
        ChordEvent::Released(chord(c))
    }

    #[test]
    fn toggle_press_press_press_cycles_running() {
        let (mut ctl, _d) = setup();
        assert_eq!(ctl.run_state(Action::TriggerLeft), RunState::Idle);

        ctl.handle_event(press("F5"));
        assert_eq!(ctl.run_state(Action::TriggerLeft), RunState::Running);

        ctl.handle_event(release("F5")); // ignored in toggle mode
        assert_eq!(ctl.run_state(Action::TriggerLeft), RunState::Running);

        ctl.handle_event(press("F5"));
        assert_eq!(ctl.run_state(Action::TriggerLeft), RunState::Idle);

        ctl.handle_event(press("F5"));
        assert_eq!(ctl.run_state(Action::TriggerLeft), RunState::Running);
        ctl.stop_all();
    }

    #[test]
    fn hold_runs_only_while_held() {
        let (mut ctl, dispatcher) = setup();
        ctl.set_mode(TriggerMode::Hold);
        ctl.set_interval(Duration::from_millis(10));

        ctl.handle_event(press("F5"));
        assert_eq!(ctl.run_state(Action::TriggerLeft), RunState::Running);
        std::thread::sleep(Duration::from_millis(60));

        ctl.handle_event(release("F5"));
        assert_eq!(ctl.run_state(Action::TriggerLeft), RunState::Idle);

        let settled = dispatcher.click_count();
        assert!(settled >= 2, "held for ~6 intervals, got {} clicks", settled);
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(dispatcher.click_count(), settled, "ticks after release");
    }

    #[test]
    fn unbound_chords_are_ignored() {
        let (mut ctl, _d) = setup();
        ctl.handle_event(press("F9"));
        assert_eq!(ctl.run_state(Action::TriggerLeft), RunState::Idle);
        assert_eq!(ctl.run_state(Action::TriggerRight), RunState::Idle);
    }

    #[test]
    fn different_buttons_run_concurrently() {
        let (mut ctl, _d) = setup();
        ctl.handle_event(press("F5"));
        ctl.handle_event(press("F6"));
        assert_eq!(ctl.run_state(Action::TriggerLeft), RunState::Running);
        assert_eq!(ctl.run_state(Action::TriggerRight), RunState::Running);
        assert_eq!(
            ctl.snapshot(),
            StatusSnapshot {
                is_running: true,
                left_active: true,
                right_active: true,
            }
        );
        ctl.stop_all();
    }

    #[test]
    fn same_button_forces_prior_action_idle() {
        let (mut ctl, _d) = setup();
        // Both actions aimed at the same physical button.
        ctl.set_button(Action::TriggerRight, ClickButton::Left);

        ctl.handle_event(press("F5"));
        assert_eq!(ctl.run_state(Action::TriggerLeft), RunState::Running);

        ctl.handle_event(press("F6"));
        assert_eq!(ctl.run_state(Action::TriggerLeft), RunState::Idle);
        assert_eq!(ctl.run_state(Action::TriggerRight), RunState::Running);
        ctl.stop_all();
    }

    #[test]
    fn disabled_controller_ignores_hotkeys() {
        let registry = Arc::new(Mutex::new(HotkeyRegistry::new()));
        registry
            .lock()
            .bind(Action::TriggerLeft, chord("F5"))
            .unwrap();
        let mut ctl = StateController::new(
            registry,
            Arc::new(RecordingDispatcher::default()),
            Arc::new(AtomicBool::new(false)),
        );
        ctl.handle_event(press("F5"));
        assert_eq!(ctl.run_state(Action::TriggerLeft), RunState::Idle);
    }

    #[test]
    fn status_callback_sees_every_transition() {
        let (mut ctl, _d) = setup();
        let seen: Arc<Mutex<Vec<StatusSnapshot>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        ctl.set_on_status_change(move |s| sink.lock().push(s));

        ctl.handle_event(press("F5"));
        ctl.handle_event(press("F5"));

        let log = seen.lock().clone();
        assert_eq!(log.len(), 2);
        assert!(log[0].is_running && log[0].left_active);
        assert!(!log[1].is_running && !log[1].left_active);
    }

    #[test]
    fn emergency_stop_forces_idle() {
        let (mut ctl, _d) = setup();
        ctl.handle_event(press("F5"));
        ctl.handle_event(press("F6"));
        ctl.handle_control(ControlEvent::StopAll);
        assert_eq!(ctl.run_state(Action::TriggerLeft), RunState::Idle);
        assert_eq!(ctl.run_state(Action::TriggerRight), RunState::Idle);
    }
}
