//! Engine facade: one instance per process, constructed explicitly and
//! handed to collaborators. No global singleton.

use crate::chord::{ChordParseError, KeyChord};
use crate::controller::{StateController, StatusSnapshot};
use crate::dispatcher::Dispatch;
use crate::listener::{InputListener, ListenerCore, ListenerError};
use crate::registry::{BindError, HotkeyRegistry};
use crate::store::Settings;
use crate::types::{Action, HookVerdict, RawEvent, RunState, TriggerMode};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Failure to bind an action from a chord string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindRequestError {
    #[error(transparent)]
    Parse(#[from] ChordParseError),
    #[error(transparent)]
    Conflict(#[from] BindError),
}

/// Control-plane channel depth. Chord transitions are rare compared to raw
/// input, so a small bound is plenty; overflow drops with a warning rather
/// than stalling the capture thread.
const CONTROL_CHANNEL_DEPTH: usize = 64;

pub struct Engine {
    registry: Arc<Mutex<HotkeyRegistry>>,
    controller: Arc<Mutex<StateController>>,
    core: Arc<ListenerCore>,
    listener: InputListener,
    enabled: Arc<AtomicBool>,
}

impl Engine {
    pub fn new(dispatcher: Arc<dyn Dispatch>) -> Self {
        let registry = Arc::new(Mutex::new(HotkeyRegistry::new()));
        let enabled = Arc::new(AtomicBool::new(true));

        let controller = Arc::new(Mutex::new(StateController::new(
            Arc::clone(&registry),
            dispatcher,
            Arc::clone(&enabled),
        )));

        let (tx, rx) = crossbeam_channel::bounded(CONTROL_CHANNEL_DEPTH);
        let core = Arc::new(ListenerCore::new(
            Arc::clone(&registry),
            Arc::clone(&enabled),
            tx,
        ));
        let listener = InputListener::new(Arc::clone(&core));

        // Control-plane thread; exits once the engine (the only sender owner)
        // is dropped.
        let loop_controller = Arc::clone(&controller);
        let _ = std::thread::Builder::new()
            .name("clickforge-control".to_string())
            .spawn(move || StateController::run(&loop_controller, rx));

        Self {
            registry,
            controller,
            core,
            listener,
            enabled,
        }
    }

    /// Engine with the platform input backend.
    pub fn with_platform_dispatcher() -> Self {
        #[cfg(windows)]
        let dispatcher: Arc<dyn Dispatch> = Arc::new(crate::dispatcher::SendInputDispatcher);
        #[cfg(not(windows))]
        let dispatcher: Arc<dyn Dispatch> = Arc::new(crate::dispatcher::NullDispatcher);
        Self::new(dispatcher)
    }

    // ---- bindings -------------------------------------------------------

    pub fn bind(&self, action: Action, chord: &str) -> Result<(), BindRequestError> {
        let chord: KeyChord = chord.parse()?;
        self.registry.lock().bind(action, chord)?;
        Ok(())
    }

    /// Bind, displacing any prior owner of the chord.
    pub fn bind_override(&self, action: Action, chord: &str) -> Result<Option<Action>, ChordParseError> {
        let chord: KeyChord = chord.parse()?;
        Ok(self.registry.lock().bind_override(action, chord))
    }

    pub fn unbind(&self, action: Action) -> Option<KeyChord> {
        self.registry.lock().unbind(action)
    }

    pub fn chord_for(&self, action: Action) -> Option<String> {
        self.registry.lock().chord_for(action).map(|c| c.to_string())
    }

    // ---- configuration --------------------------------------------------

    pub fn set_interval(&self, interval: Duration) {
        self.controller.lock().set_interval(interval);
    }

    pub fn set_mode(&self, mode: TriggerMode) {
        self.controller.lock().set_mode(mode);
    }

    /// Validate and apply a whole settings document. Nothing changes if any
    /// field is rejected; the previous bindings are retained.
    pub fn apply_settings(&self, settings: &Settings) -> Result<(), crate::store::SettingsError> {
        settings.validate()?;

        self.set_interval(settings.interval());
        self.set_mode(if settings.hold_mode {
            TriggerMode::Hold
        } else {
            TriggerMode::Toggle
        });

        // Validation already parsed these; empty means unbound.
        for (raw, action) in [
            (&settings.hotkey_left, Action::TriggerLeft),
            (&settings.hotkey_right, Action::TriggerRight),
        ] {
            if raw.is_empty() {
                self.registry.lock().unbind(action);
            } else if let Ok(chord) = raw.parse::<KeyChord>() {
                self.registry.lock().bind_override(action, chord);
            }
        }

        info!(
            speed_ms = settings.click_speed,
            hold = settings.hold_mode,
            "settings applied"
        );
        Ok(())
    }

    /// Copy the published status fields into a settings document for the UI.
    pub fn export_status(&self, settings: &mut Settings) {
        let status = self.status();
        settings.is_running = status.is_running;
        settings.hotkey_left_active = status.left_active;
        settings.hotkey_right_active = status.right_active;
    }

    // ---- lifecycle ------------------------------------------------------

    /// Master switch. Disabling forces every action to Idle and makes the
    /// listener stop swallowing bound chords.
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::AcqRel);
        if was != enabled {
            info!(enabled, "engine enabled state changed");
            if !enabled {
                self.controller.lock().stop_all();
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Start system-wide capture. On failure the engine keeps running in
    /// local-only mode and the error is reported to the caller.
    pub fn start_listening(&self) -> Result<(), ListenerError> {
        self.listener.start()
    }

    pub fn stop_listening(&self) {
        self.listener.stop();
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_running()
    }

    /// Feed one raw input event, exactly as the platform hook would. This is
    /// the local-only path used by tests and embedders without OS capture.
    pub fn process_raw(&self, ev: RawEvent) -> HookVerdict {
        self.core.process(ev)
    }

    pub fn set_on_status_change(&self, cb: impl Fn(StatusSnapshot) + Send + Sync + 'static) {
        self.controller.lock().set_on_status_change(cb);
    }

    pub fn status(&self) -> StatusSnapshot {
        self.controller.lock().snapshot()
    }

    pub fn run_state(&self, action: Action) -> RunState {
        self.controller.lock().run_state(action)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.listener.stop();
        self.controller.lock().stop_all();
    }
}
