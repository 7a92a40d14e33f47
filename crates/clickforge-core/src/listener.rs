//! System-wide input capture, normalized into chord press/release events.
//!
//! The platform hook (see `hook`) runs on a dedicated capture thread and
//! feeds raw deltas into [`ListenerCore::process`], which tracks the held
//! modifier set, completes chords, and posts events to the control plane
//! over a bounded channel. The hot path takes only the two short mutexes on
//! the tracker and the registry, never the control-plane lock.

use crate::chord::KeyChord;
use crate::registry::HotkeyRegistry;
use crate::types::{HookVerdict, KeyChordDelta, Modifiers, Primary, RawEvent};
use crossbeam_channel::{Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("global hook registration failed: {0}")]
    HookInstall(String),
    #[error("failed to spawn capture thread: {0}")]
    ThreadSpawn(String),
    #[error("capture thread exited before initialization completed")]
    InitLost,
    #[error("listener is already running")]
    AlreadyRunning,
    #[error("global capture is not supported on this platform")]
    Unsupported,
}

/// Completed chord transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordEvent {
    Pressed(KeyChord),
    Released(KeyChord),
}

impl ChordEvent {
    pub fn chord(&self) -> &KeyChord {
        match self {
            ChordEvent::Pressed(c) | ChordEvent::Released(c) => c,
        }
    }
}

/// Message posted from the capture thread to the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Chord(ChordEvent),
    /// Emergency stop: force every action to Idle.
    StopAll,
}

/// Tracks held modifiers and in-flight primaries, independent of the order
/// the OS reports releases in.
#[derive(Debug, Default)]
pub struct ChordTracker {
    held: Modifiers,
    /// Primaries currently down, keyed to the chord they completed at press
    /// time. Keeps OS auto-repeat from re-firing a press.
    active: HashMap<Primary, KeyChord>,
}

impl ChordTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held_modifiers(&self) -> Modifiers {
        self.held
    }

    /// Feed one delta; returns the chord transitions it completes.
    pub fn on_delta(&mut self, delta: KeyChordDelta) -> Vec<ChordEvent> {
        match delta {
            KeyChordDelta::ModifierPressed(m) => {
                self.held.set(m, true);
                Vec::new()
            }
            KeyChordDelta::ModifierReleased(m) => {
                self.held.set(m, false);
                // A chord ends as soon as any modifier it requires goes up,
                // regardless of release order.
                let broken: Vec<Primary> = self
                    .active
                    .iter()
                    .filter(|(_, chord)| chord.requires(m))
                    .map(|(p, _)| *p)
                    .collect();
                broken
                    .into_iter()
                    .filter_map(|p| self.active.remove(&p))
                    .map(ChordEvent::Released)
                    .collect()
            }
            KeyChordDelta::KeyPressed(p) => self.press(p),
            KeyChordDelta::KeyReleased(p) => self.release(p),
            KeyChordDelta::ButtonPressed(n) => match Self::button_primary(n) {
                Some(p) => self.press(p),
                None => Vec::new(),
            },
            KeyChordDelta::ButtonReleased(n) => match Self::button_primary(n) {
                Some(p) => self.release(p),
                None => Vec::new(),
            },
        }
    }

    fn button_primary(n: u8) -> Option<Primary> {
        // Primary click buttons are dispatch targets, never triggers.
        if n >= crate::chord::MOUSE_BUTTON_MIN {
            Some(Primary::MouseButton(n))
        } else {
            None
        }
    }

    fn press(&mut self, primary: Primary) -> Vec<ChordEvent> {
        if self.active.contains_key(&primary) {
            // OS auto-repeat while held.
            return Vec::new();
        }
        let chord = KeyChord::new(self.held, primary);
        self.active.insert(primary, chord);
        vec![ChordEvent::Pressed(chord)]
    }

    fn release(&mut self, primary: Primary) -> Vec<ChordEvent> {
        match self.active.remove(&primary) {
            Some(chord) => vec![ChordEvent::Released(chord)],
            // Already released by a modifier break, or never seen.
            None => Vec::new(),
        }
    }
}

/// Shared state between the capture thread and the rest of the engine.
pub struct ListenerCore {
    tracker: Mutex<ChordTracker>,
    registry: Arc<Mutex<HotkeyRegistry>>,
    enabled: Arc<AtomicBool>,
    tx: Sender<ControlEvent>,
}

impl ListenerCore {
    pub fn new(
        registry: Arc<Mutex<HotkeyRegistry>>,
        enabled: Arc<AtomicBool>,
        tx: Sender<ControlEvent>,
    ) -> Self {
        Self {
            tracker: Mutex::new(ChordTracker::new()),
            registry,
            enabled,
            tx,
        }
    }

    /// Feed one raw event; returns the verdict for the OS hook.
    ///
    /// Bound chord presses and releases are blocked so the trigger keystroke
    /// does not leak into the focused application; modifier traffic and
    /// unbound input always pass.
    pub fn process(&self, ev: RawEvent) -> HookVerdict {
        let events = self.tracker.lock().on_delta(ev.delta);
        if events.is_empty() {
            return HookVerdict::Pass;
        }

        let enabled = self.enabled.load(Ordering::Acquire);
        let mut verdict = HookVerdict::Pass;
        for event in events {
            let bound = self.registry.lock().resolve(event.chord()).is_some();
            if bound && enabled && Self::is_primary_delta(ev.delta) {
                verdict = HookVerdict::Block;
            }
            if bound {
                debug!(chord = %event.chord(), ?event, "bound chord transition");
            }
            self.post(ControlEvent::Chord(event));
        }
        verdict
    }

    /// Force every running action to stop (emergency stop path).
    pub fn stop_all(&self) {
        self.post(ControlEvent::StopAll);
    }

    fn is_primary_delta(delta: KeyChordDelta) -> bool {
        matches!(
            delta,
            KeyChordDelta::KeyPressed(_)
                | KeyChordDelta::KeyReleased(_)
                | KeyChordDelta::ButtonPressed(_)
                | KeyChordDelta::ButtonReleased(_)
        )
    }

    fn post(&self, event: ControlEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(ev)) => {
                // Never block the capture thread; drop and report.
                warn!(?ev, "control channel full, dropping event");
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("control channel disconnected");
            }
        }
    }
}

/// Owns the OS capture thread lifecycle.
pub struct InputListener {
    core: Arc<ListenerCore>,
    running: Arc<AtomicBool>,
    #[cfg(windows)]
    capture_thread_id: Mutex<Option<u32>>,
}

impl InputListener {
    pub fn new(core: Arc<ListenerCore>) -> Self {
        Self {
            core,
            running: Arc::new(AtomicBool::new(false)),
            #[cfg(windows)]
            capture_thread_id: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Install the global hooks on a dedicated capture thread.
    ///
    /// On failure the engine keeps working in local-only mode: raw events can
    /// still be fed programmatically through the engine.
    #[cfg(windows)]
    pub fn start(&self) -> Result<(), ListenerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ListenerError::AlreadyRunning);
        }

        let core = Arc::clone(&self.core);
        let running = Arc::clone(&self.running);
        let (init_tx, init_rx) = crossbeam_channel::bounded(1);

        let spawned = std::thread::Builder::new()
            .name("clickforge-capture".to_string())
            .spawn(move || {
                crate::hook::run_capture(core, init_tx);
                running.store(false, Ordering::SeqCst);
            });

        if let Err(e) = spawned {
            self.running.store(false, Ordering::SeqCst);
            return Err(ListenerError::ThreadSpawn(e.to_string()));
        }

        match init_rx.recv() {
            Ok(Ok(thread_id)) => {
                *self.capture_thread_id.lock() = Some(thread_id);
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                Err(ListenerError::InitLost)
            }
        }
    }

    #[cfg(not(windows))]
    pub fn start(&self) -> Result<(), ListenerError> {
        warn!("global capture unavailable on this platform, staying in local-only mode");
        Err(ListenerError::Unsupported)
    }

    /// Stop the capture thread. Safe to call when not running.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        #[cfg(windows)]
        if let Some(thread_id) = self.capture_thread_id.lock().take() {
            crate::hook::request_quit(thread_id);
        }
    }
}
