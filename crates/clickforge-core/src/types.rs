use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Logical action a hotkey can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    TriggerLeft,
    TriggerRight,
}

impl Action {
    pub const ALL: [Action; 2] = [Action::TriggerLeft, Action::TriggerRight];

    pub const fn index(self) -> usize {
        match self {
            Action::TriggerLeft => 0,
            Action::TriggerRight => 1,
        }
    }

    pub const fn other(self) -> Action {
        match self {
            Action::TriggerLeft => Action::TriggerRight,
            Action::TriggerRight => Action::TriggerLeft,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::TriggerLeft => write!(f, "TriggerLeft"),
            Action::TriggerRight => write!(f, "TriggerRight"),
        }
    }
}

/// Physical mouse button the scheduler drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClickButton {
    Left,
    Right,
}

/// How a hotkey controls its action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerMode {
    /// Press starts, next press stops.
    Toggle,
    /// Clicking runs only while the chord is physically held.
    Hold,
}

impl Default for TriggerMode {
    fn default() -> Self {
        Self::Toggle
    }
}

/// Per-action clicking parameters.
///
/// Written by the control plane, read by the scheduler as a snapshot at tick
/// boundaries only (never mid-tick).
#[derive(Debug, Clone, PartialEq)]
pub struct ClickConfig {
    /// Time between ticks. Must be > 0.
    pub interval: Duration,
    pub mode: TriggerMode,
    pub button: ClickButton,
}

impl ClickConfig {
    pub fn new(interval: Duration, mode: TriggerMode, button: ClickButton) -> Self {
        Self {
            interval,
            mode,
            button,
        }
    }
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            mode: TriggerMode::Toggle,
            button: ClickButton::Left,
        }
    }
}

/// Lifecycle of one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting for its hotkey.
    Idle,
    /// Trigger accepted, scheduler not yet emitting.
    Armed,
    /// Scheduler is emitting ticks.
    Running,
}

impl Default for RunState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "Idle"),
            RunState::Armed => write!(f, "Armed"),
            RunState::Running => write!(f, "Running"),
        }
    }
}

/// One of the four chord modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKey {
    Ctrl,
    Alt,
    Shift,
    Meta,
}

/// Set of modifiers held in a chord. Canonical order is Ctrl, Alt, Shift, Meta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const fn none() -> Self {
        Self {
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
        }
    }

    pub const fn is_empty(self) -> bool {
        !(self.ctrl || self.alt || self.shift || self.meta)
    }

    pub const fn contains(self, key: ModifierKey) -> bool {
        match key {
            ModifierKey::Ctrl => self.ctrl,
            ModifierKey::Alt => self.alt,
            ModifierKey::Shift => self.shift,
            ModifierKey::Meta => self.meta,
        }
    }

    pub fn set(&mut self, key: ModifierKey, held: bool) {
        match key {
            ModifierKey::Ctrl => self.ctrl = held,
            ModifierKey::Alt => self.alt = held,
            ModifierKey::Shift => self.shift = held,
            ModifierKey::Meta => self.meta = held,
        }
    }
}

/// Named non-printable primary keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Space,
    Enter,
    Tab,
    Backspace,
    Escape,
    CapsLock,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

impl NamedKey {
    pub const fn name(self) -> &'static str {
        match self {
            NamedKey::F1 => "F1",
            NamedKey::F2 => "F2",
            NamedKey::F3 => "F3",
            NamedKey::F4 => "F4",
            NamedKey::F5 => "F5",
            NamedKey::F6 => "F6",
            NamedKey::F7 => "F7",
            NamedKey::F8 => "F8",
            NamedKey::F9 => "F9",
            NamedKey::F10 => "F10",
            NamedKey::F11 => "F11",
            NamedKey::F12 => "F12",
            NamedKey::Space => "Space",
            NamedKey::Enter => "Enter",
            NamedKey::Tab => "Tab",
            NamedKey::Backspace => "Backspace",
            NamedKey::Escape => "Escape",
            NamedKey::CapsLock => "CapsLock",
            NamedKey::Delete => "Delete",
            NamedKey::Home => "Home",
            NamedKey::End => "End",
            NamedKey::PageUp => "PageUp",
            NamedKey::PageDown => "PageDown",
            NamedKey::ArrowUp => "ArrowUp",
            NamedKey::ArrowDown => "ArrowDown",
            NamedKey::ArrowLeft => "ArrowLeft",
            NamedKey::ArrowRight => "ArrowRight",
        }
    }

    /// Case-insensitive lookup, accepting a few common aliases.
    pub fn from_name(s: &str) -> Option<Self> {
        let key = match s.to_ascii_uppercase().as_str() {
            "F1" => NamedKey::F1,
            "F2" => NamedKey::F2,
            "F3" => NamedKey::F3,
            "F4" => NamedKey::F4,
            "F5" => NamedKey::F5,
            "F6" => NamedKey::F6,
            "F7" => NamedKey::F7,
            "F8" => NamedKey::F8,
            "F9" => NamedKey::F9,
            "F10" => NamedKey::F10,
            "F11" => NamedKey::F11,
            "F12" => NamedKey::F12,
            "SPACE" => NamedKey::Space,
            "ENTER" | "RETURN" => NamedKey::Enter,
            "TAB" => NamedKey::Tab,
            "BACKSPACE" => NamedKey::Backspace,
            "ESCAPE" | "ESC" => NamedKey::Escape,
            "CAPSLOCK" => NamedKey::CapsLock,
            "DELETE" | "DEL" => NamedKey::Delete,
            "HOME" => NamedKey::Home,
            "END" => NamedKey::End,
            "PAGEUP" => NamedKey::PageUp,
            "PAGEDOWN" => NamedKey::PageDown,
            "ARROWUP" | "UP" => NamedKey::ArrowUp,
            "ARROWDOWN" | "DOWN" => NamedKey::ArrowDown,
            "ARROWLEFT" | "LEFT" => NamedKey::ArrowLeft,
            "ARROWRIGHT" | "RIGHT" => NamedKey::ArrowRight,
            _ => return None,
        };
        Some(key)
    }
}

/// Primary (non-modifier) token of a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primary {
    /// Printable key, canonicalized to ASCII uppercase.
    Char(char),
    Named(NamedKey),
    /// Extra mouse button, index >= 4 so primary click buttons never collide
    /// with hotkeys.
    MouseButton(u8),
}

/// Normalized transition reported by the capture layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyChordDelta {
    ModifierPressed(ModifierKey),
    ModifierReleased(ModifierKey),
    KeyPressed(Primary),
    KeyReleased(Primary),
    ButtonPressed(u8),
    ButtonReleased(u8),
}

/// One raw capture event with its arrival timestamp.
#[derive(Debug, Clone, Copy)]
pub struct RawEvent {
    pub delta: KeyChordDelta,
    pub t: Instant,
}

impl RawEvent {
    pub fn now(delta: KeyChordDelta) -> Self {
        Self {
            delta,
            t: Instant::now(),
        }
    }
}

/// Verdict returned to the OS hook for an observed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookVerdict {
    /// Let the OS deliver the event normally.
    Pass,
    /// Swallow the event (it belongs to a bound chord).
    Block,
}
