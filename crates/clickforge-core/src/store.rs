//! Persisted key-value settings shared with the UI layer.
//!
//! The UI writes `clickSpeed`, `holdMode`, `hotkeyLeft`, `hotkeyRight`; the
//! engine publishes `isRunning`, `hotkeyLeftActive`, `hotkeyRightActive`.
//! One flat camelCase JSON document; malformed values are rejected before
//! they reach the engine, never silently bound.

use crate::chord::ChordParseError;
use crate::chord::KeyChord;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Store field names, as the UI layer sees them.
pub mod keys {
    pub const CLICK_SPEED: &str = "clickSpeed";
    pub const HOLD_MODE: &str = "holdMode";
    pub const HOTKEY_LEFT: &str = "hotkeyLeft";
    pub const HOTKEY_RIGHT: &str = "hotkeyRight";
    pub const IS_RUNNING: &str = "isRunning";
    pub const HOTKEY_LEFT_ACTIVE: &str = "hotkeyLeftActive";
    pub const HOTKEY_RIGHT_ACTIVE: &str = "hotkeyRightActive";
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("clickSpeed must be a positive number of milliseconds, got {0}")]
    InvalidSpeed(f64),
    #[error("{field}: {source}")]
    InvalidChord {
        field: &'static str,
        source: ChordParseError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Milliseconds between clicks.
    pub click_speed: f64,
    pub hold_mode: bool,
    /// Canonical chord string; empty means unbound.
    pub hotkey_left: String,
    pub hotkey_right: String,
    // Published by the engine, read-only for the UI.
    pub is_running: bool,
    pub hotkey_left_active: bool,
    pub hotkey_right_active: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            click_speed: 100.0,
            hold_mode: false,
            hotkey_left: "F5".to_string(),
            hotkey_right: "F6".to_string(),
            is_running: false,
            hotkey_left_active: false,
            hotkey_right_active: false,
        }
    }
}

impl Settings {
    /// Reject malformed input before any of it is applied.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.click_speed.is_finite() || self.click_speed <= 0.0 {
            return Err(SettingsError::InvalidSpeed(self.click_speed));
        }
        Self::check_chord(&self.hotkey_left, keys::HOTKEY_LEFT)?;
        Self::check_chord(&self.hotkey_right, keys::HOTKEY_RIGHT)?;
        Ok(())
    }

    fn check_chord(raw: &str, field: &'static str) -> Result<(), SettingsError> {
        if raw.is_empty() {
            return Ok(());
        }
        raw.parse::<KeyChord>()
            .map(|_| ())
            .map_err(|source| SettingsError::InvalidChord { field, source })
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_micros((self.click_speed * 1000.0) as u64)
    }
}

/// Load settings, falling back to defaults on a missing or corrupt file.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Settings {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(?path, error = %e, "settings file corrupt, using defaults");
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

pub fn save_settings<P: AsRef<Path>>(path: P, settings: &Settings) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}
