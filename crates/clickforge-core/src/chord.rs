//! Canonical chord strings: modifiers joined by `+` in fixed order
//! Ctrl, Alt, Shift, Meta, then exactly one primary token, e.g.
//! `Ctrl+Shift+F5` or `MouseButton4`.

use crate::types::{ModifierKey, Modifiers, NamedKey, Primary};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest mouse button index usable as a hotkey. 1..=3 are the primary
/// click buttons the dispatcher drives, so they can never double as triggers.
pub const MOUSE_BUTTON_MIN: u8 = 4;
/// Largest supported extra mouse button index.
pub const MOUSE_BUTTON_MAX: u8 = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChordParseError {
    #[error("empty chord string")]
    Empty,
    #[error("chord \"{0}\" has no primary key")]
    MissingPrimary(String),
    #[error("chord has more than one primary key: \"{0}\" and \"{1}\"")]
    DuplicatePrimary(String, String),
    #[error("unknown key token \"{0}\"")]
    UnknownToken(String),
    #[error("mouse button {0} is a primary click button, hotkeys start at MouseButton{MOUSE_BUTTON_MIN}")]
    ReservedMouseButton(u8),
    #[error("mouse button index {0} out of range ({MOUSE_BUTTON_MIN}..={MOUSE_BUTTON_MAX})")]
    MouseButtonOutOfRange(u32),
}

/// A normalized modifier set plus one primary token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyChord {
    pub mods: Modifiers,
    pub primary: Primary,
}

impl KeyChord {
    pub fn new(mods: Modifiers, primary: Primary) -> Self {
        Self { mods, primary }
    }

    /// Chord with no modifiers.
    pub fn bare(primary: Primary) -> Self {
        Self {
            mods: Modifiers::none(),
            primary,
        }
    }

    pub fn requires(&self, key: ModifierKey) -> bool {
        self.mods.contains(key)
    }
}

fn write_primary(f: &mut fmt::Formatter<'_>, primary: Primary) -> fmt::Result {
    match primary {
        Primary::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
        Primary::Named(k) => write!(f, "{}", k.name()),
        Primary::MouseButton(n) => write!(f, "MouseButton{}", n),
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.mods.alt {
            write!(f, "Alt+")?;
        }
        if self.mods.shift {
            write!(f, "Shift+")?;
        }
        if self.mods.meta {
            write!(f, "Meta+")?;
        }
        write_primary(f, self.primary)
    }
}

fn parse_modifier(token: &str) -> Option<ModifierKey> {
    match token.to_ascii_uppercase().as_str() {
        "CTRL" | "CONTROL" => Some(ModifierKey::Ctrl),
        "ALT" => Some(ModifierKey::Alt),
        "SHIFT" => Some(ModifierKey::Shift),
        "META" | "WIN" | "SUPER" | "CMD" => Some(ModifierKey::Meta),
        _ => None,
    }
}

fn parse_primary(token: &str) -> Result<Primary, ChordParseError> {
    // MouseButton<N>
    if let Some(rest) = token
        .strip_prefix("MouseButton")
        .or_else(|| token.strip_prefix("mousebutton"))
        .or_else(|| token.strip_prefix("MOUSEBUTTON"))
    {
        let n: u32 = rest
            .parse()
            .map_err(|_| ChordParseError::UnknownToken(token.to_string()))?;
        if n < MOUSE_BUTTON_MIN as u32 {
            return Err(ChordParseError::ReservedMouseButton(n as u8));
        }
        if n > MOUSE_BUTTON_MAX as u32 {
            return Err(ChordParseError::MouseButtonOutOfRange(n));
        }
        return Ok(Primary::MouseButton(n as u8));
    }

    if let Some(named) = NamedKey::from_name(token) {
        return Ok(Primary::Named(named));
    }

    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if !c.is_control() && !c.is_whitespace() {
            return Ok(Primary::Char(c.to_ascii_uppercase()));
        }
    }

    Err(ChordParseError::UnknownToken(token.to_string()))
}

impl FromStr for KeyChord {
    type Err = ChordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ChordParseError::Empty);
        }

        let mut mods = Modifiers::none();
        let mut primary: Option<(Primary, String)> = None;

        for token in s.split('+').map(str::trim) {
            if token.is_empty() {
                return Err(ChordParseError::UnknownToken(String::new()));
            }
            if let Some(m) = parse_modifier(token) {
                mods.set(m, true);
                continue;
            }
            let p = parse_primary(token)?;
            if let Some((_, ref first)) = primary {
                return Err(ChordParseError::DuplicatePrimary(
                    first.clone(),
                    token.to_string(),
                ));
            }
            primary = Some((p, token.to_string()));
        }

        match primary {
            Some((p, _)) => Ok(KeyChord::new(mods, p)),
            None => Err(ChordParseError::MissingPrimary(s.to_string())),
        }
    }
}
