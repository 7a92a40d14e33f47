//! Action/chord bindings. Both directions are kept in lockstep so the
//! "one chord owns at most one action" invariant holds after every mutation.

use crate::chord::KeyChord;
use crate::types::Action;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("chord is already bound to {existing}")]
    Conflict { existing: Action },
}

#[derive(Debug, Default)]
pub struct HotkeyRegistry {
    by_chord: HashMap<KeyChord, Action>,
    by_action: HashMap<Action, KeyChord>,
}

impl HotkeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `chord` to `action`. Fails if another action already owns the
    /// chord. Rebinding the same action to a new chord releases its old one.
    pub fn bind(&mut self, action: Action, chord: KeyChord) -> Result<(), BindError> {
        if let Some(&owner) = self.by_chord.get(&chord) {
            if owner != action {
                return Err(BindError::Conflict { existing: owner });
            }
            return Ok(());
        }

        if let Some(old) = self.by_action.insert(action, chord) {
            self.by_chord.remove(&old);
        }
        self.by_chord.insert(chord, action);
        debug!(%action, chord = %chord, "bound hotkey");
        Ok(())
    }

    /// Bind unconditionally, unbinding any prior owner of the chord first.
    /// Returns the displaced action, if any.
    pub fn bind_override(&mut self, action: Action, chord: KeyChord) -> Option<Action> {
        let displaced = match self.by_chord.get(&chord) {
            Some(&owner) if owner != action => {
                self.unbind(owner);
                Some(owner)
            }
            _ => None,
        };
        // Cannot conflict anymore.
        let _ = self.bind(action, chord);
        displaced
    }

    /// Remove the binding for `action`, returning the chord it held.
    pub fn unbind(&mut self, action: Action) -> Option<KeyChord> {
        let chord = self.by_action.remove(&action)?;
        self.by_chord.remove(&chord);
        debug!(%action, chord = %chord, "unbound hotkey");
        Some(chord)
    }

    pub fn resolve(&self, chord: &KeyChord) -> Option<Action> {
        self.by_chord.get(chord).copied()
    }

    pub fn chord_for(&self, action: Action) -> Option<&KeyChord> {
        self.by_action.get(&action)
    }

    pub fn is_empty(&self) -> bool {
        self.by_chord.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chord(s: &str) -> KeyChord {
        s.parse().unwrap()
    }

    #[test]
    fn distinct_chords_bind_independently() {
        let mut reg = HotkeyRegistry::new();
        reg.bind(Action::TriggerLeft, chord("F5")).unwrap();
        reg.bind(Action::TriggerRight, chord("F6")).unwrap();

        assert_eq!(reg.resolve(&chord("F5")), Some(Action::TriggerLeft));
        assert_eq!(reg.resolve(&chord("F6")), Some(Action::TriggerRight));
    }

    #[test]
    fn conflicting_bind_fails_without_state_change() {
        let mut reg = HotkeyRegistry::new();
        reg.bind(Action::TriggerLeft, chord("Ctrl+F5")).unwrap();

        let err = reg.bind(Action::TriggerRight, chord("Ctrl+F5")).unwrap_err();
        assert_eq!(
            err,
            BindError::Conflict {
                existing: Action::TriggerLeft
            }
        );
        // Loser keeps no binding, winner keeps its chord.
        assert_eq!(reg.resolve(&chord("Ctrl+F5")), Some(Action::TriggerLeft));
        assert_eq!(reg.chord_for(Action::TriggerRight), None);
    }

    #[test]
    fn override_displaces_prior_owner_atomically() {
        let mut reg = HotkeyRegistry::new();
        reg.bind(Action::TriggerLeft, chord("F5")).unwrap();

        let displaced = reg.bind_override(Action::TriggerRight, chord("F5"));
        assert_eq!(displaced, Some(Action::TriggerLeft));
        assert_eq!(reg.resolve(&chord("F5")), Some(Action::TriggerRight));
        assert_eq!(reg.chord_for(Action::TriggerLeft), None);
    }

    #[test]
    fn rebinding_action_releases_its_old_chord() {
        let mut reg = HotkeyRegistry::new();
        reg.bind(Action::TriggerLeft, chord("F5")).unwrap();
        reg.bind(Action::TriggerLeft, chord("F7")).unwrap();

        assert_eq!(reg.resolve(&chord("F5")), None);
        assert_eq!(reg.resolve(&chord("F7")), Some(Action::TriggerLeft));
        // Freed chord is bindable again.
        reg.bind(Action::TriggerRight, chord("F5")).unwrap();
    }

    #[test]
    fn rebinding_same_chord_to_same_action_is_noop() {
        let mut reg = HotkeyRegistry::new();
        reg.bind(Action::TriggerLeft, chord("F5")).unwrap();
        reg.bind(Action::TriggerLeft, chord("F5")).unwrap();
        assert_eq!(reg.resolve(&chord("F5")), Some(Action::TriggerLeft));
    }

    #[test]
    fn unbind_returns_chord() {
        let mut reg = HotkeyRegistry::new();
        reg.bind(Action::TriggerLeft, chord("MouseButton4")).unwrap();
        assert_eq!(reg.unbind(Action::TriggerLeft), Some(chord("MouseButton4")));
        assert_eq!(reg.resolve(&chord("MouseButton4")), None);
        assert!(reg.is_empty());
    }
}
