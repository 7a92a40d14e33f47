//! Synthetic mouse-button injection.

use crate::types::ClickButton;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("OS rejected synthetic input ({sent}/{expected} events injected)")]
    Rejected { sent: u32, expected: u32 },
    #[error("failed to move cursor to ({0}, {1})")]
    CursorMove(i32, i32),
}

/// Injects synthetic mouse-button events into the OS input stream.
///
/// `click` emits a press+release pair as one dispatched unit. The separate
/// `press`/`release` entry points exist for the sustained button-down style
/// of hold mode; the scheduler currently emits repeated click pairs.
pub trait Dispatch: Send + Sync {
    /// Click at `position`, or at the current cursor location when `None`.
    fn click(&self, button: ClickButton, position: Option<(i32, i32)>) -> Result<(), DispatchError>;

    fn press(&self, button: ClickButton) -> Result<(), DispatchError>;

    fn release(&self, button: ClickButton) -> Result<(), DispatchError>;
}

/// Windows `SendInput` implementation. The press+release pair goes out in a
/// single `SendInput` call, so the OS treats it as one unit.
#[cfg(windows)]
pub use win::SendInputDispatcher;

#[cfg(windows)]
mod win {
    use super::{ClickButton, Dispatch, DispatchError};
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
        MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEINPUT, MOUSE_EVENT_FLAGS,
    };
    use windows::Win32::UI::WindowsAndMessaging::SetCursorPos;

    #[derive(Debug, Default)]
    pub struct SendInputDispatcher;

    fn flags(button: ClickButton, up: bool) -> MOUSE_EVENT_FLAGS {
        match (button, up) {
            (ClickButton::Left, false) => MOUSEEVENTF_LEFTDOWN,
            (ClickButton::Left, true) => MOUSEEVENTF_LEFTUP,
            (ClickButton::Right, false) => MOUSEEVENTF_RIGHTDOWN,
            (ClickButton::Right, true) => MOUSEEVENTF_RIGHTUP,
        }
    }

    fn mouse_input(button: ClickButton, up: bool) -> INPUT {
        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx: 0,
                    dy: 0,
                    mouseData: 0,
                    dwFlags: flags(button, up),
                    time: 0,
                    dwExtraInfo: crate::hook::INJECTED_EXTRA_INFO,
                },
            },
        }
    }

    fn send(inputs: &[INPUT]) -> Result<(), DispatchError> {
        let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            return Err(DispatchError::Rejected {
                sent,
                expected: inputs.len() as u32,
            });
        }
        Ok(())
    }

    impl Dispatch for SendInputDispatcher {
        fn click(
            &self,
            button: ClickButton,
            position: Option<(i32, i32)>,
        ) -> Result<(), DispatchError> {
            if let Some((x, y)) = position {
                unsafe { SetCursorPos(x, y) }.map_err(|_| DispatchError::CursorMove(x, y))?;
            }
            send(&[mouse_input(button, false), mouse_input(button, true)])
        }

        fn press(&self, button: ClickButton) -> Result<(), DispatchError> {
            send(&[mouse_input(button, false)])
        }

        fn release(&self, button: ClickButton) -> Result<(), DispatchError> {
            send(&[mouse_input(button, true)])
        }
    }
}

/// Logs instead of injecting. Default dispatcher on platforms without an
/// injection backend.
#[derive(Debug, Default)]
pub struct NullDispatcher;

impl Dispatch for NullDispatcher {
    fn click(&self, button: ClickButton, position: Option<(i32, i32)>) -> Result<(), DispatchError> {
        debug!(?button, ?position, "null dispatch: click");
        Ok(())
    }

    fn press(&self, button: ClickButton) -> Result<(), DispatchError> {
        debug!(?button, "null dispatch: press");
        Ok(())
    }

    fn release(&self, button: ClickButton) -> Result<(), DispatchError> {
        debug!(?button, "null dispatch: release");
        Ok(())
    }
}

/// Records every dispatched event with its timestamp. Backs the tests.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    events: parking_lot::Mutex<Vec<RecordedEvent>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedKind {
    Click,
    Press,
    Release,
}

#[derive(Debug, Clone, Copy)]
pub struct RecordedEvent {
    pub kind: RecordedKind,
    pub button: ClickButton,
    pub at: Instant,
}

impl RecordingDispatcher {
    fn record(&self, kind: RecordedKind, button: ClickButton) {
        self.events.lock().push(RecordedEvent {
            kind,
            button,
            at: Instant::now(),
        });
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    pub fn click_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == RecordedKind::Click)
            .count()
    }

    pub fn clicks_for(&self, button: ClickButton) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == RecordedKind::Click && e.button == button)
            .count()
    }
}

impl Dispatch for RecordingDispatcher {
    fn click(&self, button: ClickButton, _position: Option<(i32, i32)>) -> Result<(), DispatchError> {
        self.record(RecordedKind::Click, button);
        Ok(())
    }

    fn press(&self, button: ClickButton) -> Result<(), DispatchError> {
        self.record(RecordedKind::Press, button);
        Ok(())
    }

    fn release(&self, button: ClickButton) -> Result<(), DispatchError> {
        self.record(RecordedKind::Release, button);
        Ok(())
    }
}
