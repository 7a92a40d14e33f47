//! Windows low-level keyboard and mouse hooks.
//!
//! Both hooks run on one dedicated capture thread that pumps messages; the
//! hook procedures translate raw events into [`KeyChordDelta`]s and hand
//! them to the shared [`ListenerCore`], which decides pass/block.

#![cfg(windows)]

use crate::listener::{ListenerCore, ListenerError};
use crate::types::{HookVerdict, KeyChordDelta, ModifierKey, NamedKey, Primary, RawEvent};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info, warn};
use windows::Win32::Foundation::{HINSTANCE, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, VK_CONTROL, VK_ESCAPE, VK_MENU,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PostThreadMessageW, SetWindowsHookExW,
    TranslateMessage, UnhookWindowsHookEx, HHOOK, KBDLLHOOKSTRUCT, MSG, MSLLHOOKSTRUCT,
    WH_KEYBOARD_LL, WH_MOUSE_LL, WM_KEYUP, WM_QUIT, WM_SYSKEYUP, WM_XBUTTONDOWN, WM_XBUTTONUP,
};

/// Magic number to identify our own injected events.
pub const INJECTED_EXTRA_INFO: usize = 0xFFB1B1B1;

static ACTIVE_CORE: Mutex<Option<Arc<ListenerCore>>> = Mutex::new(None);
static HOOK_HANDLES: Mutex<Option<(HHOOK, HHOOK)>> = Mutex::new(None);

/// Install both hooks and pump messages until [`request_quit`] is called.
///
/// The initialization result (this thread's id on success) goes back through
/// `init_tx` so the caller can surface registration failures.
pub(crate) fn run_capture(
    core: Arc<ListenerCore>,
    init_tx: Sender<Result<u32, ListenerError>>,
) {
    *ACTIVE_CORE.lock() = Some(core);

    let kb_hook = match unsafe {
        SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_proc), HINSTANCE::default(), 0)
    } {
        Ok(h) if !h.is_invalid() => h,
        Ok(_) | Err(_) => {
            *ACTIVE_CORE.lock() = None;
            error!("keyboard hook registration failed");
            let _ = init_tx.send(Err(ListenerError::HookInstall(
                "WH_KEYBOARD_LL registration rejected".to_string(),
            )));
            return;
        }
    };

    let mouse_hook = match unsafe {
        SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_proc), HINSTANCE::default(), 0)
    } {
        Ok(h) if !h.is_invalid() => h,
        Ok(_) | Err(_) => {
            unsafe {
                let _ = UnhookWindowsHookEx(kb_hook);
            }
            *ACTIVE_CORE.lock() = None;
            error!("mouse hook registration failed");
            let _ = init_tx.send(Err(ListenerError::HookInstall(
                "WH_MOUSE_LL registration rejected".to_string(),
            )));
            return;
        }
    };

    *HOOK_HANDLES.lock() = Some((kb_hook, mouse_hook));
    let thread_id = unsafe { GetCurrentThreadId() };
    info!(thread_id, "global hooks installed");
    let _ = init_tx.send(Ok(thread_id));

    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    if let Some((kb, mouse)) = HOOK_HANDLES.lock().take() {
        unsafe {
            let _ = UnhookWindowsHookEx(kb);
            let _ = UnhookWindowsHookEx(mouse);
        }
    }
    *ACTIVE_CORE.lock() = None;
    info!("global hooks removed, capture thread exiting");
}

/// Ask the capture thread's message pump to exit.
pub(crate) fn request_quit(thread_id: u32) {
    unsafe {
        if PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)).is_err() {
            warn!(thread_id, "failed to post quit to capture thread");
        }
    }
}

const F_KEYS: [NamedKey; 12] = [
    NamedKey::F1,
    NamedKey::F2,
    NamedKey::F3,
    NamedKey::F4,
    NamedKey::F5,
    NamedKey::F6,
    NamedKey::F7,
    NamedKey::F8,
    NamedKey::F9,
    NamedKey::F10,
    NamedKey::F11,
    NamedKey::F12,
];

fn vk_to_modifier(vk: u32) -> Option<ModifierKey> {
    match vk {
        0x10 | 0xA0 | 0xA1 => Some(ModifierKey::Shift), // VK_SHIFT, VK_LSHIFT, VK_RSHIFT
        0x11 | 0xA2 | 0xA3 => Some(ModifierKey::Ctrl),  // VK_CONTROL, VK_LCONTROL, VK_RCONTROL
        0x12 | 0xA4 | 0xA5 => Some(ModifierKey::Alt),   // VK_MENU, VK_LMENU, VK_RMENU
        0x5B | 0x5C => Some(ModifierKey::Meta),         // VK_LWIN, VK_RWIN
        _ => None,
    }
}

fn vk_to_primary(vk: u32) -> Option<Primary> {
    match vk {
        // Letters and digits map straight to their ASCII uppercase form.
        0x30..=0x39 | 0x41..=0x5A => Some(Primary::Char(vk as u8 as char)),
        0x70..=0x7B => Some(Primary::Named(F_KEYS[(vk - 0x70) as usize])),
        0x20 => Some(Primary::Named(NamedKey::Space)),
        0x0D => Some(Primary::Named(NamedKey::Enter)),
        0x09 => Some(Primary::Named(NamedKey::Tab)),
        0x08 => Some(Primary::Named(NamedKey::Backspace)),
        0x1B => Some(Primary::Named(NamedKey::Escape)),
        0x14 => Some(Primary::Named(NamedKey::CapsLock)),
        0x2E => Some(Primary::Named(NamedKey::Delete)),
        0x24 => Some(Primary::Named(NamedKey::Home)),
        0x23 => Some(Primary::Named(NamedKey::End)),
        0x21 => Some(Primary::Named(NamedKey::PageUp)),
        0x22 => Some(Primary::Named(NamedKey::PageDown)),
        0x26 => Some(Primary::Named(NamedKey::ArrowUp)),
        0x28 => Some(Primary::Named(NamedKey::ArrowDown)),
        0x25 => Some(Primary::Named(NamedKey::ArrowLeft)),
        0x27 => Some(Primary::Named(NamedKey::ArrowRight)),
        _ => None,
    }
}

unsafe extern "system" fn keyboard_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code < 0 {
        return CallNextHookEx(None, code, wparam, lparam);
    }

    let kbd = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
    if kbd.dwExtraInfo == INJECTED_EXTRA_INFO {
        return CallNextHookEx(None, code, wparam, lparam);
    }

    let msg = wparam.0 as u32;
    let up = msg == WM_KEYUP || msg == WM_SYSKEYUP;

    // Emergency stop: Ctrl + Alt + Esc forces every action idle.
    if kbd.vkCode == VK_ESCAPE.0 as u32 && !up {
        let ctrl = GetAsyncKeyState(VK_CONTROL.0 as i32) as u16 & 0x8000 != 0;
        let alt = GetAsyncKeyState(VK_MENU.0 as i32) as u16 & 0x8000 != 0;
        if ctrl && alt {
            error!("emergency stop triggered (Ctrl+Alt+Esc)");
            if let Some(core) = ACTIVE_CORE.lock().as_ref() {
                core.stop_all();
            }
            return CallNextHookEx(None, code, wparam, lparam);
        }
    }

    let delta = if let Some(m) = vk_to_modifier(kbd.vkCode) {
        if up {
            KeyChordDelta::ModifierReleased(m)
        } else {
            KeyChordDelta::ModifierPressed(m)
        }
    } else if let Some(p) = vk_to_primary(kbd.vkCode) {
        if up {
            KeyChordDelta::KeyReleased(p)
        } else {
            KeyChordDelta::KeyPressed(p)
        }
    } else {
        return CallNextHookEx(None, code, wparam, lparam);
    };

    match process(delta) {
        HookVerdict::Pass => CallNextHookEx(None, code, wparam, lparam),
        HookVerdict::Block => LRESULT(1),
    }
}

unsafe extern "system" fn mouse_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code < 0 {
        return CallNextHookEx(None, code, wparam, lparam);
    }

    let ms = &*(lparam.0 as *const MSLLHOOKSTRUCT);
    if ms.dwExtraInfo == INJECTED_EXTRA_INFO {
        return CallNextHookEx(None, code, wparam, lparam);
    }

    // Only the extra (X) buttons can act as hotkeys; XBUTTON1 is index 4.
    let msg = wparam.0 as u32;
    let delta = match msg {
        WM_XBUTTONDOWN | WM_XBUTTONUP => {
            let x_index = (ms.mouseData >> 16) as u16;
            if x_index == 0 {
                return CallNextHookEx(None, code, wparam, lparam);
            }
            let button = 3 + x_index as u8;
            if msg == WM_XBUTTONDOWN {
                KeyChordDelta::ButtonPressed(button)
            } else {
                KeyChordDelta::ButtonReleased(button)
            }
        }
        _ => return CallNextHookEx(None, code, wparam, lparam),
    };

    match process(delta) {
        HookVerdict::Pass => CallNextHookEx(None, code, wparam, lparam),
        HookVerdict::Block => LRESULT(1),
    }
}

fn process(delta: KeyChordDelta) -> HookVerdict {
    match ACTIVE_CORE.lock().as_ref() {
        Some(core) => core.process(RawEvent::now(delta)),
        None => HookVerdict::Pass,
    }
}
