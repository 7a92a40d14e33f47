//! Headless engine runner: loads the shared settings document, installs the
//! global hooks, and mirrors status changes back into the store.

use clickforge_core::store::{load_settings, save_settings};
use clickforge_core::Engine;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let settings_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("clickforge-settings.json"));

    let engine = Engine::with_platform_dispatcher();
    let settings = load_settings(&settings_path);
    engine.apply_settings(&settings)?;
    println!(
        "Loaded settings from {:?}: {}ms, hold={}, left={:?}, right={:?}",
        settings_path, settings.click_speed, settings.hold_mode,
        settings.hotkey_left, settings.hotkey_right
    );

    // Publish active flags back to the store whenever they change.
    let status_path = settings_path.clone();
    engine.set_on_status_change(move |status| {
        let mut doc = load_settings(&status_path);
        doc.is_running = status.is_running;
        doc.hotkey_left_active = status.left_active;
        doc.hotkey_right_active = status.right_active;
        if let Err(e) = save_settings(&status_path, &doc) {
            eprintln!("failed to publish status {:?}: {}", status, e);
        }
    });

    match engine.start_listening() {
        Ok(()) => println!("Global capture active. Ctrl+Alt+Esc stops all actions."),
        Err(e) => println!("Global capture unavailable ({}), running local-only.", e),
    }

    // Park until interrupted; all work happens on the engine's threads.
    loop {
        std::thread::sleep(std::time::Duration::from_secs(60));
    }
}
