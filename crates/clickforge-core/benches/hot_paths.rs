use criterion::{black_box, criterion_group, criterion_main, Criterion};

use clickforge_core::chord::KeyChord;
use clickforge_core::listener::ChordTracker;
use clickforge_core::registry::HotkeyRegistry;
use clickforge_core::types::{Action, KeyChordDelta, ModifierKey, NamedKey, Primary};

fn bench_chord_parse(c: &mut Criterion) {
    c.bench_function("chord/parse_canonical", |b| {
        b.iter(|| black_box("Ctrl+Shift+F5".parse::<KeyChord>()));
    });
    c.bench_function("chord/parse_mouse_button", |b| {
        b.iter(|| black_box("MouseButton4".parse::<KeyChord>()));
    });
}

fn bench_chord_format(c: &mut Criterion) {
    let chord: KeyChord = "Ctrl+Alt+Shift+Meta+F12".parse().unwrap();
    c.bench_function("chord/format_canonical", |b| {
        b.iter(|| black_box(chord.to_string()));
    });
}

fn bench_registry_resolve(c: &mut Criterion) {
    let mut registry = HotkeyRegistry::new();
    registry
        .bind(Action::TriggerLeft, "Ctrl+F5".parse().unwrap())
        .unwrap();
    registry
        .bind(Action::TriggerRight, "MouseButton5".parse().unwrap())
        .unwrap();

    let bound: KeyChord = "Ctrl+F5".parse().unwrap();
    let unbound: KeyChord = "Alt+Q".parse().unwrap();
    c.bench_function("registry/resolve_bound", |b| {
        b.iter(|| black_box(registry.resolve(&bound)));
    });
    c.bench_function("registry/resolve_unbound", |b| {
        b.iter(|| black_box(registry.resolve(&unbound)));
    });
}

fn bench_tracker_chord_cycle(c: &mut Criterion) {
    let mut tracker = ChordTracker::new();
    c.bench_function("tracker/ctrl_f5_press_release", |b| {
        b.iter(|| {
            black_box(tracker.on_delta(KeyChordDelta::ModifierPressed(ModifierKey::Ctrl)));
            black_box(tracker.on_delta(KeyChordDelta::KeyPressed(Primary::Named(NamedKey::F5))));
            black_box(tracker.on_delta(KeyChordDelta::KeyReleased(Primary::Named(NamedKey::F5))));
            black_box(tracker.on_delta(KeyChordDelta::ModifierReleased(ModifierKey::Ctrl)));
        });
    });
}

criterion_group!(
    benches,
    bench_chord_parse,
    bench_chord_format,
    bench_registry_resolve,
    bench_tracker_chord_cycle
);
criterion_main!(benches);
