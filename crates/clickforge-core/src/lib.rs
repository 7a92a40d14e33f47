pub mod chord;
pub mod controller;
pub mod dispatcher;
pub mod engine;
#[cfg(windows)]
pub mod hook;
pub mod listener;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod types;

pub use chord::{ChordParseError, KeyChord};
pub use controller::StatusSnapshot;
pub use engine::Engine;
pub use listener::{ChordEvent, ListenerError};
pub use registry::BindError;
pub use store::Settings;
pub use types::{Action, ClickButton, ClickConfig, RunState, TriggerMode};
