//! Keymode - modal keystroke dispatch for editor hosts
//!
//! Keymode turns a user-supplied list of named modes into a small state
//! machine: capturing modes intercept every keystroke and route it through
//! their keybinding table, non-capturing modes let keystrokes reach the
//! editor untouched. The editor itself sits behind the [`host::Host`]
//! trait, so the same engine drives a real editor, the bundled terminal
//! demo, or the in-memory [`host::RecordingHost`] in tests.

pub mod capture;
pub mod config;
pub mod dispatch;
pub mod host;
pub mod modes;
pub mod session;

pub use capture::{CaptureController, CaptureError};
pub use config::ConfigError;
pub use dispatch::{DispatchError, Dispatcher, KeyDispatch};
pub use host::{Host, RecordingHost};
pub use modes::{Keybind, Mode, ModeDefinition, ModeId, ModeRegistry};
pub use session::{ActivationError, Session};
