//! The host editor surface the engine runs against.

use crate::capture::CaptureError;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Everything the engine needs from the editor that embeds it.
///
/// The engine is single-threaded and event-driven: the host delivers
/// configuration reads, command invocations and keystrokes one at a time,
/// and every method here completes synchronously.
pub trait Host {
    /// One-shot read of the raw `modes` setting at activation.
    ///
    /// `None` means the user defined no modes at all.
    fn configuration(&mut self) -> Option<Value>;

    /// Expose a named command (e.g. an "enter this mode" command) to the
    /// host's command surface.
    fn register_command(&mut self, name: &str);

    /// Remove a previously registered command.
    fn unregister_command(&mut self, name: &str);

    /// Execute the command bound to a matched keybinding.
    fn invoke_command(&mut self, name: &str);

    /// Attempt to take the exclusive keystroke interception resource.
    ///
    /// # Errors
    ///
    /// [`CaptureError::Conflict`] when another component already intercepts
    /// keystrokes, [`CaptureError::Host`] on any other failure.
    fn begin_capture(&mut self) -> Result<(), CaptureError>;

    /// Hand the keystroke interception resource back.
    fn end_capture(&mut self);

    /// Replace the short mode indicator in the editor's status area.
    fn set_status_text(&mut self, text: &str);

    /// Show an informational message to the user.
    fn notify_info(&mut self, message: &str);

    /// Show an error message to the user.
    fn notify_error(&mut self, message: &str);

    /// Publish a flag the host's own keybinding layer can react to.
    ///
    /// `None` clears the flag at teardown.
    fn set_context_flag(&mut self, key: &str, value: Option<&str>);
}

// Lets callers keep the host when the engine takes it by value, e.g. to
// inspect it after a failed activation.
impl<H: Host + ?Sized> Host for &mut H {
    fn configuration(&mut self) -> Option<Value> {
        (**self).configuration()
    }

    fn register_command(&mut self, name: &str) {
        (**self).register_command(name);
    }

    fn unregister_command(&mut self, name: &str) {
        (**self).unregister_command(name);
    }

    fn invoke_command(&mut self, name: &str) {
        (**self).invoke_command(name);
    }

    fn begin_capture(&mut self) -> Result<(), CaptureError> {
        (**self).begin_capture()
    }

    fn end_capture(&mut self) {
        (**self).end_capture();
    }

    fn set_status_text(&mut self, text: &str) {
        (**self).set_status_text(text);
    }

    fn notify_info(&mut self, message: &str) {
        (**self).notify_info(message);
    }

    fn notify_error(&mut self, message: &str) {
        (**self).notify_error(message);
    }

    fn set_context_flag(&mut self, key: &str, value: Option<&str>) {
        (**self).set_context_flag(key, value);
    }
}

/// An in-memory [`Host`] that records every interaction.
///
/// Used by this crate's own tests and available to embedders who want to
/// exercise their configurations without a real editor attached.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    config: Option<Value>,
    /// Commands currently registered with the host.
    pub commands: BTreeSet<String>,
    /// Commands invoked through keybindings, in order.
    pub invoked: Vec<String>,
    /// Last status text pushed to the host.
    pub status: Option<String>,
    /// Informational notifications, in order.
    pub infos: Vec<String>,
    /// Error notifications, in order.
    pub errors: Vec<String>,
    /// Context flags by key; `None` values record an explicit clear.
    pub context: BTreeMap<String, Option<String>>,
    /// Number of times the capture resource was granted.
    pub captures_granted: usize,
    /// Number of times the capture resource was handed back.
    pub captures_released: usize,
    captured: bool,
    refusal: Option<CaptureError>,
}

impl RecordingHost {
    /// Host with no configuration at all.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Host whose `modes` setting reads as `config`.
    #[must_use]
    pub fn with_config(config: Value) -> Self {
        Self {
            config: Some(config),
            ..Self::default()
        }
    }

    /// Whether the host currently considers keystrokes intercepted.
    #[must_use]
    pub const fn captured(&self) -> bool {
        self.captured
    }

    /// Make the next capture attempts fail as if a third party held the
    /// resource.
    pub fn deny_capture(&mut self) {
        self.refusal = Some(CaptureError::Conflict);
    }

    /// Make the next capture attempts fail with a host-side error.
    pub fn fail_capture(&mut self, message: &str) {
        self.refusal = Some(CaptureError::Host(message.to_string()));
    }

    /// Clear a previously installed capture refusal.
    pub fn allow_capture(&mut self) {
        self.refusal = None;
    }
}

impl Host for RecordingHost {
    fn configuration(&mut self) -> Option<Value> {
        self.config.clone()
    }

    fn register_command(&mut self, name: &str) {
        self.commands.insert(name.to_string());
    }

    fn unregister_command(&mut self, name: &str) {
        self.commands.remove(name);
    }

    fn invoke_command(&mut self, name: &str) {
        self.invoked.push(name.to_string());
    }

    fn begin_capture(&mut self) -> Result<(), CaptureError> {
        if let Some(refusal) = &self.refusal {
            return Err(refusal.clone());
        }
        if self.captured {
            return Err(CaptureError::Conflict);
        }
        self.captured = true;
        self.captures_granted += 1;
        Ok(())
    }

    fn end_capture(&mut self) {
        if self.captured {
            self.captured = false;
            self.captures_released += 1;
        }
    }

    fn set_status_text(&mut self, text: &str) {
        self.status = Some(text.to_string());
    }

    fn notify_info(&mut self, message: &str) {
        self.infos.push(message.to_string());
    }

    fn notify_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn set_context_flag(&mut self, key: &str, value: Option<&str>) {
        self.context
            .insert(key.to_string(), value.map(ToString::to_string));
    }
}
