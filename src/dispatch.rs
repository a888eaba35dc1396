//! The mode state machine: transitions and keystroke routing.

use crate::capture::{CaptureController, CaptureError};
use crate::host::Host;
use crate::modes::{Mode, ModeId, ModeRegistry};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Context flag published to the host so its own keybinding layer can react
/// to the active mode.
pub const CONTEXT_KEY: &str = "keymode.mode";

/// A dispatcher operation that could not complete.
///
/// Every variant is local to one operation: the current mode and the
/// capture state are left exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No mode is registered under the requested name.
    #[error("mode '{name}' not found")]
    ModeNotFound {
        /// The name that failed to resolve.
        name: String,
    },
    /// The current mode's table has no binding for the pressed key.
    #[error("no command bound to '{key}' in mode '{mode}'")]
    KeyNotFound {
        /// The pressed key.
        key: char,
        /// Name of the mode that was consulted.
        mode: String,
    },
    /// The host failed while the capture resource was being acquired.
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// What happened to a routed keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDispatch {
    /// The keystroke matched a binding and its command was invoked.
    Invoked,
    /// The current mode is non-capturing; the host handles the keystroke
    /// natively.
    PassThrough,
}

/// Mutable state of one session: the current mode and the capture hold.
///
/// Created at activation, mutated only by [`Dispatcher`] transitions, torn
/// down with the capture resource released first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DispatchState {
    current: ModeId,
    capture: CaptureController,
}

/// The keystroke-dispatch state machine.
///
/// One state per registered mode; the initial state is the registry's
/// starting mode and there is no terminal state. Every operation runs to
/// completion before the next host event arrives, so the state needs no
/// locking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatcher {
    registry: ModeRegistry,
    state: DispatchState,
}

impl Dispatcher {
    /// Create a dispatcher positioned at the registry's starting mode.
    ///
    /// No host interaction happens yet; call [`Self::install`] to acquire
    /// capture (if needed) and publish the initial status.
    #[must_use]
    pub fn new(registry: ModeRegistry) -> Self {
        let state = DispatchState {
            current: registry.starting_mode(),
            capture: CaptureController::new(),
        };
        Self { registry, state }
    }

    /// The registered modes.
    #[must_use]
    pub const fn registry(&self) -> &ModeRegistry {
        &self.registry
    }

    /// The mode the session is currently in.
    #[must_use]
    pub fn current(&self) -> &Mode {
        self.registry.get(self.state.current)
    }

    /// Id of the current mode.
    #[must_use]
    pub const fn current_id(&self) -> ModeId {
        self.state.current
    }

    /// Whether the session holds the keystroke interception resource.
    #[must_use]
    pub const fn capture_held(&self) -> bool {
        self.state.capture.held()
    }

    /// Enter the starting mode for real: acquire capture when it captures,
    /// publish status text and the context flag.
    ///
    /// # Errors
    ///
    /// Propagates a host failure while acquiring capture; a plain capture
    /// conflict is reported through the host and is not an error here.
    pub fn install<H: Host>(&mut self, host: &mut H) -> Result<(), DispatchError> {
        self.transition(host, self.state.current)
    }

    /// Switch to the mode named `name` (exact match).
    ///
    /// # Errors
    ///
    /// [`DispatchError::ModeNotFound`] when no such mode exists, or a host
    /// failure from the capture acquisition; state is unchanged either way.
    pub fn enter_mode<H: Host>(&mut self, host: &mut H, name: &str) -> Result<(), DispatchError> {
        let id = self
            .registry
            .find(name)
            .ok_or_else(|| DispatchError::ModeNotFound {
                name: name.to_string(),
            })?;
        self.transition(host, id)
    }

    /// Switch to the mode registered under `id`.
    ///
    /// # Errors
    ///
    /// Propagates a host failure from the capture acquisition; state is
    /// unchanged on error.
    pub fn enter_mode_by_id<H: Host>(
        &mut self,
        host: &mut H,
        id: ModeId,
    ) -> Result<(), DispatchError> {
        self.transition(host, id)
    }

    /// Route one keystroke through the current mode.
    ///
    /// Only capturing modes route keystrokes; in a non-capturing mode the
    /// host handles the key natively and this returns
    /// [`KeyDispatch::PassThrough`]. Matching is exact and
    /// single-character: no prefixes, no sequences.
    ///
    /// # Errors
    ///
    /// [`DispatchError::KeyNotFound`] when the current mode's table has no
    /// binding for `key`; the current mode is left unchanged and no command
    /// is invoked.
    pub fn on_keystroke<H: Host>(
        &self,
        host: &mut H,
        key: char,
    ) -> Result<KeyDispatch, DispatchError> {
        let mode = self.registry.get(self.state.current);
        if !mode.is_capturing() {
            trace!(key = %key, mode = mode.name(), "keystroke passed through");
            return Ok(KeyDispatch::PassThrough);
        }

        match mode.command_for(key) {
            Some(command) => {
                trace!(key = %key, command, mode = mode.name(), "keystroke matched");
                host.invoke_command(command);
                Ok(KeyDispatch::Invoked)
            }
            None => Err(DispatchError::KeyNotFound {
                key,
                mode: mode.name().to_string(),
            }),
        }
    }

    /// Release the capture resource (teardown helper); idempotent.
    pub fn release<H: Host>(&mut self, host: &mut H) {
        self.state.capture.release(host);
    }

    /// The transition itself: resource call first, then the state update.
    ///
    /// A capture conflict still enters the mode (interception stays inert
    /// and the user is told); any other host failure aborts the whole
    /// transition with the previous mode and capture state retained.
    fn transition<H: Host>(&mut self, host: &mut H, target: ModeId) -> Result<(), DispatchError> {
        let mode = self.registry.get(target);

        if mode.is_capturing() {
            match self.state.capture.acquire(host) {
                Ok(()) => {}
                Err(CaptureError::Conflict) => {
                    warn!(mode = mode.name(), "capture conflict, interception inert");
                    host.notify_error(&format!("keymode: {}", CaptureError::Conflict));
                }
                Err(error @ CaptureError::Host(_)) => {
                    warn!(mode = mode.name(), %error, "transition aborted");
                    return Err(error.into());
                }
            }
        } else {
            self.state.capture.release(host);
        }

        debug!(
            from = self.registry.get(self.state.current).name(),
            to = mode.name(),
            "mode transition"
        );
        self.state.current = target;
        host.set_status_text(&mode.display_text());
        host.set_context_flag(CONTEXT_KEY, Some(mode.name()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used, reason = "test assertions")]

    use super::*;
    use crate::config::validate;
    use crate::host::RecordingHost;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dispatcher() -> Dispatcher {
        let raw = json!([
            {"name": "insert", "capturing": false},
            {"name": "normal", "capturing": true, "startingMode": true,
             "keybindings": [{"key": "i", "command": "enterInsert"}]},
            {"name": "select", "capturing": true,
             "keybindings": [{"key": "v", "command": "extend"}]},
        ]);
        Dispatcher::new(ModeRegistry::build(validate(&raw).unwrap()))
    }

    #[test]
    fn test_install_enters_starting_mode_and_captures() {
        let mut host = RecordingHost::new();
        let mut dispatcher = dispatcher();

        dispatcher.install(&mut host).unwrap();

        assert_eq!(dispatcher.current().name(), "normal");
        assert!(dispatcher.capture_held());
        assert_eq!(host.status.as_deref(), Some("-- NORMAL --"));
        assert_eq!(
            host.context.get(CONTEXT_KEY),
            Some(&Some("normal".to_string()))
        );
    }

    #[test]
    fn test_bound_keystroke_invokes_command() {
        let mut host = RecordingHost::new();
        let mut dispatcher = dispatcher();
        dispatcher.install(&mut host).unwrap();

        let outcome = dispatcher.on_keystroke(&mut host, 'i').unwrap();
        assert_eq!(outcome, KeyDispatch::Invoked);
        assert_eq!(host.invoked, vec!["enterInsert".to_string()]);
    }

    #[test]
    fn test_unbound_keystroke_changes_nothing() {
        let mut host = RecordingHost::new();
        let mut dispatcher = dispatcher();
        dispatcher.install(&mut host).unwrap();

        let error = dispatcher.on_keystroke(&mut host, 'x').unwrap_err();
        assert_eq!(
            error,
            DispatchError::KeyNotFound {
                key: 'x',
                mode: "normal".to_string(),
            }
        );
        assert_eq!(dispatcher.current().name(), "normal");
        assert!(dispatcher.capture_held());
        assert!(host.invoked.is_empty());
    }

    #[test]
    fn test_keystroke_passes_through_in_non_capturing_mode() {
        let mut host = RecordingHost::new();
        let mut dispatcher = dispatcher();
        dispatcher.install(&mut host).unwrap();
        dispatcher.enter_mode(&mut host, "insert").unwrap();

        let outcome = dispatcher.on_keystroke(&mut host, 'i').unwrap();
        assert_eq!(outcome, KeyDispatch::PassThrough);
        assert!(host.invoked.is_empty());
    }

    #[test]
    fn test_entering_non_capturing_mode_releases_capture() {
        let mut host = RecordingHost::new();
        let mut dispatcher = dispatcher();
        dispatcher.install(&mut host).unwrap();
        assert!(dispatcher.capture_held());

        dispatcher.enter_mode(&mut host, "insert").unwrap();

        assert!(!dispatcher.capture_held());
        assert!(!host.captured());
        assert_eq!(host.status.as_deref(), Some("-- INSERT --"));
    }

    #[test]
    fn test_capturing_to_capturing_keeps_the_handle() {
        let mut host = RecordingHost::new();
        let mut dispatcher = dispatcher();
        dispatcher.install(&mut host).unwrap();

        dispatcher.enter_mode(&mut host, "select").unwrap();

        // Acquired exactly once, never released in between.
        assert_eq!(host.captures_granted, 1);
        assert_eq!(host.captures_released, 0);
        assert!(dispatcher.capture_held());
        assert_eq!(dispatcher.current().name(), "select");
    }

    #[test]
    fn test_unknown_mode_leaves_state_unchanged() {
        let mut host = RecordingHost::new();
        let mut dispatcher = dispatcher();
        dispatcher.install(&mut host).unwrap();

        let error = dispatcher.enter_mode(&mut host, "visual").unwrap_err();
        assert_eq!(
            error,
            DispatchError::ModeNotFound {
                name: "visual".to_string(),
            }
        );
        assert_eq!(dispatcher.current().name(), "normal");
        assert!(dispatcher.capture_held());
    }

    #[test]
    fn test_mode_lookup_is_exact() {
        let mut host = RecordingHost::new();
        let mut dispatcher = dispatcher();
        dispatcher.install(&mut host).unwrap();

        assert!(dispatcher.enter_mode(&mut host, "Insert").is_err());
        assert!(dispatcher.enter_mode(&mut host, "inser").is_err());
        assert!(dispatcher.enter_mode(&mut host, "insert").is_ok());
    }

    #[test]
    fn test_capture_conflict_still_enters_the_mode() {
        let mut host = RecordingHost::new();
        host.deny_capture();
        let mut dispatcher = dispatcher();

        dispatcher.install(&mut host).unwrap();

        assert_eq!(dispatcher.current().name(), "normal");
        assert!(!dispatcher.capture_held());
        assert_eq!(host.errors.len(), 1);
        assert!(host.errors[0].contains("already held"));
    }

    #[test]
    fn test_host_failure_aborts_the_transition() {
        let mut host = RecordingHost::new();
        let mut dispatcher = dispatcher();
        dispatcher.install(&mut host).unwrap();
        dispatcher.enter_mode(&mut host, "insert").unwrap();

        host.fail_capture("registration failed");
        let error = dispatcher.enter_mode(&mut host, "normal").unwrap_err();

        assert_eq!(
            error,
            DispatchError::Capture(CaptureError::Host("registration failed".to_string()))
        );
        // Fully aborted: previous mode and capture state retained.
        assert_eq!(dispatcher.current().name(), "insert");
        assert!(!dispatcher.capture_held());
        assert_eq!(host.status.as_deref(), Some("-- INSERT --"));
    }

    #[test]
    fn test_enter_mode_by_id() {
        let mut host = RecordingHost::new();
        let mut dispatcher = dispatcher();
        dispatcher.install(&mut host).unwrap();

        let insert = dispatcher.registry().find("insert").unwrap();
        dispatcher.enter_mode_by_id(&mut host, insert).unwrap();
        assert_eq!(dispatcher.current_id(), insert);
    }

    #[test]
    fn test_release_is_idempotent_at_teardown() {
        let mut host = RecordingHost::new();
        let mut dispatcher = dispatcher();
        dispatcher.install(&mut host).unwrap();

        dispatcher.release(&mut host);
        dispatcher.release(&mut host);

        assert!(!dispatcher.capture_held());
        assert_eq!(host.captures_released, 1);
    }
}
