//! Session lifecycle: activation, host wiring, teardown.

use crate::config;
use crate::config::ConfigError;
use crate::dispatch::{CONTEXT_KEY, DispatchError, Dispatcher, KeyDispatch};
use crate::host::Host;
use crate::modes::{Mode, ModeRegistry};
use thiserror::Error;
use tracing::{debug, info};

/// Activation could not install a mode table.
///
/// Configuration errors abort activation entirely; no partial mode set is
/// ever installed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    /// The host has no `modes` setting at all.
    #[error("no modes were defined")]
    NoModesDefined,
    /// The configuration is invalid; carries every violation.
    #[error("invalid configuration ({} problems)", .0.len())]
    Config(Vec<ConfigError>),
    /// Entering the starting mode failed on the host side.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Host command that cycles to the next mode in registry order.
pub const CHANGE_COMMAND: &str = "keymode.change";

/// Name of the host command that enters `mode`.
#[must_use]
pub fn enter_command_name(mode: &str) -> String {
    format!("keymode.enter.{mode}")
}

/// One activated session: the host, the dispatcher and the commands the
/// session registered.
///
/// There is exactly one per host lifetime. Constructed by
/// [`Session::activate`], torn down explicitly by [`Session::deactivate`];
/// no ambient globals are involved.
#[derive(Debug)]
pub struct Session<H: Host> {
    host: H,
    dispatcher: Dispatcher,
    commands: Vec<String>,
}

impl<H: Host> Session<H> {
    /// Read the host's configuration, validate it, build the registry and
    /// enter the starting mode.
    ///
    /// Every configuration violation is surfaced through
    /// [`Host::notify_error`] before this returns.
    ///
    /// # Errors
    ///
    /// [`ActivationError::NoModesDefined`] when the host has no `modes`
    /// setting, [`ActivationError::Config`] with the full violation list
    /// when validation fails, or [`ActivationError::Dispatch`] when the
    /// host errors while the starting mode is entered.
    pub fn activate(mut host: H) -> Result<Self, ActivationError> {
        let Some(raw) = host.configuration() else {
            host.notify_info("keymode: no modes were defined");
            return Err(ActivationError::NoModesDefined);
        };

        let defs = match config::validate(&raw) {
            Ok(defs) => defs,
            Err(errors) => {
                for error in &errors {
                    host.notify_error(&format!("keymode: {error}"));
                }
                return Err(ActivationError::Config(errors));
            }
        };

        let registry = ModeRegistry::build(defs);
        let mut commands: Vec<String> = registry
            .iter()
            .map(|mode| enter_command_name(mode.name()))
            .collect();
        commands.push(CHANGE_COMMAND.to_string());
        for command in &commands {
            host.register_command(command);
            debug!(command, "registered command");
        }

        let mut dispatcher = Dispatcher::new(registry);
        if let Err(error) = dispatcher.install(&mut host) {
            // An aborted activation must leave no commands behind.
            for command in &commands {
                host.unregister_command(command);
            }
            return Err(error.into());
        }

        host.notify_info("keymode: activated successfully");
        info!(modes = dispatcher.registry().len(), "session activated");

        Ok(Self {
            host,
            dispatcher,
            commands,
        })
    }

    /// Switch to the mode named `name`.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::enter_mode`]; the error is also surfaced through
    /// the host as a notification.
    pub fn enter_mode(&mut self, name: &str) -> Result<(), DispatchError> {
        let result = self.dispatcher.enter_mode(&mut self.host, name);
        if let Err(error) = &result {
            self.host.notify_error(&format!("keymode: {error}"));
        }
        result
    }

    /// Route one keystroke through the current mode.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::on_keystroke`]; the error is also surfaced through
    /// the host as a notification.
    pub fn on_keystroke(&mut self, key: char) -> Result<KeyDispatch, DispatchError> {
        let result = self.dispatcher.on_keystroke(&mut self.host, key);
        if let Err(error) = &result {
            self.host.notify_error(&format!("keymode: {error}"));
        }
        result
    }

    /// Cycle to the next mode in registry order, wrapping around.
    ///
    /// Backs the [`CHANGE_COMMAND`] host command for hosts without a mode
    /// picker of their own.
    ///
    /// # Errors
    ///
    /// A host failure from the capture acquisition; the error is also
    /// surfaced through the host as a notification.
    pub fn change_mode(&mut self) -> Result<(), DispatchError> {
        let next = self.dispatcher.registry().next(self.dispatcher.current_id());
        let result = self.dispatcher.enter_mode_by_id(&mut self.host, next);
        if let Err(error) = &result {
            self.host.notify_error(&format!("keymode: {error}"));
        }
        result
    }

    /// The mode the session is currently in.
    #[must_use]
    pub fn current_mode(&self) -> &Mode {
        self.dispatcher.current()
    }

    /// Whether the session holds the keystroke interception resource.
    #[must_use]
    pub const fn capture_held(&self) -> bool {
        self.dispatcher.capture_held()
    }

    /// The host this session drives.
    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host, e.g. for draining queued host events.
    #[must_use]
    pub const fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Tear the session down and hand the host back.
    ///
    /// The capture resource is released before anything else, then the
    /// context flag and status text are cleared and every command the
    /// session registered is removed.
    pub fn deactivate(mut self) -> H {
        self.dispatcher.release(&mut self.host);
        self.host.set_context_flag(CONTEXT_KEY, None);
        self.host.set_status_text("");
        for command in &self.commands {
            self.host.unregister_command(command);
        }
        info!("session deactivated");
        self.host
    }
}
