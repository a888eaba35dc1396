//! Terminal demo host built on crossterm.
//!
//! Not an editor: invoked commands are simply echoed, and pass-through
//! keystrokes are printed as-is. Good enough to try a configuration out
//! and watch the mode machine work.

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use keymode::host::Host;
use keymode::session::CHANGE_COMMAND;
use keymode::{CaptureError, KeyDispatch, Session};
use serde_json::Value;
use std::collections::BTreeSet;
use std::io::{self, Write};
use tracing::debug;

/// Prefix shared by the per-mode enter commands the session registers.
const ENTER_PREFIX: &str = "keymode.enter.";

/// Print one line while the terminal is in raw mode.
fn say(line: &str) {
    let mut out = io::stdout();
    let _ = write!(out, "{line}\r\n");
    let _ = out.flush();
}

/// A mode-switch invocation deferred to the event loop.
#[derive(Debug)]
enum Request {
    Enter(String),
    Change,
}

/// A [`Host`] over the local terminal.
///
/// Status and notifications go to stdout. Mode-switch commands are queued
/// rather than applied immediately: the event loop drains the queue between
/// keystrokes, keeping every dispatcher operation a single synchronous step.
#[derive(Debug)]
struct TerminalHost {
    config: Option<Value>,
    commands: BTreeSet<String>,
    pending: Vec<Request>,
    captured: bool,
}

impl TerminalHost {
    const fn new(config: Value) -> Self {
        Self {
            config: Some(config),
            commands: BTreeSet::new(),
            pending: Vec::new(),
            captured: false,
        }
    }
}

impl Host for TerminalHost {
    fn configuration(&mut self) -> Option<Value> {
        self.config.take()
    }

    fn register_command(&mut self, name: &str) {
        self.commands.insert(name.to_string());
    }

    fn unregister_command(&mut self, name: &str) {
        self.commands.remove(name);
    }

    fn invoke_command(&mut self, name: &str) {
        if let Some(mode) = name.strip_prefix(ENTER_PREFIX) {
            self.pending.push(Request::Enter(mode.to_string()));
        } else if name == CHANGE_COMMAND {
            self.pending.push(Request::Change);
        } else {
            say(&format!("[invoke] {name}"));
        }
    }

    fn begin_capture(&mut self) -> Result<(), CaptureError> {
        if self.captured {
            return Err(CaptureError::Conflict);
        }
        self.captured = true;
        Ok(())
    }

    fn end_capture(&mut self) {
        self.captured = false;
    }

    fn set_status_text(&mut self, text: &str) {
        if !text.is_empty() {
            say(&format!("[status] {text}"));
        }
    }

    fn notify_info(&mut self, message: &str) {
        say(&format!("[info] {message}"));
    }

    fn notify_error(&mut self, message: &str) {
        say(&format!("[error] {message}"));
    }

    fn set_context_flag(&mut self, key: &str, value: Option<&str>) {
        debug!(key, value, "context flag");
    }
}

/// Puts the terminal into raw mode for its lifetime.
struct RawModeGuard;

impl RawModeGuard {
    fn new() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if disable_raw_mode().is_err() {
            eprintln!("could not disable raw mode");
        }
    }
}

/// Run the demo loop over `raw` until Ctrl+Q.
pub fn run(raw: Value) -> Result<()> {
    let host = TerminalHost::new(raw);
    let _guard = RawModeGuard::new()?;
    let mut session = Session::activate(host).context("Failed to activate session")?;
    say("[info] press keys to dispatch, Ctrl+Q to quit");

    loop {
        let Event::Key(key) = event::read().context("Failed to read terminal event")? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
            break;
        }
        let KeyCode::Char(c) = key.code else {
            continue;
        };

        match session.on_keystroke(c) {
            Ok(KeyDispatch::PassThrough) => say(&c.to_string()),
            // Misses were already surfaced through the host.
            Ok(KeyDispatch::Invoked) | Err(_) => {}
        }

        let pending = std::mem::take(&mut session.host_mut().pending);
        for request in pending {
            // Failures were already surfaced through the host.
            let _ = match request {
                Request::Enter(mode) => session.enter_mode(&mode),
                Request::Change => session.change_mode(),
            };
        }
    }

    session.deactivate();
    Ok(())
}
