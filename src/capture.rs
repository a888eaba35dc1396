//! Exclusive ownership of the host's keystroke interception resource.

use crate::host::Host;
use thiserror::Error;
use tracing::debug;

/// Failure to take the keystroke interception resource from the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The resource is already held by another component system-wide.
    ///
    /// Recoverable: the mode is still entered, keystrokes simply reach the
    /// editor untouched until the conflict clears.
    #[error("keystroke capture is already held by another component")]
    Conflict,
    /// The host failed in some other way; the transition must be aborted.
    #[error("host failed to grant keystroke capture: {0}")]
    Host(String),
}

/// Tracks whether this session holds the host's keystroke interception
/// resource, and acquires/releases it at most once.
///
/// The host grants the resource to at most one holder at a time, so both
/// operations are idempotent: acquiring while held keeps the existing
/// handle, releasing while unheld is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureController {
    held: bool,
}

impl CaptureController {
    /// Create a controller that does not yet hold the resource.
    #[must_use]
    pub const fn new() -> Self {
        Self { held: false }
    }

    /// Whether this controller currently holds the resource.
    #[must_use]
    pub const fn held(self) -> bool {
        self.held
    }

    /// Acquire the interception resource from the host.
    ///
    /// Keeps the existing handle when already held, without going back to
    /// the host. This is what makes capturing-to-capturing transitions
    /// seamless: no release/reacquire pair is ever observed.
    ///
    /// # Errors
    ///
    /// [`CaptureError::Conflict`] when a third party already holds the
    /// resource, [`CaptureError::Host`] on any other host failure. The
    /// controller remains unheld in both cases.
    pub fn acquire<H: Host>(&mut self, host: &mut H) -> Result<(), CaptureError> {
        if self.held {
            return Ok(());
        }
        host.begin_capture()?;
        self.held = true;
        debug!("keystroke capture acquired");
        Ok(())
    }

    /// Release the interception resource back to the host.
    ///
    /// No-op when the resource is not held.
    pub fn release<H: Host>(&mut self, host: &mut H) {
        if self.held {
            host.end_capture();
            self.held = false;
            debug!("keystroke capture released");
        }
    }
}
