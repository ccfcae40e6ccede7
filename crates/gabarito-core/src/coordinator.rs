//! Mode coordinator.
//!
//! Owns `current_mode` and the button debounce window. Registration and
//! operation are mutually exclusive: the kiosk keeps exactly one session
//! alive, chosen by the mode recorded here.

use std::time::Duration;

use crate::env::Instant;

/// Kiosk operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Verifying kits against registered templates.
    Operation,
    /// Registering templates and pieces.
    Registration,
}

impl Mode {
    /// The mode a button toggle switches to.
    pub fn toggled(self) -> Self {
        match self {
            Self::Operation => Self::Registration,
            Self::Registration => Self::Operation,
        }
    }
}

/// Debounced mode switching.
#[derive(Debug, Clone)]
pub struct ModeCoordinator<I> {
    mode: Mode,
    last_toggle: Option<I>,
    debounce: Duration,
}

impl<I: Instant> ModeCoordinator<I> {
    /// Start in operation mode.
    pub fn new(debounce: Duration) -> Self {
        Self { mode: Mode::Operation, last_toggle: None, debounce }
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Button edge at `now`.
    ///
    /// Returns the new mode if the toggle is accepted, `None` if it falls
    /// inside the quiet window after the last accepted toggle.
    pub fn request_toggle(&mut self, now: I) -> Option<Mode> {
        if let Some(last) = self.last_toggle {
            let elapsed = if now > last { now - last } else { Duration::ZERO };
            if elapsed < self.debounce {
                tracing::debug!(?elapsed, "button edge inside debounce window");
                return None;
            }
        }

        self.last_toggle = Some(now);
        self.mode = self.mode.toggled();
        Some(self.mode)
    }

    /// Set the mode explicitly. Returns the previous mode.
    pub fn switch_to(&mut self, mode: Mode) -> Mode {
        std::mem::replace(&mut self.mode, mode)
    }
}
