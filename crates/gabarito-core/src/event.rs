//! Events fed into the kiosk and actions it produces.

use bytes::Bytes;
use gabarito_proto::Identifier;

use crate::config::ReaderId;

/// Characters per display line.
pub const DISPLAY_WIDTH: usize = 16;

/// Digital output lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Kit complete.
    Success,
    /// Incorrect piece or failure.
    Fault,
}

/// Inputs to the kiosk state machine.
///
/// Every event that can advance time carries the instant it was observed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskEvent<I> {
    /// A card was read and released on a reader.
    CardPresented {
        /// Reader the card was seen on.
        reader: ReaderId,
        /// Card identifier.
        identifier: Identifier,
        /// Observation time.
        now: I,
    },

    /// A line arrived on the operator console.
    ConsoleLine {
        /// Line without its terminator.
        line: String,
        /// Observation time.
        now: I,
    },

    /// A line arrived on the auxiliary identifier channel.
    AuxLine {
        /// Line without its terminator.
        line: String,
        /// Observation time.
        now: I,
    },

    /// The button went down.
    ButtonPressed {
        /// Edge time.
        now: I,
    },

    /// The button went up.
    ButtonReleased {
        /// Edge time.
        now: I,
    },

    /// Periodic scheduler tick.
    Tick {
        /// Tick time.
        now: I,
    },

    /// The driver failed to execute a `Persist` or `Wipe` action.
    StorageFailed {
        /// Underlying cause.
        reason: String,
    },

    /// The driver executed a `Persist` or `Wipe` action.
    StorageWritten {
        /// Revision that is now durable.
        revision: u64,
    },
}

/// Outputs for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskAction {
    /// Overwrite both display lines.
    Display {
        /// First line, at most [`DISPLAY_WIDTH`] characters.
        line1: String,
        /// Second line, at most [`DISPLAY_WIDTH`] characters.
        line2: String,
    },

    /// Write one line to the operator console.
    Console(String),

    /// Drive an indicator output.
    Indicator {
        /// Output line.
        indicator: Indicator,
        /// Asserted or released.
        on: bool,
    },

    /// Rewrite the durable store with a full image.
    Persist {
        /// Registry revision the image captures.
        revision: u64,
        /// Encoded registry.
        image: Bytes,
    },

    /// Scrub the durable store, then write a full image.
    Wipe {
        /// Registry revision the image captures.
        revision: u64,
        /// Encoded (empty) registry.
        image: Bytes,
    },
}

impl KioskAction {
    /// Display action with both lines clipped to the panel width.
    pub fn display(line1: &str, line2: &str) -> Self {
        Self::Display { line1: clip(line1), line2: clip(line2) }
    }

    /// Console action.
    pub fn console(line: impl Into<String>) -> Self {
        Self::Console(line.into())
    }
}

fn clip(line: &str) -> String {
    line.chars().take(DISPLAY_WIDTH).collect()
}
