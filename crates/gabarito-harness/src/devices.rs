//! Output devices that remember what they were told.

use gabarito_core::{
    Indicator,
    device::{IndicatorOutputs, StatusDisplay},
};

/// Display that keeps every frame shown.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    frames: Vec<(String, String)>,
}

impl RecordingDisplay {
    /// The frame currently on the display.
    pub fn current(&self) -> Option<(&str, &str)> {
        self.frames.last().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    /// Every frame in the order shown.
    pub fn frames(&self) -> &[(String, String)] {
        &self.frames
    }

    /// True if `line1`/`line2` was shown at any point.
    pub fn has_shown(&self, line1: &str, line2: &str) -> bool {
        self.frames.iter().any(|(a, b)| a == line1 && b == line2)
    }

    /// Forget the history, keeping the current frame.
    pub fn clear_history(&mut self) {
        let current = self.frames.pop();
        self.frames.clear();
        self.frames.extend(current);
    }
}

impl StatusDisplay for RecordingDisplay {
    fn show(&mut self, line1: &str, line2: &str) {
        self.frames.push((line1.to_owned(), line2.to_owned()));
    }
}

/// Indicator lines with their current level.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordingIndicators {
    success: bool,
    fault: bool,
}

impl RecordingIndicators {
    /// Current level of a line.
    pub fn level(&self, indicator: Indicator) -> bool {
        match indicator {
            Indicator::Success => self.success,
            Indicator::Fault => self.fault,
        }
    }
}

impl IndicatorOutputs for RecordingIndicators {
    fn set(&mut self, indicator: Indicator, on: bool) {
        match indicator {
            Indicator::Success => self.success = on,
            Indicator::Fault => self.fault = on,
        }
    }
}
