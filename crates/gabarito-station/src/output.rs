//! Applies station actions to output devices.

use gabarito_core::device::{IndicatorOutputs, StatusDisplay};

use crate::driver::StationAction;

/// Display and indicator lines driven by station actions.
#[derive(Debug)]
pub struct OutputSink<D, L> {
    display: D,
    indicators: L,
}

impl<D: StatusDisplay, L: IndicatorOutputs> OutputSink<D, L> {
    /// Drive `display` and `indicators`.
    pub fn new(display: D, indicators: L) -> Self {
        Self { display, indicators }
    }

    /// Apply device actions. Console lines are returned in order for the
    /// caller to write.
    pub fn apply(&mut self, actions: Vec<StationAction>) -> Vec<String> {
        let mut console = Vec::new();
        for action in actions {
            match action {
                StationAction::Display { line1, line2 } => self.display.show(&line1, &line2),
                StationAction::Indicator { indicator, on } => self.indicators.set(indicator, on),
                StationAction::Console(line) => console.push(line),
            }
        }
        console
    }

    /// The display device.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// The indicator device.
    pub fn indicators(&self) -> &L {
        &self.indicators
    }
}
