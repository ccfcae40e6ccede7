//! Bench devices.
//!
//! Stand-ins for the readers, button, display and indicator lines when the
//! station runs on a host. Inputs come from a line-oriented feed:
//!
//! ```text
//! primary DEADBEEF     card on the primary reader
//! secondary A0000001   card on the piece reader
//! aux A0000002         identifier on the auxiliary channel
//! button down          button pressed
//! button up            button released
//! ```
//!
//! Outputs are logged through `tracing`.

use std::collections::VecDeque;

use gabarito_core::{
    Indicator, ReaderId,
    device::{ButtonInput, CardReader, IndicatorOutputs, StatusDisplay},
};
use gabarito_proto::Identifier;

use crate::error::StationError;

/// One parsed bench feed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLine {
    /// Present a card on a reader.
    Card {
        /// Target reader.
        reader: ReaderId,
        /// Card identifier.
        identifier: Identifier,
    },
    /// Line for the auxiliary identifier channel, passed through unparsed.
    Aux(String),
    /// Set the button level.
    Button {
        /// Pressed or released.
        pressed: bool,
    },
}

impl FeedLine {
    /// Parse a feed line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, StationError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let bad = |reason: &str| StationError::Feed { line: line.to_owned(), reason: reason.to_owned() };

        let parsed = match keyword.to_ascii_lowercase().as_str() {
            "primary" | "secondary" => {
                let reader =
                    if keyword.eq_ignore_ascii_case("primary") { ReaderId::Primary } else { ReaderId::Secondary };
                let identifier = Identifier::from_hex(rest).map_err(|err| bad(&err.to_string()))?;
                Self::Card { reader, identifier }
            },
            "aux" => Self::Aux(rest.to_owned()),
            "button" => match rest.to_ascii_lowercase().as_str() {
                "down" => Self::Button { pressed: true },
                "up" => Self::Button { pressed: false },
                _ => return Err(bad("expected `button down` or `button up`")),
            },
            _ => return Err(bad("unknown keyword")),
        };
        Ok(Some(parsed))
    }
}

/// Card reader fed by the bench feed.
#[derive(Debug, Default)]
pub struct BenchReader {
    queued: VecDeque<Identifier>,
    in_field: Option<Identifier>,
}

impl BenchReader {
    /// Reader with nothing in the field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a card. Cards are read one at a time, in order.
    pub fn present(&mut self, identifier: Identifier) {
        self.queued.push_back(identifier);
    }
}

impl CardReader for BenchReader {
    fn poll_present(&mut self) -> bool {
        if self.in_field.is_none() {
            self.in_field = self.queued.pop_front();
        }
        self.in_field.is_some()
    }

    fn read_identifier(&mut self) -> Option<Identifier> {
        self.in_field
    }

    fn release(&mut self) {
        self.in_field = None;
    }
}

/// Button driven by the bench feed.
///
/// Level changes are queued and each `is_pressed` call takes at most one, so
/// a press and release arriving together still show up as two edges.
#[derive(Debug, Default)]
pub struct BenchButton {
    pressed: bool,
    queued: VecDeque<bool>,
}

impl BenchButton {
    /// Queue a level change.
    pub fn set(&mut self, pressed: bool) {
        self.queued.push_back(pressed);
    }
}

impl ButtonInput for BenchButton {
    fn is_pressed(&mut self) -> bool {
        if let Some(next) = self.queued.pop_front() {
            self.pressed = next;
        }
        self.pressed
    }
}

/// Display that logs what it would show.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl StatusDisplay for LogDisplay {
    fn show(&mut self, line1: &str, line2: &str) {
        tracing::info!(target: "gabarito::display", "[{line1:<16}|{line2:<16}]");
    }
}

/// Indicator lines that log their level changes.
#[derive(Debug, Default)]
pub struct LogIndicators {
    success: bool,
    fault: bool,
}

impl LogIndicators {
    /// Current level of `indicator`.
    pub fn level(&self, indicator: Indicator) -> bool {
        match indicator {
            Indicator::Success => self.success,
            Indicator::Fault => self.fault,
        }
    }
}

impl IndicatorOutputs for LogIndicators {
    fn set(&mut self, indicator: Indicator, on: bool) {
        let level = match indicator {
            Indicator::Success => &mut self.success,
            Indicator::Fault => &mut self.fault,
        };
        if *level != on {
            *level = on;
            tracing::info!(target: "gabarito::indicator", ?indicator, on, "indicator changed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_card_lines() {
        assert_eq!(
            FeedLine::parse("  Secondary a0000001 ").unwrap(),
            Some(FeedLine::Card {
                reader: ReaderId::Secondary,
                identifier: Identifier::new([0xA0, 0, 0, 1])
            })
        );
    }

    #[test]
    fn aux_lines_pass_through_unparsed() {
        assert_eq!(FeedLine::parse("aux XYZ").unwrap(), Some(FeedLine::Aux("XYZ".to_owned())));
    }

    #[test]
    fn parses_button_lines() {
        assert_eq!(FeedLine::parse("button down").unwrap(), Some(FeedLine::Button { pressed: true }));
        assert_eq!(FeedLine::parse("BUTTON UP").unwrap(), Some(FeedLine::Button { pressed: false }));
    }

    #[test]
    fn skips_blanks_and_comments() {
        assert_eq!(FeedLine::parse("").unwrap(), None);
        assert_eq!(FeedLine::parse("# master card").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!(FeedLine::parse("primary 12"), Err(StationError::Feed { .. })));
        assert!(matches!(FeedLine::parse("button sideways"), Err(StationError::Feed { .. })));
        assert!(matches!(FeedLine::parse("tertiary 00000000"), Err(StationError::Feed { .. })));
    }

    #[test]
    fn reader_serves_queued_cards_in_order() {
        let mut reader = BenchReader::new();
        reader.present(Identifier::new([1, 0, 0, 0]));
        reader.present(Identifier::new([2, 0, 0, 0]));

        assert!(reader.poll_present());
        assert_eq!(reader.read_identifier(), Some(Identifier::new([1, 0, 0, 0])));
        reader.release();
        assert!(reader.poll_present());
        assert_eq!(reader.read_identifier(), Some(Identifier::new([2, 0, 0, 0])));
        reader.release();
        assert!(!reader.poll_present());
    }

    #[test]
    fn button_levels_are_taken_one_per_read() {
        let mut button = BenchButton::default();
        button.set(true);
        button.set(false);

        assert!(button.is_pressed());
        assert!(!button.is_pressed());
        assert!(!button.is_pressed());
    }

    #[test]
    fn indicators_track_levels() {
        let mut indicators = LogIndicators::default();
        indicators.set(Indicator::Fault, true);

        assert!(indicators.level(Indicator::Fault));
        assert!(!indicators.level(Indicator::Success));
    }
}
