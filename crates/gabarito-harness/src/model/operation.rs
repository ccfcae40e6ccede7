//! Operations for model-based testing.
//!
//! Operations are what an operator can do at the kiosk, in kit-sized steps.
//! They are generated randomly by proptest and applied to both the model and
//! a simulated station.

use arbitrary::Arbitrary;
use gabarito_proto::Identifier;

/// Card seed. Mapped onto a small identifier space so that duplicates and
/// collisions come up often.
pub type CardSeed = u8;

/// Distinct template cards.
pub const TEMPLATE_CARDS: u8 = 8;

/// Distinct piece cards.
pub const PIECE_CARDS: u8 = 14;

/// Master card enrolled before any operation runs.
pub const MASTER: Identifier = Identifier::new([0xCA, 0xFE, 0x00, 0x01]);

/// Operator actions.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Enter registration, authenticate, read a template card, read each
    /// piece and name it, then finish.
    RegisterKit {
        /// Template card.
        template: CardSeed,
        /// Piece cards in presentation order.
        pieces: Vec<CardSeed>,
    },

    /// `apagar <index>`.
    Delete {
        /// Index as typed, 1-based.
        index: u8,
    },

    /// `limpar`.
    Wipe,

    /// Enter operation, read a template card, present every piece it owns,
    /// then acknowledge with the button.
    VerifyKit {
        /// Template card.
        template: CardSeed,
    },

    /// Power-cycle the station.
    Restart,

    /// Let time pass with nothing happening.
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },
}

/// Template identifier for a seed.
pub fn template_card(seed: CardSeed) -> Identifier {
    Identifier::new([0x10, 0x00, 0x00, seed % TEMPLATE_CARDS])
}

/// Piece identifier for a seed.
pub fn piece_card(seed: CardSeed) -> Identifier {
    Identifier::new([0xA0, 0x00, 0x00, seed % PIECE_CARDS])
}

/// Name the operator types for a piece.
pub fn piece_name(seed: CardSeed) -> String {
    format!("peca {}", seed % PIECE_CARDS)
}

/// Pieces actually presented for a kit: never more than a template holds,
/// so the last one is the earliest point a registration can auto-finish.
pub fn planned_pieces(pieces: &[CardSeed], max_pieces: usize) -> &[CardSeed] {
    &pieces[..pieces.len().min(max_pieces)]
}

/// Result of applying an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation took effect.
    Ok,

    /// Operation was refused.
    Rejected(OperationError),
}

/// Why an operation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Template card already registered.
    DuplicateTemplate,

    /// Registry is full.
    CapacityExceeded,

    /// Kit finished without a single piece.
    NoPieces,

    /// Delete index out of range or zero.
    InvalidIndex,

    /// Template card not registered.
    UnknownTemplate,
}

impl OperationResult {
    /// Check if the operation took effect.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_wrap_into_small_spaces() {
        assert_eq!(template_card(3), template_card(3 + TEMPLATE_CARDS));
        assert_eq!(piece_card(1), piece_card(1 + PIECE_CARDS));
        assert_eq!(piece_name(1 + PIECE_CARDS), "peca 1");
    }

    #[test]
    fn planned_pieces_truncate_to_capacity() {
        let pieces = [1, 2, 3, 4];
        assert_eq!(planned_pieces(&pieces, 2), &[1, 2]);
        assert_eq!(planned_pieces(&pieces, 10), &pieces);
    }
}
