//! Template and piece records.
//!
//! These are the durable shapes of the registry: what the codec writes and
//! what the registry owns once a registration is committed.

use crate::{identifier::Identifier, name::PieceName};

/// Maximum pieces per template.
pub const MAX_PIECES: usize = 10;

/// A component card that must accompany its template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    /// Card identifier of the piece.
    pub identifier: Identifier,
    /// Operator-supplied display name.
    pub name: PieceName,
}

impl Piece {
    /// Create a piece record.
    pub fn new(identifier: Identifier, name: impl Into<PieceName>) -> Self {
        Self { identifier, name: name.into() }
    }
}

/// A registered reference card and the pieces that complete its kit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Card identifier of the template.
    pub identifier: Identifier,
    /// Pieces in registration order.
    pub pieces: Vec<Piece>,
}

impl Template {
    /// Create a template with no pieces yet.
    pub fn new(identifier: Identifier) -> Self {
        Self { identifier, pieces: Vec::new() }
    }

    /// Position of the first piece with the given identifier.
    pub fn find_piece(&self, identifier: &Identifier) -> Option<usize> {
        self.pieces.iter().position(|p| p.identifier.equal(identifier))
    }
}

/// Everything the persistence codec stores.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistryImage {
    /// Enrolled master identifier, if any.
    pub master: Option<Identifier>,
    /// Committed templates in insertion order.
    pub templates: Vec<Template>,
}

impl RegistryImage {
    /// An image with no master and no templates.
    pub fn empty() -> Self {
        Self::default()
    }
}
