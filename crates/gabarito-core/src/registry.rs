//! Association Registry
//!
//! Ordered collection of templates, each owning an ordered set of pieces,
//! plus the master identifier that gates Registration mode.
//!
//! ## Responsibilities
//!
//! - Capacity: bounded template count and pieces per template, with explicit
//!   errors instead of silent overflow
//! - Minimum pieces: a template becomes visible only once committed with at
//!   least one piece
//! - Lookup: first-match linear scans using byte-exact identifier comparison
//! - Compaction: positional removal shifts later templates down
//!
//! ## Design
//!
//! A registration in progress lives in a separate `pending` slot. Lookups,
//! counts and the persisted image only ever see committed templates, so a
//! zero-piece template can never be found or written.
//!
//! Every durable mutation bumps `revision`. The kiosk compares revisions to
//! decide when the full image must be re-encoded.

use gabarito_proto::{
    CodecLimits, Identifier, MAX_PIECES, Piece, PieceName, RegistryImage, Template,
};
use thiserror::Error;

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Registry already holds the maximum number of templates.
    #[error("registry full: {capacity} templates")]
    CapacityExceeded {
        /// Template capacity.
        capacity: usize,
    },

    /// Template already holds the maximum number of pieces.
    #[error("template full: {capacity} pieces")]
    TemplateFull {
        /// Piece capacity.
        capacity: usize,
    },

    /// Commit attempted on a template with no pieces.
    #[error("template at position {position} has no pieces")]
    InsufficientPieces {
        /// Position the template would have taken.
        position: usize,
    },

    /// Position does not address a template.
    #[error("invalid position {position} (count {count})")]
    InvalidPosition {
        /// Requested position.
        position: usize,
        /// Number of addressable templates.
        count: usize,
    },

    /// Template identifier already registered.
    #[error("template {identifier} already registered at position {position}")]
    DuplicateTemplate {
        /// Offending identifier.
        identifier: Identifier,
        /// Position of the existing template.
        position: usize,
    },

    /// Piece identifier already used in the same template.
    #[error("piece {identifier} already part of this template")]
    DuplicatePiece {
        /// Offending identifier.
        identifier: Identifier,
    },
}

/// Capacity bounds of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryLimits {
    /// Maximum committed templates.
    pub max_templates: usize,
    /// Maximum pieces per template.
    pub max_pieces: usize,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self { max_templates: 100, max_pieces: MAX_PIECES }
    }
}

impl From<RegistryLimits> for CodecLimits {
    fn from(limits: RegistryLimits) -> Self {
        Self { max_templates: limits.max_templates, max_pieces: limits.max_pieces }
    }
}

/// Template being registered, not yet committed.
#[derive(Debug, Clone)]
struct Pending {
    position: usize,
    template: Template,
}

/// The template→piece association registry.
#[derive(Debug, Clone)]
pub struct Registry {
    master: Option<Identifier>,
    templates: Vec<Template>,
    pending: Option<Pending>,
    limits: RegistryLimits,
    revision: u64,
}

impl Registry {
    /// Create an empty registry with no master.
    pub fn new(limits: RegistryLimits) -> Self {
        Self { master: None, templates: Vec::new(), pending: None, limits, revision: 0 }
    }

    /// Rebuild a registry from a decoded image.
    ///
    /// The image is trusted to satisfy the template invariant; the codec
    /// rejects zero-piece templates and counts above the limits.
    pub fn from_image(image: RegistryImage, limits: RegistryLimits) -> Self {
        Self { master: image.master, templates: image.templates, pending: None, limits, revision: 0 }
    }

    /// Snapshot of the durable state for encoding.
    pub fn image(&self) -> RegistryImage {
        RegistryImage { master: self.master, templates: self.templates.clone() }
    }

    /// Capacity bounds.
    pub fn limits(&self) -> RegistryLimits {
        self.limits
    }

    /// Durable revision counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of committed templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True if no template is committed.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Committed templates in order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Committed template at a position.
    pub fn template(&self, position: usize) -> Option<&Template> {
        self.templates.get(position)
    }

    /// Enrolled master identifier.
    pub fn master(&self) -> Option<Identifier> {
        self.master
    }

    /// True if a master identifier is enrolled.
    pub fn has_master(&self) -> bool {
        self.master.is_some()
    }

    /// True if `identifier` matches the enrolled master.
    pub fn is_master(&self, identifier: &Identifier) -> bool {
        self.master.is_some_and(|m| m.equal(identifier))
    }

    /// Enroll (or replace) the master identifier.
    pub fn set_master(&mut self, identifier: Identifier) {
        self.master = Some(identifier);
        self.bump();
    }

    /// Position and piece count of the template being registered.
    pub fn pending(&self) -> Option<(usize, usize)> {
        self.pending.as_ref().map(|p| (p.position, p.template.pieces.len()))
    }

    /// True if a template registration is in progress.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Start registering a template.
    ///
    /// Returns the position the template will occupy once committed. The
    /// template is not durable and not visible to lookups until
    /// [`commit_template`](Self::commit_template) succeeds. Starting a new
    /// registration replaces any registration already in progress.
    ///
    /// # Errors
    ///
    /// - `RegistryError::CapacityExceeded` if the registry is full
    /// - `RegistryError::DuplicateTemplate` if a committed template already
    ///   uses `identifier`
    pub fn append_template(&mut self, identifier: Identifier) -> Result<usize, RegistryError> {
        if self.templates.len() >= self.limits.max_templates {
            return Err(RegistryError::CapacityExceeded { capacity: self.limits.max_templates });
        }
        if let Some(position) = self.find_template_by_identifier(&identifier) {
            return Err(RegistryError::DuplicateTemplate { identifier, position });
        }

        if let Some(previous) = self.pending.take() {
            tracing::warn!(
                position = previous.position,
                "replacing uncommitted template {}",
                previous.template.identifier
            );
        }

        let position = self.templates.len();
        self.pending = Some(Pending { position, template: Template::new(identifier) });
        Ok(position)
    }

    /// Add a piece to the template being registered.
    ///
    /// Returns the piece's position within the template.
    ///
    /// # Errors
    ///
    /// - `RegistryError::InvalidPosition` if `position` is not the template
    ///   in progress
    /// - `RegistryError::TemplateFull` if the template already has the
    ///   maximum number of pieces
    /// - `RegistryError::DuplicatePiece` if the template already contains
    ///   `identifier`
    pub fn add_piece(
        &mut self,
        position: usize,
        identifier: Identifier,
        name: PieceName,
    ) -> Result<usize, RegistryError> {
        let max_pieces = self.limits.max_pieces;
        let pending = self.pending_at(position)?;

        if pending.template.pieces.len() >= max_pieces {
            return Err(RegistryError::TemplateFull { capacity: max_pieces });
        }
        if pending.template.find_piece(&identifier).is_some() {
            return Err(RegistryError::DuplicatePiece { identifier });
        }

        pending.template.pieces.push(Piece { identifier, name });
        Ok(pending.template.pieces.len() - 1)
    }

    /// True if the template in progress at `position` already has a piece
    /// with `identifier`.
    pub fn pending_contains(&self, position: usize, identifier: &Identifier) -> bool {
        self.pending
            .as_ref()
            .filter(|p| p.position == position)
            .is_some_and(|p| p.template.find_piece(identifier).is_some())
    }

    /// Finalize the template in progress.
    ///
    /// On success the template becomes visible and durable; returns its piece
    /// count. A template with zero pieces is discarded so no ghost entry
    /// survives.
    ///
    /// # Errors
    ///
    /// - `RegistryError::InvalidPosition` if `position` is not the template
    ///   in progress
    /// - `RegistryError::InsufficientPieces` if the template has no pieces
    /// - `RegistryError::CapacityExceeded` if the registry filled up since
    ///   the registration started
    pub fn commit_template(&mut self, position: usize) -> Result<usize, RegistryError> {
        self.pending_at(position)?;
        let Some(Pending { template, .. }) = self.pending.take() else {
            return Err(RegistryError::InvalidPosition { position, count: self.templates.len() });
        };

        if template.pieces.is_empty() {
            return Err(RegistryError::InsufficientPieces { position });
        }
        if self.templates.len() >= self.limits.max_templates {
            return Err(RegistryError::CapacityExceeded { capacity: self.limits.max_templates });
        }

        let piece_count = template.pieces.len();
        self.templates.push(template);
        self.bump();
        Ok(piece_count)
    }

    /// Drop the template in progress, if any.
    pub fn discard_pending(&mut self) -> Option<Identifier> {
        self.pending.take().map(|p| p.template.identifier)
    }

    /// Position of the first committed template with `identifier`.
    pub fn find_template_by_identifier(&self, identifier: &Identifier) -> Option<usize> {
        self.templates.iter().position(|t| t.identifier.equal(identifier))
    }

    /// Position of the first piece with `identifier` within the committed
    /// template at `position`.
    pub fn find_piece_by_identifier(
        &self,
        position: usize,
        identifier: &Identifier,
    ) -> Option<usize> {
        self.templates.get(position).and_then(|t| t.find_piece(identifier))
    }

    /// Remove the committed template at `position`, shifting later templates
    /// down by one.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidPosition` if `position` is out of
    /// `[0, len)`.
    pub fn remove_template(&mut self, position: usize) -> Result<Template, RegistryError> {
        if position >= self.templates.len() {
            return Err(RegistryError::InvalidPosition { position, count: self.templates.len() });
        }

        let removed = self.templates.remove(position);
        self.bump();
        Ok(removed)
    }

    /// Remove every template. The master stays enrolled.
    pub fn wipe_all(&mut self) {
        self.templates.clear();
        self.pending = None;
        self.bump();
    }

    fn pending_at(&mut self, position: usize) -> Result<&mut Pending, RegistryError> {
        let count = self.templates.len();
        self.pending
            .as_mut()
            .filter(|p| p.position == position)
            .ok_or(RegistryError::InvalidPosition { position, count })
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryLimits::default())
    }
}
