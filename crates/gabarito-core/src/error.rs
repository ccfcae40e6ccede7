//! Kiosk error taxonomy.
//!
//! Every failure the operator can trigger maps to one of these. None of them
//! is fatal: each is reported on the display and console, logged, and the
//! kiosk carries on from a well-defined state.

use gabarito_proto::{CodecError, CommandError, Identifier, IdentifierError};
use thiserror::Error;

use crate::{event::KioskAction, registry::RegistryError};

/// Operator-visible kiosk errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KioskError {
    /// Registry is full. No state change.
    #[error("capacity exceeded: {capacity} templates")]
    CapacityExceeded {
        /// Template capacity.
        capacity: usize,
    },

    /// Template already has the maximum number of pieces.
    #[error("template full: {capacity} pieces")]
    TemplateFull {
        /// Piece capacity.
        capacity: usize,
    },

    /// Commit with zero pieces. The in-progress template was discarded.
    #[error("a template needs at least one piece")]
    InsufficientPieces,

    /// Index outside the registry. No state change.
    #[error("invalid position: {detail}")]
    InvalidPosition {
        /// What was addressed.
        detail: String,
    },

    /// Text input did not decode to a 4-byte identifier. Input discarded.
    #[error("malformed identifier: {reason}")]
    MalformedIdentifier {
        /// Parser message.
        reason: String,
    },

    /// Identifier already in use where uniqueness is required.
    #[error("duplicate identifier {identifier}")]
    DuplicateIdentifier {
        /// Offending identifier.
        identifier: Identifier,
    },

    /// Presented card is not the master. Registration stays gated.
    #[error("card {presented} is not the master card")]
    AuthenticationFailed {
        /// Identifier that was presented.
        presented: Identifier,
    },

    /// Verification deadline elapsed with pieces missing.
    #[error("verification timed out with {missing} pieces missing")]
    VerificationTimeout {
        /// Pieces never presented.
        missing: usize,
    },

    /// Durable medium unavailable, unwritable or unreadable.
    #[error("storage failure: {reason}")]
    StorageFailure {
        /// Underlying cause.
        reason: String,
    },
}

impl KioskError {
    /// Two display lines describing the error.
    pub fn display_lines(&self) -> (&'static str, &'static str) {
        match self {
            Self::CapacityExceeded { .. } => ("Limite atingido", "Memoria cheia"),
            Self::TemplateFull { .. } => ("Limite atingido", "Max. de pecas"),
            Self::InsufficientPieces => ("Erro", "Minimo 1 peca"),
            Self::InvalidPosition { .. } => ("Erro Exclusao", "Indice invalido"),
            Self::MalformedIdentifier { .. } => ("Erro", "UID invalido"),
            Self::DuplicateIdentifier { .. } => ("Erro", "UID repetido"),
            Self::AuthenticationFailed { .. } => ("Erro", "Master invalido"),
            Self::VerificationTimeout { .. } => ("Tempo esgotado", "Leia o gabarito"),
            Self::StorageFailure { .. } => ("Falha memoria", "Modo degradado"),
        }
    }

    /// Log the error and produce the operator-facing report.
    pub fn report(&self) -> Vec<KioskAction> {
        tracing::warn!(error = %self, "operator error");

        let (line1, line2) = self.display_lines();
        vec![KioskAction::display(line1, line2), KioskAction::console(format!("{line1}: {line2}"))]
    }
}

impl From<RegistryError> for KioskError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::CapacityExceeded { capacity } => Self::CapacityExceeded { capacity },
            RegistryError::TemplateFull { capacity } => Self::TemplateFull { capacity },
            RegistryError::InsufficientPieces { .. } => Self::InsufficientPieces,
            RegistryError::InvalidPosition { position, count } => Self::InvalidPosition {
                detail: format!("index {} of {count}", position + 1),
            },
            RegistryError::DuplicateTemplate { identifier, .. }
            | RegistryError::DuplicatePiece { identifier } => {
                Self::DuplicateIdentifier { identifier }
            },
        }
    }
}

impl From<IdentifierError> for KioskError {
    fn from(err: IdentifierError) -> Self {
        Self::MalformedIdentifier { reason: err.to_string() }
    }
}

impl From<CommandError> for KioskError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::InvalidIndex { argument } => {
                Self::InvalidPosition { detail: format!("{argument:?} is not an index") }
            },
        }
    }
}

impl From<CodecError> for KioskError {
    fn from(err: CodecError) -> Self {
        Self::StorageFailure { reason: err.to_string() }
    }
}
