//! Error types for identifiers, the persistence codec and console commands.

use thiserror::Error;

/// Identifier construction failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Raw bytes had the wrong length.
    #[error("identifier must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required length.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },

    /// Hex text had the wrong length.
    #[error("identifier must be 8 hex characters, got {actual}")]
    InvalidHexLength {
        /// Length of the trimmed text.
        actual: usize,
    },

    /// Hex text contained a non-hex character.
    #[error("invalid hex identifier: {reason}")]
    InvalidHex {
        /// Decoder message.
        reason: String,
    },
}

/// Persistence codec failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input ended before the declared structure.
    #[error("truncated {field}: needed {needed} bytes, {available} available")]
    Truncated {
        /// Field being read.
        field: &'static str,
        /// Bytes required.
        needed: usize,
        /// Bytes left in the input.
        available: usize,
    },

    /// A count exceeds the configured capacity.
    #[error("{what} count {declared} exceeds capacity {capacity}")]
    CapacityExceeded {
        /// Which count overflowed ("templates" or "pieces").
        what: &'static str,
        /// Count found or requested.
        declared: usize,
        /// Configured bound.
        capacity: usize,
    },

    /// A template has no pieces.
    #[error("template at position {position} has no pieces")]
    EmptyTemplate {
        /// Template position.
        position: usize,
    },

    /// Trailer does not match the contents.
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum read from the medium.
        stored: u32,
        /// Checksum of the bytes actually read.
        computed: u32,
    },
}

/// Console command parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// `apagar` argument was missing, non-numeric or zero.
    #[error("invalid index: {argument:?}")]
    InvalidIndex {
        /// Argument text as received.
        argument: String,
    },
}
