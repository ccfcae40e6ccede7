//! Card identifiers.
//!
//! Every card the kiosk sees (master, template, piece) is reduced to a fixed
//! 4-byte identifier. Identifiers carry no ordering and no cryptographic
//! meaning; the only operation that matters is byte-exact equality.

use std::fmt;

use crate::error::IdentifierError;

/// Length of every identifier in bytes.
pub const UID_SIZE: usize = 4;

/// Opaque 4-byte card identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Identifier([u8; UID_SIZE]);

impl Identifier {
    /// Wrap raw identifier bytes.
    pub const fn new(bytes: [u8; UID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build an identifier from a slice read off a reader or a storage
    /// medium.
    ///
    /// # Errors
    ///
    /// Returns `IdentifierError::InvalidLength` unless the slice is exactly
    /// [`UID_SIZE`] bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentifierError> {
        let raw: [u8; UID_SIZE] = bytes
            .try_into()
            .map_err(|_| IdentifierError::InvalidLength { expected: UID_SIZE, actual: bytes.len() })?;
        Ok(Self(raw))
    }

    /// Parse the 8-character hexadecimal form used on the text channels.
    ///
    /// Surrounding whitespace is ignored and both cases are accepted.
    ///
    /// # Errors
    ///
    /// Returns `IdentifierError::InvalidHexLength` when the trimmed text is
    /// not exactly 8 characters and `IdentifierError::InvalidHex` when it
    /// contains non-hex characters.
    pub fn from_hex(text: &str) -> Result<Self, IdentifierError> {
        let text = text.trim();
        if text.len() != UID_SIZE * 2 {
            return Err(IdentifierError::InvalidHexLength { actual: text.len() });
        }

        let mut raw = [0u8; UID_SIZE];
        hex::decode_to_slice(text, &mut raw)
            .map_err(|e| IdentifierError::InvalidHex { reason: e.to_string() })?;
        Ok(Self(raw))
    }

    /// Raw identifier bytes.
    pub const fn as_bytes(&self) -> &[u8; UID_SIZE] {
        &self.0
    }

    /// Byte-exact comparison.
    ///
    /// Lengths are fixed by construction so no length check is needed.
    pub fn equal(&self, other: &Self) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }

    /// True for the two patterns an erased medium holds: all `0x00` or all
    /// `0xFF`. A blank master slot means no master is enrolled.
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|&b| b == 0x00) || self.0.iter().all(|&b| b == 0xFF)
    }

    /// Upper-case hexadecimal rendering, as echoed to the operator.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl From<[u8; UID_SIZE]> for Identifier {
    fn from(bytes: [u8; UID_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.to_hex())
    }
}
