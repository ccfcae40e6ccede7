//! Bounded piece names.

use std::fmt;

/// Maximum encoded length of a piece name in bytes.
pub const MAX_NAME_LENGTH: usize = 20;

/// Piece display name, at most [`MAX_NAME_LENGTH`] bytes of UTF-8.
///
/// Longer input is truncated at the last character boundary that fits, so a
/// name never splits a multi-byte character.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct PieceName(String);

impl PieceName {
    /// Build a name, truncating to the byte bound.
    pub fn new(name: &str) -> Self {
        let mut end = name.len().min(MAX_NAME_LENGTH);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        Self(name[..end].to_owned())
    }

    /// Decode a fixed name field read from storage.
    ///
    /// The name ends at the first NUL byte. Bytes that are not valid UTF-8 are
    /// replaced rather than rejected; a name is display text, not a key.
    pub fn from_field(field: &[u8; MAX_NAME_LENGTH]) -> Self {
        let len = field.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LENGTH);
        Self::new(&String::from_utf8_lossy(&field[..len]))
    }

    /// Encode into a fixed name field. Unused trailing bytes are zero.
    pub fn to_field(&self) -> [u8; MAX_NAME_LENGTH] {
        let mut field = [0u8; MAX_NAME_LENGTH];
        let bytes = self.0.as_bytes();
        field[..bytes.len()].copy_from_slice(bytes);
        field
    }

    /// Name as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the name has no characters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for PieceName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for PieceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PieceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
