//! Hardware capabilities the station drives.
//!
//! The kiosk never touches these; the station polls inputs, turns them into
//! [`KioskEvent`](crate::KioskEvent)s, and applies the resulting actions to
//! the outputs.

use gabarito_proto::Identifier;

use crate::event::Indicator;

/// A contactless card reader.
pub trait CardReader {
    /// True if a new card is in the field.
    fn poll_present(&mut self) -> bool;

    /// Identifier of the card in the field. `None` if no card is present or
    /// the read failed.
    fn read_identifier(&mut self) -> Option<Identifier>;

    /// End the read session so the card can be detected again.
    fn release(&mut self);
}

/// Two-line character display.
pub trait StatusDisplay {
    /// Overwrite both lines.
    fn show(&mut self, line1: &str, line2: &str);
}

/// Success and fault signal lines.
pub trait IndicatorOutputs {
    /// Drive one line.
    fn set(&mut self, indicator: Indicator, on: bool);
}

/// The manual release / mode button.
pub trait ButtonInput {
    /// Current level.
    fn is_pressed(&mut self) -> bool;
}

/// Byte-addressable durable memory.
pub trait ByteStore {
    /// Error raised by the medium.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Addressable size in bytes.
    fn capacity(&self) -> usize;

    /// Read one byte. Addresses at or beyond `capacity` read as `0xFF`.
    fn read(&self, address: usize) -> u8;

    /// Stage one byte. Writes beyond `capacity` fail.
    ///
    /// # Errors
    ///
    /// Returns the medium's error if the address is out of range.
    fn write(&mut self, address: usize, byte: u8) -> Result<(), Self::Error>;

    /// Flush staged writes to the medium.
    ///
    /// # Errors
    ///
    /// Returns the medium's error if the flush fails.
    fn commit(&mut self) -> Result<(), Self::Error>;
}
