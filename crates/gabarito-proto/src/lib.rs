//! Gabarito wire and storage formats.
//!
//! Everything in this crate is pure data: card identifiers, the template and
//! piece records, the byte layout the registry is persisted in, and the
//! grammar of the operator console. No I/O and no time.
//!
//! # Components
//!
//! - [`Identifier`]: 4-byte card identifier with byte-exact comparison
//! - [`PieceName`]: 20-byte bounded display name
//! - [`Template`], [`Piece`], [`RegistryImage`]: durable records
//! - [`codec`]: position-defined persistence layout with CRC-32 trailer
//! - [`Command`]: console command grammar

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod command;
pub mod error;
pub mod identifier;
pub mod name;
pub mod record;

pub use codec::{CodecLimits, decode, decode_medium, encode, encoded_len};
pub use command::Command;
pub use error::{CodecError, CommandError, IdentifierError};
pub use identifier::{Identifier, UID_SIZE};
pub use name::{MAX_NAME_LENGTH, PieceName};
pub use record::{MAX_PIECES, Piece, RegistryImage, Template};
