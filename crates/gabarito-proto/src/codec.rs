//! Persistence codec.
//!
//! The registry is stored as one linear, position-defined byte stream that is
//! rewritten from offset 0 on every durable change:
//!
//! ```text
//! +--------+-------+---------------------------------------------+--------+
//! | master | count | template * count                            | crc32  |
//! | 4 B    | 1 B   | uid 4 B | pieces 1 B | (uid 4 B, name 20 B)*| 4 B LE |
//! +--------+-------+---------------------------------------------+--------+
//! ```
//!
//! The trailing CRC-32 covers every preceding byte. A rewrite torn by power
//! loss therefore fails to decode instead of yielding a truncated or
//! duplicated registry.
//!
//! # Invariants
//!
//! - `decode(encode(image)) == image` for every image whose templates each
//!   hold `1..=max_pieces` pieces and whose template count is within
//!   `max_templates`.
//! - Name fields are always zero-filled on encode.
//! - Decode never reads past the declared counts and never accepts counts
//!   above the configured limits.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{
    error::CodecError,
    identifier::{Identifier, UID_SIZE},
    name::{MAX_NAME_LENGTH, PieceName},
    record::{MAX_PIECES, Piece, RegistryImage, Template},
};

/// Size of the fixed header (master identifier + template count).
pub const HEADER_SIZE: usize = UID_SIZE + 1;

/// Size of a template header (identifier + piece count).
pub const TEMPLATE_HEADER_SIZE: usize = UID_SIZE + 1;

/// Size of one stored piece record.
pub const PIECE_RECORD_SIZE: usize = UID_SIZE + MAX_NAME_LENGTH;

/// Size of the checksum trailer.
pub const TRAILER_SIZE: usize = 4;

/// Fixed on-medium layout of a piece.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct PieceRecord {
    /// Piece card identifier.
    pub identifier: [u8; UID_SIZE],
    /// Zero-filled name field.
    pub name: [u8; MAX_NAME_LENGTH],
}

impl From<&Piece> for PieceRecord {
    fn from(piece: &Piece) -> Self {
        Self { identifier: *piece.identifier.as_bytes(), name: piece.name.to_field() }
    }
}

impl From<&PieceRecord> for Piece {
    fn from(record: &PieceRecord) -> Self {
        Self {
            identifier: Identifier::new(record.identifier),
            name: PieceName::from_field(&record.name),
        }
    }
}

/// Capacity bounds enforced on both encode and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecLimits {
    /// Maximum number of templates (at most 255, the count is one byte).
    pub max_templates: usize,
    /// Maximum pieces per template (at most 255).
    pub max_pieces: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self { max_templates: 100, max_pieces: MAX_PIECES }
    }
}

/// Number of bytes `encode` produces for an image.
pub fn encoded_len(image: &RegistryImage) -> usize {
    HEADER_SIZE
        + image
            .templates
            .iter()
            .map(|t| TEMPLATE_HEADER_SIZE + t.pieces.len() * PIECE_RECORD_SIZE)
            .sum::<usize>()
        + TRAILER_SIZE
}

/// Encode a registry image.
///
/// An absent master is written as four zero bytes.
///
/// # Errors
///
/// - `CodecError::CapacityExceeded` if the image holds more templates or
///   pieces than `limits` allow
/// - `CodecError::EmptyTemplate` if a template has no pieces
pub fn encode(image: &RegistryImage, limits: CodecLimits) -> Result<Bytes, CodecError> {
    let template_count = checked_count("templates", image.templates.len(), limits.max_templates)?;

    let mut buf = BytesMut::with_capacity(encoded_len(image));
    let master = image.master.unwrap_or_default();
    buf.put_slice(master.as_bytes());
    buf.put_u8(template_count);

    for (position, template) in image.templates.iter().enumerate() {
        if template.pieces.is_empty() {
            return Err(CodecError::EmptyTemplate { position });
        }
        let piece_count = checked_count("pieces", template.pieces.len(), limits.max_pieces)?;

        buf.put_slice(template.identifier.as_bytes());
        buf.put_u8(piece_count);
        for piece in &template.pieces {
            buf.put_slice(PieceRecord::from(piece).as_bytes());
        }
    }

    let checksum = crc32fast::hash(&buf);
    buf.put_u32_le(checksum);

    Ok(buf.freeze())
}

/// Decode a registry image.
///
/// Bytes after the trailer are ignored, so a whole byte-addressable medium can
/// be passed in.
///
/// # Errors
///
/// - `CodecError::Truncated` if the input ends before the declared structure
/// - `CodecError::CapacityExceeded` if a declared count exceeds `limits`
/// - `CodecError::EmptyTemplate` if a template declares zero pieces
/// - `CodecError::ChecksumMismatch` if the trailer does not match
pub fn decode(bytes: &[u8], limits: CodecLimits) -> Result<RegistryImage, CodecError> {
    let mut cursor = bytes;

    let master = take_identifier(&mut cursor, "master")?;
    let template_count = usize::from(take_u8(&mut cursor, "template count")?);
    if template_count > limits.max_templates {
        return Err(CodecError::CapacityExceeded {
            what: "templates",
            declared: template_count,
            capacity: limits.max_templates,
        });
    }

    let mut templates = Vec::with_capacity(template_count);
    for position in 0..template_count {
        let identifier = take_identifier(&mut cursor, "template identifier")?;
        let piece_count = usize::from(take_u8(&mut cursor, "piece count")?);
        if piece_count == 0 {
            return Err(CodecError::EmptyTemplate { position });
        }
        if piece_count > limits.max_pieces {
            return Err(CodecError::CapacityExceeded {
                what: "pieces",
                declared: piece_count,
                capacity: limits.max_pieces,
            });
        }

        let mut pieces = Vec::with_capacity(piece_count);
        for _ in 0..piece_count {
            let (record, rest) = PieceRecord::ref_from_prefix(cursor).map_err(|_| {
                CodecError::Truncated {
                    field: "piece record",
                    needed: PIECE_RECORD_SIZE,
                    available: cursor.len(),
                }
            })?;
            pieces.push(Piece::from(record));
            cursor = rest;
        }

        templates.push(Template { identifier, pieces });
    }

    let body_len = bytes.len() - cursor.remaining();
    ensure_remaining(cursor, "checksum", TRAILER_SIZE)?;
    let stored = cursor.get_u32_le();
    let computed = crc32fast::hash(&bytes[..body_len]);
    if stored != computed {
        return Err(CodecError::ChecksumMismatch { stored, computed });
    }

    let master = (!master.is_blank()).then_some(master);
    Ok(RegistryImage { master, templates })
}

/// Decode the full contents of a storage medium.
///
/// A freshly erased medium (header all `0x00` or all `0xFF`, or no bytes at
/// all) is an empty registry with no master rather than a corrupt one.
pub fn decode_medium(bytes: &[u8], limits: CodecLimits) -> Result<RegistryImage, CodecError> {
    if is_erased(bytes) {
        return Ok(RegistryImage::empty());
    }
    decode(bytes, limits)
}

fn is_erased(bytes: &[u8]) -> bool {
    let header = &bytes[..bytes.len().min(HEADER_SIZE)];
    header.iter().all(|&b| b == 0x00) || header.iter().all(|&b| b == 0xFF)
}

fn checked_count(what: &'static str, count: usize, capacity: usize) -> Result<u8, CodecError> {
    let capacity = capacity.min(usize::from(u8::MAX));
    if count > capacity {
        return Err(CodecError::CapacityExceeded { what, declared: count, capacity });
    }
    u8::try_from(count).map_err(|_| CodecError::CapacityExceeded {
        what,
        declared: count,
        capacity,
    })
}

fn ensure_remaining(cursor: &[u8], field: &'static str, needed: usize) -> Result<(), CodecError> {
    if cursor.remaining() < needed {
        return Err(CodecError::Truncated { field, needed, available: cursor.remaining() });
    }
    Ok(())
}

fn take_u8(cursor: &mut &[u8], field: &'static str) -> Result<u8, CodecError> {
    ensure_remaining(*cursor, field, 1)?;
    Ok(cursor.get_u8())
}

fn take_identifier(cursor: &mut &[u8], field: &'static str) -> Result<Identifier, CodecError> {
    ensure_remaining(*cursor, field, UID_SIZE)?;
    let mut raw = [0u8; UID_SIZE];
    cursor.copy_to_slice(&mut raw);
    Ok(Identifier::new(raw))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;

    use super::*;

    fn id(bytes: [u8; 4]) -> Identifier {
        Identifier::new(bytes)
    }

    fn sample_image() -> RegistryImage {
        RegistryImage {
            master: Some(id(hex!("CAFEBABE"))),
            templates: vec![
                Template {
                    identifier: id(hex!("00000001")),
                    pieces: vec![
                        Piece::new(id(hex!("10000001")), "alpha"),
                        Piece::new(id(hex!("10000002")), "beta"),
                    ],
                },
                Template {
                    identifier: id(hex!("00000002")),
                    pieces: vec![Piece::new(id(hex!("20000001")), "gamma")],
                },
            ],
        }
    }

    #[test]
    fn layout_is_position_defined() {
        let image = sample_image();
        let bytes = encode(&image, CodecLimits::default()).unwrap();

        assert_eq!(bytes.len(), encoded_len(&image));
        assert_eq!(&bytes[..4], &hex!("CAFEBABE"));
        assert_eq!(bytes[4], 2);
        assert_eq!(&bytes[5..9], &hex!("00000001"));
        assert_eq!(bytes[9], 2);
        assert_eq!(&bytes[10..14], &hex!("10000001"));
        assert_eq!(&bytes[14..19], b"alpha");
    }

    #[test]
    fn name_fields_are_zero_filled() {
        let bytes = encode(&sample_image(), CodecLimits::default()).unwrap();
        let first_name = &bytes[14..14 + MAX_NAME_LENGTH];
        assert!(first_name[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn absent_master_encodes_as_zeros() {
        let image = RegistryImage::empty();
        let bytes = encode(&image, CodecLimits::default()).unwrap();
        assert_eq!(&bytes[..5], &[0, 0, 0, 0, 0]);
        assert_eq!(decode(&bytes, CodecLimits::default()).unwrap(), image);
    }

    #[test]
    fn ff_master_decodes_as_absent() {
        let mut body = vec![0xFF, 0xFF, 0xFF, 0xFF, 0];
        let crc = crc32fast::hash(&body);
        body.extend_from_slice(&crc.to_le_bytes());

        let image = decode(&body, CodecLimits::default()).unwrap();
        assert_eq!(image.master, None);
    }

    #[test]
    fn trailing_medium_bytes_are_ignored() {
        let image = sample_image();
        let mut medium = encode(&image, CodecLimits::default()).unwrap().to_vec();
        medium.resize(2048, 0xAB);

        assert_eq!(decode(&medium, CodecLimits::default()).unwrap(), image);
    }

    #[test]
    fn any_flipped_byte_is_detected() {
        let bytes = encode(&sample_image(), CodecLimits::default()).unwrap();

        for i in 0..bytes.len() {
            let mut corrupted = bytes.to_vec();
            corrupted[i] ^= 0x01;
            assert!(
                decode(&corrupted, CodecLimits::default()).is_err(),
                "corruption at byte {i} went unnoticed"
            );
        }
    }

    #[test]
    fn torn_write_is_rejected() {
        let bytes = encode(&sample_image(), CodecLimits::default()).unwrap();
        let torn = &bytes[..bytes.len() - 10];

        assert!(matches!(
            decode(torn, CodecLimits::default()),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn declared_template_count_above_capacity_fails() {
        let limits = CodecLimits { max_templates: 1, max_pieces: MAX_PIECES };
        let bytes = encode(&sample_image(), CodecLimits::default()).unwrap();

        assert_eq!(
            decode(&bytes, limits).unwrap_err(),
            CodecError::CapacityExceeded { what: "templates", declared: 2, capacity: 1 }
        );
    }

    #[test]
    fn declared_piece_count_above_capacity_fails() {
        let limits = CodecLimits { max_templates: 100, max_pieces: 1 };
        let bytes = encode(&sample_image(), CodecLimits::default()).unwrap();

        assert!(matches!(
            decode(&bytes, limits),
            Err(CodecError::CapacityExceeded { what: "pieces", .. })
        ));
    }

    #[test]
    fn encode_rejects_empty_template() {
        let image = RegistryImage {
            master: None,
            templates: vec![Template::new(id(hex!("01020304")))],
        };

        assert_eq!(
            encode(&image, CodecLimits::default()).unwrap_err(),
            CodecError::EmptyTemplate { position: 0 }
        );
    }

    #[test]
    fn decode_rejects_zero_piece_template() {
        let mut body = vec![0xCA, 0xFE, 0xBA, 0xBE, 1, 1, 2, 3, 4, 0];
        let crc = crc32fast::hash(&body);
        body.extend_from_slice(&crc.to_le_bytes());

        assert_eq!(
            decode(&body, CodecLimits::default()).unwrap_err(),
            CodecError::EmptyTemplate { position: 0 }
        );
    }

    #[test]
    fn erased_medium_is_empty_registry() {
        let limits = CodecLimits::default();
        assert_eq!(decode_medium(&[0xFF; 2048], limits).unwrap(), RegistryImage::empty());
        assert_eq!(decode_medium(&[0x00; 2048], limits).unwrap(), RegistryImage::empty());
        assert_eq!(decode_medium(&[], limits).unwrap(), RegistryImage::empty());
    }

    #[test]
    fn removal_then_roundtrip_keeps_order() {
        let mut image = sample_image();
        image.templates.insert(
            1,
            Template {
                identifier: id(hex!("000000BB")),
                pieces: vec![Piece::new(id(hex!("B0000001")), "b")],
            },
        );
        image.templates.remove(1);

        let decoded =
            decode(&encode(&image, CodecLimits::default()).unwrap(), CodecLimits::default())
                .unwrap();
        let ids: Vec<_> = decoded.templates.iter().map(|t| t.identifier).collect();
        assert_eq!(ids, vec![id(hex!("00000001")), id(hex!("00000002"))]);
    }

    fn arb_piece() -> impl Strategy<Value = Piece> {
        (any::<[u8; 4]>(), "[a-zA-Z0-9 ]{1,20}")
            .prop_map(|(uid, name)| Piece::new(Identifier::new(uid), name.as_str()))
    }

    fn arb_template() -> impl Strategy<Value = Template> {
        (any::<[u8; 4]>(), prop::collection::vec(arb_piece(), 1..=MAX_PIECES))
            .prop_map(|(uid, pieces)| Template { identifier: Identifier::new(uid), pieces })
    }

    fn arb_master() -> impl Strategy<Value = Option<Identifier>> {
        prop::option::of(
            any::<[u8; 4]>()
                .prop_map(Identifier::new)
                .prop_filter("blank masters read back as absent", |m| !m.is_blank()),
        )
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            master in arb_master(),
            templates in prop::collection::vec(arb_template(), 0..20),
        ) {
            let image = RegistryImage { master, templates };
            let limits = CodecLimits::default();

            let bytes = encode(&image, limits).unwrap();
            prop_assert_eq!(bytes.len(), encoded_len(&image));
            prop_assert_eq!(decode(&bytes, limits).unwrap(), image);
        }

        #[test]
        fn prop_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
            let _ = decode(&bytes, CodecLimits::default());
            let _ = decode_medium(&bytes, CodecLimits::default());
        }
    }
}
