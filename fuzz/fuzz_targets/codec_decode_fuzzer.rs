//! Fuzz target for the registry image codec
//!
//! Reject corrupt media without panicking.
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary media contents, truncated images, bad trailers
//! - Tight limits: small capacities so count fields overflow them
//!
//! # Invariants
//!
//! - `decode` and `decode_medium` NEVER panic
//! - A decoded image respects the limits and has no zero-piece template
//! - Re-encoding a decoded image decodes to the same image

#![no_main]

use gabarito_proto::{CodecLimits, decode, decode_medium, encode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u8, u8, &[u8])| {
    let (max_templates, max_pieces, bytes) = input;
    let limits = CodecLimits {
        max_templates: usize::from(max_templates).max(1),
        max_pieces: usize::from(max_pieces % 16).max(1),
    };

    let _ = decode_medium(bytes, limits);

    let Ok(image) = decode(bytes, limits) else {
        return;
    };

    assert!(image.templates.len() <= limits.max_templates);
    for template in &image.templates {
        assert!(!template.pieces.is_empty(), "zero-piece template decoded");
        assert!(template.pieces.len() <= limits.max_pieces);
    }

    let reencoded = encode(&image, limits).expect("decoded image must re-encode");
    assert_eq!(decode(&reencoded, limits).expect("re-encoded image must decode"), image);
});
