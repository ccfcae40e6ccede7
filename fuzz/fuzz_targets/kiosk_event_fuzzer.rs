//! Fuzz target for the kiosk state machine
//!
//! Keep the registry consistent under any operator input sequence.
//!
//! # Strategy
//!
//! - Event sequences: cards on either reader, console lines from a small
//!   vocabulary plus raw text, aux lines, button edges, ticks
//! - Storage feedback: writes succeed or fail at random
//! - Timeout testing: advance time to trip verification deadlines
//!
//! # Invariants
//!
//! - NEVER panic on any input
//! - No committed template is ever empty or over capacity
//! - Every emitted image decodes to the live registry
//! - Registration and verification are never active at once

#![no_main]

use std::{ops::Sub, time::Duration};

use arbitrary::Arbitrary;
use gabarito_core::{Kiosk, KioskAction, KioskConfig, KioskEvent, ReaderId, Registry, Session};
use gabarito_proto::{Identifier, decode};
use libfuzzer_sys::fuzz_target;

/// Represents time as Duration since epoch 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct FuzzInstant(Duration);

impl Sub for FuzzInstant {
    type Output = Duration;

    fn sub(self, other: Self) -> Duration {
        self.0.saturating_sub(other.0)
    }
}

const WORDS: [&str; 8] =
    ["modo cadastro", "modo operacao", "modo producao", "fim", "limpar", "apagar 1", "apagar 0", "peca"];

#[derive(Debug, Clone, Arbitrary)]
enum FuzzEvent {
    Card { secondary: bool, card: u8 },
    Word(u8),
    Console(String),
    Aux(String),
    AuxCard(u8),
    Press,
    Release,
    Tick { advance_ms: u16 },
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    /// Bit `i % 64` set fails the `i`-th write.
    write_failures: u64,
    single_reader: bool,
    events: Vec<FuzzEvent>,
}

/// Small card space so templates, pieces and the master collide.
fn card(seed: u8) -> Identifier {
    Identifier::new([0, 0, 0, seed % 12])
}

fuzz_target!(|input: FuzzInput| {
    let config = KioskConfig {
        max_templates: 4,
        max_pieces: 3,
        piece_reader: if input.single_reader { ReaderId::Primary } else { ReaderId::Secondary },
        ..KioskConfig::default()
    };
    let limits = config.codec_limits();
    let registry = Registry::new(config.registry_limits());
    let (mut kiosk, _) = Kiosk::new(config, registry);

    let mut now = FuzzInstant(Duration::ZERO);
    let mut writes = 0u32;

    for event in input.events {
        let event = match event {
            FuzzEvent::Card { secondary, card: seed } => KioskEvent::CardPresented {
                reader: if secondary { ReaderId::Secondary } else { ReaderId::Primary },
                identifier: card(seed),
                now,
            },
            FuzzEvent::Word(i) => KioskEvent::ConsoleLine {
                line: WORDS[usize::from(i) % WORDS.len()].to_owned(),
                now,
            },
            FuzzEvent::Console(line) => KioskEvent::ConsoleLine { line, now },
            FuzzEvent::Aux(line) => KioskEvent::AuxLine { line, now },
            FuzzEvent::AuxCard(seed) => KioskEvent::AuxLine { line: card(seed).to_hex(), now },
            FuzzEvent::Press => KioskEvent::ButtonPressed { now },
            FuzzEvent::Release => KioskEvent::ButtonReleased { now },
            FuzzEvent::Tick { advance_ms } => {
                now = FuzzInstant(now.0 + Duration::from_millis(u64::from(advance_ms)));
                KioskEvent::Tick { now }
            },
        };

        let mut pending = kiosk.handle(event);
        while let Some(action) = pending.pop() {
            let (revision, image) = match action {
                KioskAction::Persist { revision, image } | KioskAction::Wipe { revision, image } => {
                    (revision, image)
                },
                _ => continue,
            };

            let stored = decode(&image, limits).expect("emitted image must decode");
            assert_eq!(stored, kiosk.registry().image());

            let fail = input.write_failures & (1 << (writes % 64)) != 0;
            writes += 1;
            pending.extend(kiosk.handle(if fail {
                KioskEvent::StorageFailed { reason: "fuzz".to_owned() }
            } else {
                KioskEvent::StorageWritten { revision }
            }));
        }

        for template in kiosk.registry().templates() {
            assert!(!template.pieces.is_empty(), "empty template committed");
            assert!(template.pieces.len() <= 3);
        }
        assert!(kiosk.registry().len() <= 4);

        match kiosk.session() {
            Session::Registration(_) => assert!(kiosk.registry().has_master()),
            Session::Verification(_) => assert!(kiosk.registry().has_master()),
            Session::EnrollMaster => assert!(!kiosk.registry().has_master()),
            Session::Recovery => unreachable!("a loaded registry never needs recovery"),
        }
    }
});
