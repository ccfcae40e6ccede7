//! Station scenarios
//!
//! Whole-station behaviour under the virtual clock: what the operator sees
//! on the display, indicators and console, and what survives a power cycle.

use std::time::Duration;

use gabarito_core::{Indicator, KioskConfig, Mode, ReaderId, Session, VerificationOutcome};
use gabarito_harness::{MASTER, SimEnv, SimStation};
use gabarito_proto::{CodecLimits, Identifier, decode};
use gabarito_station::{FileStorage, MemoryStorage, Storage};

const A: Identifier = Identifier::new([0x10, 0x00, 0x00, 0x0A]);
const B: Identifier = Identifier::new([0x10, 0x00, 0x00, 0x0B]);
const C: Identifier = Identifier::new([0x10, 0x00, 0x00, 0x0C]);
const X: Identifier = Identifier::new([0xA0, 0x00, 0x00, 0x01]);
const Y: Identifier = Identifier::new([0xA0, 0x00, 0x00, 0x02]);
const STRAY: Identifier = Identifier::new([0xEE, 0xEE, 0xEE, 0xEE]);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn enrolled(config: KioskConfig) -> SimStation {
    let mut station = SimStation::new(config).unwrap();
    station.present(ReaderId::Primary, MASTER);
    station
}

/// Register `template` with pieces named after their position.
fn register<S: Storage + Clone>(station: &mut SimStation<S>, template: Identifier, pieces: &[(Identifier, &str)]) {
    station.type_line("modo cadastro");
    station.present(ReaderId::Primary, MASTER);
    station.present(ReaderId::Primary, template);
    for (piece, name) in pieces {
        station.present(ReaderId::Primary, *piece);
        station.type_line(name);
    }
    station.type_line("fim");
    station.type_line("modo operacao");
}

fn kit_station() -> SimStation {
    let mut station = enrolled(KioskConfig::default());
    register(&mut station, A, &[(X, "alpha"), (Y, "beta")]);
    station
}

fn outcome<S: Storage + Clone>(station: &SimStation<S>) -> Option<VerificationOutcome> {
    match station.kiosk().session() {
        Session::Verification(session) => session.last_outcome(),
        _ => None,
    }
}

fn remaining(station: &SimStation) -> usize {
    match station.kiosk().session() {
        Session::Verification(session) => session.remaining().map_or(0, |set| set.len()),
        _ => 0,
    }
}

fn stored_templates(station: &SimStation) -> Vec<Identifier> {
    let image = decode(&station.medium().image().unwrap(), CodecLimits::default()).unwrap();
    image.templates.iter().map(|t| t.identifier).collect()
}

#[test]
fn complete_kit_lights_success_until_release() {
    let mut station = kit_station();

    station.present(ReaderId::Primary, A);
    station.present(ReaderId::Secondary, X);
    station.present(ReaderId::Secondary, Y);

    assert_eq!(outcome(&station), Some(VerificationOutcome::Completed));
    assert!(station.indicator(Indicator::Success));
    assert_eq!(station.display().current(), Some(("Kit completo", "Solte o botao")));

    // Acknowledging does not toggle the mode
    station.press();
    assert_eq!(station.kiosk().mode(), Some(Mode::Operation));
    assert!(station.indicator(Indicator::Success));

    station.release();
    assert!(!station.indicator(Indicator::Success));
    assert_eq!(outcome(&station), Some(VerificationOutcome::Released));
    assert_eq!(station.display().current(), Some(("Modo Operacao", "Leia o gabarito")));
}

#[test]
fn repeated_and_stray_pieces_do_not_count() {
    let mut station = kit_station();
    station.present(ReaderId::Primary, A);

    station.present(ReaderId::Secondary, X);
    station.present(ReaderId::Secondary, X);
    assert_eq!(outcome(&station), Some(VerificationOutcome::AlreadyRead));
    assert_eq!(station.display().current(), Some(("Peca ja lida", "alpha")));
    assert_eq!(remaining(&station), 1);

    station.present(ReaderId::Secondary, STRAY);
    assert_eq!(outcome(&station), Some(VerificationOutcome::Incorrect));
    assert!(station.indicator(Indicator::Fault));
    assert_eq!(remaining(&station), 1);

    station.present(ReaderId::Secondary, Y);
    assert_eq!(outcome(&station), Some(VerificationOutcome::Completed));
    assert!(!station.indicator(Indicator::Fault));
}

#[test]
fn missing_piece_times_out_after_deadline() {
    let mut station = kit_station();
    station.present(ReaderId::Primary, A);
    station.present(ReaderId::Secondary, X);

    station.advance(ms(19_990));
    assert_eq!(remaining(&station), 1);

    station.advance(ms(10));

    assert_eq!(outcome(&station), Some(VerificationOutcome::TimedOut));
    assert_eq!(station.display().current(), Some(("Tempo esgotado", "Leia o gabarito")));
    assert!(!station.indicator(Indicator::Success));

    // Late piece is not credited to the expired kit
    station.present(ReaderId::Secondary, Y);
    assert_ne!(outcome(&station), Some(VerificationOutcome::Completed));
}

#[test]
fn unknown_template_card_is_reported() {
    let mut station = kit_station();

    station.present(ReaderId::Primary, STRAY);

    assert_eq!(outcome(&station), Some(VerificationOutcome::TemplateUnknown));
    assert_eq!(station.display().current(), Some(("Erro", "Nao reconhecido")));
}

#[test]
fn button_toggle_discards_uncommitted_template() {
    let mut station = kit_station();
    let written = station.medium().write_count();

    station.press();
    station.release();
    assert_eq!(station.kiosk().mode(), Some(Mode::Registration));
    station.present(ReaderId::Primary, MASTER);
    station.present(ReaderId::Primary, B);
    station.present(ReaderId::Primary, X);
    station.type_line("gamma");

    station.advance(ms(500));
    station.press();
    station.release();

    assert_eq!(station.kiosk().mode(), Some(Mode::Operation));
    assert!(!station.kiosk().registry().has_pending());
    assert_eq!(station.kiosk().registry().find_template_by_identifier(&B), None);
    assert_eq!(station.medium().write_count(), written);
    assert_eq!(stored_templates(&station), vec![A]);
}

#[test]
fn button_edges_50ms_apart_toggle_once() {
    let mut station = kit_station();

    station.press();
    station.env().advance(ms(25));
    station.release();
    station.env().advance(ms(25));
    station.press();

    assert_eq!(station.kiosk().mode(), Some(Mode::Registration));
}

#[test]
fn button_edges_300ms_apart_toggle_twice() {
    let mut station = kit_station();

    station.press();
    station.advance(ms(150));
    station.release();
    station.advance(ms(150));
    station.press();

    assert_eq!(station.kiosk().mode(), Some(Mode::Operation));
}

#[test]
fn deletion_compacts_and_survives_restart() {
    let mut station = kit_station();
    register(&mut station, B, &[(X, "x")]);
    register(&mut station, C, &[(Y, "y")]);

    station.type_line("apagar 2");
    assert_eq!(stored_templates(&station), vec![A, C]);

    station.restart().unwrap();

    let live: Vec<_> = station.kiosk().registry().templates().iter().map(|t| t.identifier).collect();
    assert_eq!(live, vec![A, C]);
    assert!(station.console().iter().any(|line| line == "Gabarito pronto: 2 gabaritos cadastrados"));
}

#[test]
fn wipe_twice_matches_wipe_once() {
    let mut station = kit_station();

    station.type_line("limpar");
    let once = station.medium().image();
    station.type_line("limpar");
    let twice = station.medium().image();

    assert_eq!(once, twice);
    assert!(stored_templates(&station).is_empty());
    assert_eq!(station.kiosk().registry().master(), Some(MASTER));
    assert_eq!(station.display().current(), Some(("Memoria limpa", "Dados apagados")));
}

#[test]
fn aux_channel_registers_pieces() {
    let mut station = enrolled(KioskConfig::default());
    station.type_line("modo cadastro");
    station.present(ReaderId::Primary, MASTER);
    station.present(ReaderId::Primary, A);

    station.aux("zz");
    assert!(station.console().iter().any(|line| line == "Formato UID invalido recebido via Serial2."));

    station.aux(&X.to_hex());
    station.type_line("alpha");
    station.type_line("fim");

    let template = station.kiosk().registry().template(0).unwrap();
    assert_eq!(template.pieces[0].identifier, X);
    assert_eq!(template.pieces[0].name.as_str(), "alpha");
}

#[test]
fn single_reader_station_verifies_on_primary() {
    let config = KioskConfig {
        piece_reader: ReaderId::Primary,
        verification_timeout: Duration::from_secs(60),
        ..KioskConfig::default()
    };
    let mut station = enrolled(config);
    register(&mut station, A, &[(X, "alpha")]);

    station.present(ReaderId::Primary, A);
    station.advance(Duration::from_secs(30));
    station.present(ReaderId::Primary, X);

    assert_eq!(outcome(&station), Some(VerificationOutcome::Completed));
}

#[test]
fn corrupt_medium_waits_for_limpar_before_reenrolling() {
    let env = SimEnv::new();
    let medium = MemoryStorage::new();
    let mut station = SimStation::boot(env, KioskConfig::default(), medium.clone()).unwrap();
    station.present(ReaderId::Primary, MASTER);

    let mut image = medium.image().unwrap();
    let last = image.len() - 1;
    image[last] ^= 0xFF;
    medium.corrupt(image);
    station.restart().unwrap();

    assert!(station.kiosk().is_degraded());
    assert_eq!(station.kiosk().mode(), None);
    assert!(station.display().has_shown("Falha memoria", "Modo degradado"));

    // Cards do nothing until the operator discards the unreadable image
    station.present(ReaderId::Primary, MASTER);
    assert_eq!(station.kiosk().registry().master(), None);
    assert!(station.kiosk().is_recovering());

    station.type_line("limpar");
    assert!(!station.kiosk().is_degraded());
    station.present(ReaderId::Primary, MASTER);
    assert_eq!(station.kiosk().mode(), Some(Mode::Operation));
}

#[test]
fn file_medium_keeps_kits_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let medium = FileStorage::new(dir.path().join("gabarito.bin"));
    let mut station = SimStation::boot(SimEnv::new(), KioskConfig::default(), medium.clone()).unwrap();
    station.present(ReaderId::Primary, MASTER);
    register(&mut station, A, &[(X, "alpha"), (Y, "beta")]);

    station.restart().unwrap();

    let stored = decode(&medium.load().unwrap().unwrap(), CodecLimits::default()).unwrap();
    assert_eq!(stored.master, Some(MASTER));
    assert_eq!(stored.templates.len(), 1);
    assert_eq!(stored.templates[0].pieces[1].name.as_str(), "beta");
    assert_eq!(station.kiosk().registry().templates(), stored.templates.as_slice());

    station.present(ReaderId::Primary, A);
    station.present(ReaderId::Secondary, X);
    station.present(ReaderId::Secondary, Y);
    assert_eq!(outcome(&station), Some(VerificationOutcome::Completed));
}
