//! Simulated station.
//!
//! A [`StationDriver`] wired to bench readers and button, recording outputs,
//! and a [`SimEnv`] clock. Every input helper applies the input, then runs
//! one poll cycle exactly like the station runtime's tick.

use std::time::Duration;

use gabarito_core::{Indicator, Kiosk, KioskConfig, ReaderId};
use gabarito_proto::Identifier;
use gabarito_station::{
    InputPoller, MemoryStorage, OutputSink, StationAction, StationDriver, StationError,
    StationEvent, Storage,
    bench::{BenchButton, BenchReader},
};

use crate::{
    devices::{RecordingDisplay, RecordingIndicators},
    sim_env::SimEnv,
};

/// A whole station under a virtual clock.
pub struct SimStation<S: Storage + Clone = MemoryStorage> {
    env: SimEnv,
    config: KioskConfig,
    medium: S,
    driver: StationDriver<SimEnv, S>,
    poller: InputPoller<BenchReader, BenchButton>,
    outputs: OutputSink<RecordingDisplay, RecordingIndicators>,
    console: Vec<String>,
    boots: usize,
}

impl SimStation<MemoryStorage> {
    /// Boot on a fresh, never-written memory medium.
    pub fn new(config: KioskConfig) -> Result<Self, StationError> {
        Self::boot(SimEnv::new(), config, MemoryStorage::new())
    }
}

impl<S: Storage + Clone> SimStation<S> {
    /// Boot on `medium`. Clones of `medium` must share its contents so a
    /// restart sees what the previous boot wrote.
    pub fn boot(env: SimEnv, config: KioskConfig, medium: S) -> Result<Self, StationError> {
        let (driver, actions) = StationDriver::boot(env.clone(), medium.clone(), config.clone())?;

        let mut station = Self {
            poller: InputPoller::new(readers(&config), BenchButton::default()),
            outputs: OutputSink::new(RecordingDisplay::default(), RecordingIndicators::default()),
            console: Vec::new(),
            env,
            config,
            medium,
            driver,
            boots: 1,
        };
        station.apply(actions);
        Ok(station)
    }

    /// Power-cycle: drop the kiosk and boot again from the same medium.
    ///
    /// The clock keeps running; devices come back idle.
    pub fn restart(&mut self) -> Result<(), StationError> {
        tracing::debug!(boots = self.boots, "power cycle");
        let (driver, actions) =
            StationDriver::boot(self.env.clone(), self.medium.clone(), self.config.clone())?;

        self.driver = driver;
        self.poller = InputPoller::new(readers(&self.config), BenchButton::default());
        self.outputs = OutputSink::new(RecordingDisplay::default(), RecordingIndicators::default());
        self.boots += 1;
        self.apply(actions);
        Ok(())
    }

    /// Put a card in a reader's field and poll.
    ///
    /// A card for a reader this station does not have is dropped.
    pub fn present(&mut self, reader: ReaderId, identifier: Identifier) {
        match self.poller.readers_mut().find(|(id, _)| *id == reader) {
            Some((_, device)) => device.present(identifier),
            None => tracing::debug!(?reader, "no such reader, card dropped"),
        }
        self.step();
    }

    /// Type a line on the operator console.
    pub fn type_line(&mut self, line: &str) {
        self.deliver(StationEvent::ConsoleLine(line.to_owned()));
    }

    /// Send a line on the auxiliary identifier channel.
    pub fn aux(&mut self, line: &str) {
        self.deliver(StationEvent::AuxLine(line.to_owned()));
    }

    /// Press the button and poll.
    pub fn press(&mut self) {
        self.poller.button_mut().set(true);
        self.step();
    }

    /// Release the button and poll.
    pub fn release(&mut self) {
        self.poller.button_mut().set(false);
        self.step();
    }

    /// Move the clock forward, then poll.
    pub fn advance(&mut self, by: Duration) {
        self.env.advance(by);
        self.step();
    }

    /// One poll cycle: device edges, then a scheduler tick.
    pub fn step(&mut self) {
        let mut events = self.poller.poll();
        events.push(StationEvent::Tick);
        for event in events {
            self.deliver(event);
        }
    }

    /// The kiosk.
    pub fn kiosk(&self) -> &Kiosk<Duration> {
        self.driver.kiosk()
    }

    /// The driver.
    pub fn driver(&self) -> &StationDriver<SimEnv, S> {
        &self.driver
    }

    /// The shared medium.
    pub fn medium(&self) -> &S {
        &self.medium
    }

    /// The clock.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// The status display.
    pub fn display(&self) -> &RecordingDisplay {
        self.outputs.display()
    }

    /// Current level of an indicator line.
    pub fn indicator(&self, indicator: Indicator) -> bool {
        self.outputs.indicators().level(indicator)
    }

    /// Console lines written since the last [`take_console`](Self::take_console).
    pub fn console(&self) -> &[String] {
        &self.console
    }

    /// Drain the console transcript.
    pub fn take_console(&mut self) -> Vec<String> {
        std::mem::take(&mut self.console)
    }

    /// Number of boots so far, including the first.
    pub fn boots(&self) -> usize {
        self.boots
    }

    fn deliver(&mut self, event: StationEvent) {
        let actions = self.driver.process_event(event);
        self.apply(actions);
    }

    fn apply(&mut self, actions: Vec<StationAction>) {
        let lines = self.outputs.apply(actions);
        self.console.extend(lines);
    }
}

fn readers(config: &KioskConfig) -> Vec<(ReaderId, BenchReader)> {
    let mut readers = vec![(ReaderId::Primary, BenchReader::new())];
    if config.piece_reader == ReaderId::Secondary {
        readers.push((ReaderId::Secondary, BenchReader::new()));
    }
    readers
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MASTER: Identifier = Identifier::new([0xCA, 0xFE, 0x00, 0x01]);

    #[test]
    fn first_card_enrolls_and_survives_restart() {
        let mut station = SimStation::new(KioskConfig::default()).unwrap();
        assert!(station.display().has_shown("Sem master", "Aprox. cartao"));

        station.present(ReaderId::Primary, MASTER);
        station.restart().unwrap();

        assert_eq!(station.boots(), 2);
        assert_eq!(station.kiosk().registry().master(), Some(MASTER));
        assert_eq!(station.display().current(), Some(("Lista vazia", "Cadastre antes")));
    }

    #[test]
    fn missing_reader_drops_card() {
        let config = KioskConfig { piece_reader: ReaderId::Primary, ..KioskConfig::default() };
        let mut station = SimStation::new(config).unwrap();

        station.present(ReaderId::Secondary, MASTER);

        assert_eq!(station.kiosk().registry().master(), None);
    }
}
