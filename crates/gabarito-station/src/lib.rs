//! Gabarito kiosk station.
//!
//! Host side of the kiosk: storage backends, the driver that owns the kiosk
//! and its medium, device polling, and a bench runtime that stands in for the
//! reader, button, display and indicator hardware.
//!
//! ## Architecture
//!
//! ```text
//! gabarito-station
//!   ├─ SystemEnv       (production Environment impl)
//!   ├─ StationDriver   (owns Kiosk + Storage, executes persistence)
//!   ├─ InputPoller     (readers and button → StationEvent)
//!   ├─ OutputSink      (StationAction → display and indicators)
//!   ├─ Storage         (memory, EEPROM-style, file, chaotic)
//!   └─ bench           (feed-driven devices for host runs)
//! ```
//!
//! The runtime is one owner task. Console and feed lines arrive over
//! channels from reader tasks; the owner ticks, polls the devices, and
//! processes one event at a time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bench;
mod driver;
mod error;
mod output;
mod poll;
pub mod storage;
mod system_env;

use std::{path::PathBuf, time::Duration};

pub use driver::{StationAction, StationDriver, StationEvent};
pub use error::StationError;
use gabarito_core::{KioskConfig, ReaderId};
pub use output::OutputSink;
pub use poll::InputPoller;
pub use storage::{
    ChaoticStorage, EepromStorage, FileStorage, ImageFileByteStore, MemoryByteStore,
    MemoryStorage, Storage, StorageError,
};
pub use system_env::SystemEnv;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    sync::mpsc,
    time::MissedTickBehavior,
};

use crate::bench::{BenchButton, BenchReader, FeedLine, LogDisplay, LogIndicators};

/// Station runtime configuration.
#[derive(Debug, Clone)]
pub struct StationConfig {
    /// Kiosk behaviour.
    pub kiosk: KioskConfig,
    /// Device polling interval.
    pub tick: Duration,
    /// Bench feed file or FIFO, if any.
    pub feed: Option<PathBuf>,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self { kiosk: KioskConfig::default(), tick: Duration::from_millis(10), feed: None }
    }
}

/// Bench station: driver plus feed-driven devices.
pub struct Station<S: Storage> {
    driver: StationDriver<SystemEnv, S>,
    poller: InputPoller<BenchReader, BenchButton>,
    outputs: OutputSink<LogDisplay, LogIndicators>,
    config: StationConfig,
    boot_actions: Vec<StationAction>,
}

impl<S: Storage> Station<S> {
    /// Load the registry and boot the kiosk.
    ///
    /// # Errors
    ///
    /// Returns `StationError::Config` or `StationError::ZeroTick` if the
    /// configuration is invalid.
    pub fn boot(config: StationConfig, storage: S) -> Result<Self, StationError> {
        if config.tick.is_zero() {
            return Err(StationError::ZeroTick);
        }

        let mut readers = vec![(ReaderId::Primary, BenchReader::new())];
        if config.kiosk.piece_reader == ReaderId::Secondary {
            readers.push((ReaderId::Secondary, BenchReader::new()));
        }

        let (driver, boot_actions) =
            StationDriver::boot(SystemEnv::new(), storage, config.kiosk.clone())?;

        Ok(Self {
            driver,
            poller: InputPoller::new(readers, BenchButton::default()),
            outputs: OutputSink::new(LogDisplay, LogIndicators::default()),
            config,
            boot_actions,
        })
    }

    /// Run until interrupted.
    ///
    /// Console lines are read from stdin and answered on stdout.
    pub async fn run(mut self) -> Result<(), StationError> {
        let (console_tx, mut console_rx) = mpsc::channel(64);
        tokio::spawn(forward_lines("console", tokio::io::stdin(), console_tx));

        let (feed_tx, mut feed_rx) = mpsc::channel(64);
        if let Some(path) = &self.config.feed {
            let file = tokio::fs::File::open(path).await?;
            tracing::info!(path = %path.display(), "bench feed attached");
            tokio::spawn(forward_lines("feed", file, feed_tx));
        } else {
            drop(feed_tx);
        }

        let mut stdout = tokio::io::stdout();
        let mut interval = tokio::time::interval(self.config.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        let boot = std::mem::take(&mut self.boot_actions);
        write_console(&mut stdout, self.outputs.apply(boot)).await?;

        loop {
            let events = tokio::select! {
                _ = interval.tick() => {
                    let mut events = self.poller.poll();
                    events.push(StationEvent::Tick);
                    events
                },
                Some(line) = console_rx.recv() => vec![StationEvent::ConsoleLine(line)],
                Some(line) = feed_rx.recv() => self.feed_line(&line),
                _ = &mut shutdown => {
                    tracing::info!("shutting down");
                    return Ok(());
                },
            };

            for event in events {
                let actions = self.driver.process_event(event);
                write_console(&mut stdout, self.outputs.apply(actions)).await?;
            }
        }
    }

    /// The driver.
    pub fn driver(&self) -> &StationDriver<SystemEnv, S> {
        &self.driver
    }

    /// Apply one bench feed line to the devices and poll them.
    ///
    /// Events come out in feed order, so a scripted burst of lines behaves
    /// like the same inputs spread over time.
    pub fn feed_line(&mut self, line: &str) -> Vec<StationEvent> {
        let parsed = match FeedLine::parse(line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, "feed line ignored");
                return Vec::new();
            },
        };

        match parsed {
            FeedLine::Card { reader, identifier } => {
                match self.poller.readers_mut().find(|(id, _)| *id == reader) {
                    Some((_, device)) => device.present(identifier),
                    None => tracing::warn!(?reader, "no such reader on this station"),
                }
                self.poller.poll()
            },
            FeedLine::Aux(line) => {
                let mut events = self.poller.poll();
                events.push(StationEvent::AuxLine(line));
                events
            },
            FeedLine::Button { pressed } => {
                self.poller.button_mut().set(pressed);
                self.poller.poll()
            },
        }
    }
}

async fn forward_lines<R>(source: &'static str, reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(line).await.is_err() {
                    break;
                }
            },
            Ok(None) => {
                tracing::debug!(source, "input closed");
                break;
            },
            Err(err) => {
                tracing::warn!(source, error = %err, "input read failed");
                break;
            },
        }
    }
}

async fn write_console<W>(out: &mut W, lines: Vec<String>) -> Result<(), StationError>
where
    W: AsyncWrite + Unpin,
{
    if lines.is_empty() {
        return Ok(());
    }
    for line in lines {
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
    }
    out.flush().await?;
    Ok(())
}
