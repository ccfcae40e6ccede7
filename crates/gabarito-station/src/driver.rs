//! Station driver.
//!
//! The single owner of the kiosk and its storage. Every registry mutation and
//! the write that makes it durable happen inside one `process_event` call, so
//! there is exactly one writer to the medium.
//!
//! # Flow
//!
//! ```text
//! StationEvent ──stamp now──▶ Kiosk::handle ──▶ KioskAction
//!                                                 │
//!                     Persist / Wipe ─────────────┤──▶ Storage
//!                     StorageWritten/Failed ◀─────┘      │
//!                                                        ▼
//!                     Display / Console / Indicator ──▶ StationAction
//! ```

use std::collections::VecDeque;

use gabarito_core::{
    Environment, Indicator, Kiosk, KioskAction, KioskConfig, KioskEvent, ReaderId, Registry,
};
use gabarito_proto::{Identifier, decode_medium};

use crate::{
    error::StationError,
    storage::{Storage, StorageError},
};

/// Inputs observed by the station, not yet time-stamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationEvent {
    /// A card was read on a reader.
    CardPresented {
        /// Reader the card was seen on.
        reader: ReaderId,
        /// Card identifier.
        identifier: Identifier,
    },
    /// Operator console line.
    ConsoleLine(String),
    /// Auxiliary identifier channel line.
    AuxLine(String),
    /// Button went down.
    ButtonPressed,
    /// Button went up.
    ButtonReleased,
    /// Scheduler tick.
    Tick,
}

/// Device-facing effects for the runtime to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationAction {
    /// Overwrite the status display.
    Display {
        /// First line.
        line1: String,
        /// Second line.
        line2: String,
    },
    /// Write a console line.
    Console(String),
    /// Drive an indicator.
    Indicator {
        /// Output line.
        indicator: Indicator,
        /// Asserted or released.
        on: bool,
    },
}

/// Owner of one kiosk and its durable storage.
pub struct StationDriver<E: Environment, S: Storage> {
    env: E,
    storage: S,
    kiosk: Kiosk<E::Instant>,
}

impl<E: Environment, S: Storage> StationDriver<E, S> {
    /// Load the registry from `storage` and boot the kiosk.
    ///
    /// A medium that cannot be read or does not decode is not fatal: the
    /// kiosk boots degraded, in recovery, and leaves the medium alone until
    /// the operator discards it.
    ///
    /// # Errors
    ///
    /// Returns `StationError::Config` if `config` is invalid.
    pub fn boot(
        env: E,
        storage: S,
        config: KioskConfig,
    ) -> Result<(Self, Vec<StationAction>), StationError> {
        config.validate()?;

        let (kiosk, actions) = match load_registry(&storage, &config) {
            Ok(registry) => Kiosk::new(config, registry),
            Err(reason) => {
                tracing::error!(%reason, "stored registry unusable, medium left untouched");
                Kiosk::unreadable(config, reason)
            },
        };

        let mut driver = Self { env, storage, kiosk };
        let actions = driver.execute(actions);
        Ok((driver, actions))
    }

    /// Stamp an event with the current time, feed it to the kiosk, and carry
    /// out any persistence it asks for.
    pub fn process_event(&mut self, event: StationEvent) -> Vec<StationAction> {
        let now = self.env.now();
        let event = match event {
            StationEvent::CardPresented { reader, identifier } => {
                KioskEvent::CardPresented { reader, identifier, now }
            },
            StationEvent::ConsoleLine(line) => KioskEvent::ConsoleLine { line, now },
            StationEvent::AuxLine(line) => KioskEvent::AuxLine { line, now },
            StationEvent::ButtonPressed => KioskEvent::ButtonPressed { now },
            StationEvent::ButtonReleased => KioskEvent::ButtonReleased { now },
            StationEvent::Tick => KioskEvent::Tick { now },
        };

        let actions = self.kiosk.handle(event);
        self.execute(actions)
    }

    /// The kiosk.
    pub fn kiosk(&self) -> &Kiosk<E::Instant> {
        &self.kiosk
    }

    /// The storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Shut down and give the storage back.
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Run persistence actions and feed their results back until only device
    /// actions remain.
    fn execute(&mut self, actions: Vec<KioskAction>) -> Vec<StationAction> {
        let mut queue = VecDeque::from(actions);
        let mut out = Vec::with_capacity(queue.len());

        while let Some(action) = queue.pop_front() {
            match action {
                KioskAction::Display { line1, line2 } => {
                    out.push(StationAction::Display { line1, line2 });
                },
                KioskAction::Console(line) => out.push(StationAction::Console(line)),
                KioskAction::Indicator { indicator, on } => {
                    out.push(StationAction::Indicator { indicator, on });
                },
                KioskAction::Persist { revision, image } => {
                    let result = self.storage.store(&image);
                    queue.extend(self.report_write(revision, result));
                },
                KioskAction::Wipe { revision, image } => {
                    let result = self.storage.wipe(&image);
                    queue.extend(self.report_write(revision, result));
                },
            }
        }
        out
    }

    fn report_write(&mut self, revision: u64, result: Result<(), StorageError>) -> Vec<KioskAction> {
        match result {
            Ok(()) => {
                tracing::debug!(revision, "registry persisted");
                self.kiosk.handle(KioskEvent::StorageWritten { revision })
            },
            Err(err) => {
                tracing::error!(revision, error = %err, "failed to persist registry");
                self.kiosk.handle(KioskEvent::StorageFailed { reason: err.to_string() })
            },
        }
    }
}

fn load_registry<S: Storage>(storage: &S, config: &KioskConfig) -> Result<Registry, String> {
    let limits = config.registry_limits();

    let Some(bytes) = storage.load().map_err(|err| err.to_string())? else {
        tracing::info!("no stored registry");
        return Ok(Registry::new(limits));
    };

    let image = decode_medium(&bytes, config.codec_limits()).map_err(|err| err.to_string())?;
    tracing::info!(templates = image.templates.len(), master = image.master.is_some(), "registry loaded");
    Ok(Registry::from_image(image, limits))
}
