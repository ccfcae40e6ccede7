//! Gabarito kiosk core.
//!
//! Sans-IO implementation of the kit-verification kiosk: the association
//! registry, the registration and verification sessions, and the mode
//! coordinator that keeps them mutually exclusive.
//!
//! # Architecture
//!
//! The kiosk is a pure state machine driven by [`KioskEvent`]s and producing
//! [`KioskAction`]s. It performs no I/O and reads no clock: every event is
//! stamped by the caller. The same code runs under the production station
//! (system clock, real storage) and under deterministic simulation (virtual
//! clock, in-memory storage).
//!
//! # Components
//!
//! - [`Registry`]: bounded template→piece associations and the master card
//! - [`RegistrationSession`]: master-gated template and piece registration
//! - [`VerificationSession`]: deadline-bounded kit verification
//! - [`ModeCoordinator`]: debounced mode switching
//! - [`Kiosk`]: owns all of the above and dispatches console commands
//! - [`device`]: capabilities the station drives

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod coordinator;
pub mod device;
pub mod env;
pub mod error;
pub mod event;
pub mod kiosk;
pub mod registration;
pub mod registry;
pub mod verification;

pub use config::{ConfigError, KioskConfig, ReaderId};
pub use coordinator::{Mode, ModeCoordinator};
pub use env::Environment;
pub use error::KioskError;
pub use event::{DISPLAY_WIDTH, Indicator, KioskAction, KioskEvent};
pub use kiosk::{Kiosk, Session};
pub use registration::{PieceSource, RegistrationSession, RegistrationState};
pub use registry::{Registry, RegistryError, RegistryLimits};
pub use verification::{VerificationOutcome, VerificationSession, VerificationState};
