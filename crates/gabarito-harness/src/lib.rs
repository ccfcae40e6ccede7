//! Deterministic simulation harness for the gabarito kiosk.
//!
//! A virtual clock, recording output devices and a simulated station built
//! from the real driver and poller. A 20 second verification deadline or a
//! 200 ms debounce window runs in microseconds and the same inputs always
//! produce the same outputs.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation. Operations are
//! applied to both the model and a [`SimStation`], and their observable
//! states are compared, including the state decoded from the medium.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod devices;
pub mod model;
pub mod sim_env;
pub mod sim_station;

pub use devices::{RecordingDisplay, RecordingIndicators};
pub use model::{
    CardSeed, MASTER, ModelRegistry, ModelTemplate, ModelWorld, ObservableState, Operation,
    OperationError, OperationResult,
};
pub use sim_env::SimEnv;
pub use sim_station::SimStation;
