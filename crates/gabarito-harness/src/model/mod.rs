//! Reference model for model-based testing.
//!
//! The model is a plain list of templates with the registration rules
//! written out directly: no sessions, no persistence, no clock. It is the
//! oracle the real station is checked against.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Observable behaviour only: what ends up registered, not how
//! - Deterministic: Same inputs produce same outputs

pub mod operation;
mod registry;
mod world;

pub use operation::{
    CardSeed, MASTER, Operation, OperationError, OperationResult, piece_card, piece_name,
    planned_pieces, template_card,
};
pub use registry::{ModelRegistry, ModelTemplate};
pub use world::{ModelWorld, ObservableState};
