//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples kiosk logic from the system clock. The
//! state machines never read time themselves; every event carries the
//! instant it happened at, stamped by the driver from `Environment::now()`.
//! This enables:
//!
//! - Deterministic Simulation: a virtual clock advances only when the test
//!   says so, so a 20 second verification deadline runs in microseconds.
//!
//! - Production Runtime: the station binary uses `std::time::Instant` and
//!   tokio sleeps without any change to the kiosk logic.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Isolation: Implementations must not share global state

use std::{fmt::Debug, ops::Sub, time::Duration};

/// A point in time as seen by the kiosk.
///
/// Only differences are ever taken, and only from an earlier instant to a
/// later one.
pub trait Instant: Copy + Ord + Debug + Send + Sync + Sub<Output = Duration> + 'static {}

impl<T> Instant for T where T: Copy + Ord + Debug + Send + Sync + Sub<Output = Duration> + 'static {}

/// Abstract environment providing time and async sleeping.
///
/// # Safety
///
/// Implementations MUST guarantee time monotonicity: `now()` never goes
/// backwards.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type produced by this environment.
    type Instant: Instant;

    /// Returns the current time.
    ///
    /// # Invariants
    ///
    /// - Monotonicity: Subsequent calls must return times >= previous calls.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it should only be used
    /// by driver code (not kiosk logic).
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
