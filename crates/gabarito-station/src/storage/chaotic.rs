//! Fault-injecting storage wrapper.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{Storage, StorageError};

/// Wraps a backend and fails writes on demand or at a seeded random rate.
///
/// Loads always pass through. Failed writes never reach the inner backend.
#[derive(Debug)]
pub struct ChaoticStorage<S> {
    inner: S,
    failure_rate: f64,
    rng: Mutex<ChaCha8Rng>,
    offline: AtomicBool,
}

impl<S: Storage> ChaoticStorage<S> {
    /// Fail each write with probability `failure_rate`, deterministically for
    /// a given `seed`.
    pub fn new(inner: S, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            offline: AtomicBool::new(false),
        }
    }

    /// Fail every write until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    /// Wrapped backend.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn should_fail(&self) -> Result<bool, StorageError> {
        if self.offline.load(Ordering::Acquire) {
            return Ok(true);
        }
        let mut rng = self.rng.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(rng.gen_bool(self.failure_rate))
    }
}

impl<S: Storage> Storage for ChaoticStorage<S> {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.load()
    }

    fn store(&self, image: &[u8]) -> Result<(), StorageError> {
        if self.should_fail()? {
            tracing::debug!("injecting store failure");
            return Err(StorageError::Injected("store"));
        }
        self.inner.store(image)
    }

    fn wipe(&self, image: &[u8]) -> Result<(), StorageError> {
        if self.should_fail()? {
            tracing::debug!("injecting wipe failure");
            return Err(StorageError::Injected("wipe"));
        }
        self.inner.wipe(image)
    }
}
