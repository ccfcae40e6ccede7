//! Durable storage for the encoded registry image.
//!
//! The kiosk hands the driver a complete image on every durable mutation;
//! storage rewrites the medium from offset 0. There is no partial update.
//!
//! # Backends
//!
//! - [`MemoryStorage`]: shared in-memory image, for tests and simulation
//! - [`EepromStorage`]: byte-addressed medium behind [`ByteStore`]
//! - [`FileStorage`]: one image file replaced atomically
//! - [`ChaoticStorage`]: fault injection around any backend
//!
//! [`ByteStore`]: gabarito_core::device::ByteStore

mod chaotic;
mod eeprom;
mod file;

use std::sync::{Arc, Mutex};

pub use chaotic::ChaoticStorage;
pub use eeprom::{EepromStorage, ImageFileByteStore, MemoryByteStore};
pub use file::FileStorage;
use thiserror::Error;

/// Errors from storage backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Underlying I/O failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Image does not fit the medium.
    #[error("image of {size} bytes exceeds medium capacity of {capacity} bytes")]
    CapacityExceeded {
        /// Image size.
        size: usize,
        /// Medium size.
        capacity: usize,
    },

    /// Address outside the medium.
    #[error("address {address} outside medium of {capacity} bytes")]
    OutOfRange {
        /// Offending address.
        address: usize,
        /// Medium size.
        capacity: usize,
    },

    /// Fault injected by [`ChaoticStorage`].
    #[error("injected fault during {0}")]
    Injected(&'static str),

    /// A lock guarding the medium was poisoned.
    #[error("storage lock poisoned")]
    Poisoned,
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Whole-image durable storage.
///
/// Implementations take `&self` and synchronize internally so a station and
/// a test can hold clones of the same medium.
pub trait Storage {
    /// Read the stored image.
    ///
    /// Returns `None` if the medium has never been written. Byte-addressed
    /// media cannot tell and always return their full contents; an erased
    /// medium decodes as empty.
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the stored image.
    fn store(&self, image: &[u8]) -> Result<(), StorageError>;

    /// Scrub the medium, then store `image`.
    ///
    /// No byte of a previous image may survive outside the new one.
    fn wipe(&self, image: &[u8]) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    image: Option<Vec<u8>>,
    writes: usize,
}

/// In-memory storage. Clones share the same image.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    /// Create an empty, never-written store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `image`, as if written by an earlier run.
    pub fn with_image(image: Vec<u8>) -> Self {
        Self { inner: Arc::new(Mutex::new(MemoryInner { image: Some(image), writes: 0 })) }
    }

    /// Current image, if written.
    pub fn image(&self) -> Option<Vec<u8>> {
        self.inner.lock().ok().and_then(|inner| inner.image.clone())
    }

    /// Number of successful writes (store or wipe).
    pub fn write_count(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.writes)
    }

    /// Overwrite the image with arbitrary bytes, bypassing the write path.
    /// Used to model corruption.
    pub fn corrupt(&self, bytes: Vec<u8>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.image = Some(bytes);
        }
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let inner = self.inner.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(inner.image.clone())
    }

    fn store(&self, image: &[u8]) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().map_err(|_| StorageError::Poisoned)?;
        inner.image = Some(image.to_vec());
        inner.writes += 1;
        Ok(())
    }

    fn wipe(&self, image: &[u8]) -> Result<(), StorageError> {
        self.store(image)
    }
}
