//! Byte-addressed storage.
//!
//! The image is laid out from address 0. Writes are staged and flushed by
//! `commit`, the way an emulated EEPROM over flash behaves: staged bytes that
//! were never committed are lost on power loss.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use gabarito_core::device::ByteStore;

use super::{Storage, StorageError};

/// Erased flash reads as all ones.
const ERASED: u8 = 0xFF;

/// In-memory byte store with separate staged and flushed contents.
#[derive(Debug, Clone)]
pub struct MemoryByteStore {
    staged: Vec<u8>,
    flushed: Vec<u8>,
    commits: usize,
}

impl MemoryByteStore {
    /// Erased medium of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self { staged: vec![ERASED; capacity], flushed: vec![ERASED; capacity], commits: 0 }
    }

    /// Contents that survive a power cycle.
    pub fn flushed(&self) -> &[u8] {
        &self.flushed
    }

    /// Number of commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// Drop staged writes, as a power loss before `commit` would.
    pub fn power_cycle(&mut self) {
        self.staged.clone_from(&self.flushed);
    }
}

impl ByteStore for MemoryByteStore {
    type Error = StorageError;

    fn capacity(&self) -> usize {
        self.staged.len()
    }

    fn read(&self, address: usize) -> u8 {
        self.staged.get(address).copied().unwrap_or(ERASED)
    }

    fn write(&mut self, address: usize, byte: u8) -> Result<(), StorageError> {
        let capacity = self.staged.len();
        let slot = self
            .staged
            .get_mut(address)
            .ok_or(StorageError::OutOfRange { address, capacity })?;
        *slot = byte;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.flushed.clone_from(&self.staged);
        self.commits += 1;
        Ok(())
    }
}

/// Byte store persisted to a fixed-size file.
///
/// The whole file is rewritten on `commit`, through a temporary file in the
/// same directory and an atomic rename.
#[derive(Debug)]
pub struct ImageFileByteStore {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl ImageFileByteStore {
    /// Open `path`, or start from an erased medium if it does not exist.
    ///
    /// A shorter file is padded with erased bytes; a longer one is cut to
    /// `capacity`.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Result<Self, StorageError> {
        let path = path.into();
        let mut bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        bytes.resize(capacity, ERASED);

        tracing::debug!(path = %path.display(), capacity, "byte store opened");
        Ok(Self { path, bytes })
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteStore for ImageFileByteStore {
    type Error = StorageError;

    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read(&self, address: usize) -> u8 {
        self.bytes.get(address).copied().unwrap_or(ERASED)
    }

    fn write(&mut self, address: usize, byte: u8) -> Result<(), StorageError> {
        let capacity = self.bytes.len();
        let slot =
            self.bytes.get_mut(address).ok_or(StorageError::OutOfRange { address, capacity })?;
        *slot = byte;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        super::file::replace_atomically(&self.path, &self.bytes)
    }
}

/// [`Storage`] over a byte-addressed medium.
#[derive(Debug)]
pub struct EepromStorage<B> {
    medium: Mutex<B>,
}

impl<B> EepromStorage<B>
where
    B: ByteStore,
    StorageError: From<B::Error>,
{
    /// Wrap a medium.
    pub fn new(medium: B) -> Self {
        Self { medium: Mutex::new(medium) }
    }

    /// Give the medium back.
    pub fn into_inner(self) -> Result<B, StorageError> {
        self.medium.into_inner().map_err(|_| StorageError::Poisoned)
    }

    fn write_image(medium: &mut B, image: &[u8]) -> Result<(), StorageError> {
        let capacity = medium.capacity();
        if image.len() > capacity {
            return Err(StorageError::CapacityExceeded { size: image.len(), capacity });
        }

        for (address, byte) in image.iter().enumerate() {
            medium.write(address, *byte)?;
        }
        Ok(())
    }
}

impl<B> Storage for EepromStorage<B>
where
    B: ByteStore,
    StorageError: From<B::Error>,
{
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let medium = self.medium.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(Some((0..medium.capacity()).map(|address| medium.read(address)).collect()))
    }

    fn store(&self, image: &[u8]) -> Result<(), StorageError> {
        let mut medium = self.medium.lock().map_err(|_| StorageError::Poisoned)?;
        Self::write_image(&mut medium, image)?;
        medium.commit()?;

        tracing::debug!(bytes = image.len(), "image committed");
        Ok(())
    }

    fn wipe(&self, image: &[u8]) -> Result<(), StorageError> {
        let mut medium = self.medium.lock().map_err(|_| StorageError::Poisoned)?;

        let capacity = medium.capacity();
        if image.len() > capacity {
            return Err(StorageError::CapacityExceeded { size: image.len(), capacity });
        }
        for address in 0..capacity {
            medium.write(address, 0)?;
        }
        Self::write_image(&mut medium, image)?;
        medium.commit()?;

        tracing::info!(capacity, "medium zero-filled");
        Ok(())
    }
}
