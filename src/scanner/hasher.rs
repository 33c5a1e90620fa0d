//! Streaming SHA-256 file hasher.
//!
//! Files are read through a fixed-size buffer and fed to the digest
//! incrementally, so memory use does not grow with file size.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use super::HashError;

/// A 256-bit content digest.
pub type Hash = [u8; 32];

/// Default read buffer: 64 KiB.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Smallest accepted read buffer.
pub const MIN_BUFFER_SIZE: usize = 4 * 1024;

/// Largest accepted read buffer.
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Computes SHA-256 digests of whole files.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Hasher with the default 64 KiB buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Use a custom read buffer, clamped to 4 KiB..=1 MiB.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE);
        self
    }

    /// The effective read buffer size.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Digest the full content of a file.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] if the file cannot be opened or a read fails
    /// part way through.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        self.hash_reader(file)
            .map_err(|e| HashError::from_io(path, e))
    }

    /// Digest everything a reader yields.
    ///
    /// # Errors
    ///
    /// Propagates the first non-interrupt read error.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> std::io::Result<Hash> {
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.buffer_size];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => hasher.update(&buffer[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(hasher.finalize().into())
    }
}

/// Hex-encode a digest.
///
/// ```
/// use filesift::scanner::hash_to_hex;
///
/// assert_eq!(hash_to_hex(&[0xab; 32]).len(), 64);
/// assert!(hash_to_hex(&[0xab; 32]).starts_with("abab"));
/// ```
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}
