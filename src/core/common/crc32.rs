//! CRC32 checksums for page headers and WAL frames.
//!
//! Thin wrapper around `crc32fast` so call sites don't need to depend on it
//! directly and can swap the algorithm (e.g. to CRC32C) in one place.

use crc32fast::Hasher as Crc32fastHasher;

/// CRC32 hasher that maintains state for incremental hashing.
#[derive(Debug, Clone, Default)]
pub struct Hasher {
    inner: Crc32fastHasher,
}

impl Hasher {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Crc32fastHasher::new() }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    #[must_use]
    pub fn finalize(self) -> u32 {
        self.inner.finalize()
    }

    #[must_use]
    pub fn hash(data: &[u8]) -> u32 {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}

/// Calculate CRC32 checksum for a byte slice.
#[must_use]
pub fn checksum(data: &[u8]) -> u32 {
    Hasher::hash(data)
}

/// Verify data integrity by comparing with an expected checksum.
#[must_use]
pub fn verify(data: &[u8], expected: u32) -> bool {
    checksum(data) == expected
}
