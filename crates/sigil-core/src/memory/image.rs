use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::memory::ReadMemory;

/// An in-memory snapshot of a loaded binary image.
///
/// Holds the raw bytes together with the base address they were (or would be)
/// mapped at, so absolute addresses can be translated back into buffer
/// offsets.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    base: u64,
    bytes: Vec<u8>,
}

impl ImageBuffer {
    pub fn new(base: u64, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    /// Load an image snapshot from a file on disk.
    pub fn from_file<P: AsRef<Path>>(path: P, base: u64) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(Self { base, bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl ReadMemory for ImageBuffer {
    fn base_address(&self) -> u64 {
        self.base
    }

    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let offset = address
            .checked_sub(self.base)
            .and_then(|delta| usize::try_from(delta).ok())
            .ok_or_else(|| Error::MemoryReadFailed {
                address,
                message: format!("address outside image mapped at {:#x}", self.base),
            })?;

        let end = offset.checked_add(size).filter(|end| *end <= self.bytes.len());
        match end {
            Some(end) => Ok(self.bytes[offset..end].to_vec()),
            None => Err(Error::MemoryReadFailed {
                address,
                message: format!(
                    "read of {} bytes extends past image end ({} bytes)",
                    size,
                    self.bytes.len()
                ),
            }),
        }
    }
}
