mod image;

#[cfg(test)]
pub mod mock;

pub use image::ImageBuffer;

#[cfg(test)]
pub use mock::{MockMemory, MockMemoryBuilder};

use crate::error::Result;

/// Read-only view of the target's memory.
///
/// Implementations decide where the bytes come from (a loaded image snapshot,
/// a live process, a test fixture). Out-of-range reads return an error, they
/// never panic.
pub trait ReadMemory {
    /// Load address of the region this reader covers.
    fn base_address(&self) -> u64;

    /// Read `size` bytes starting at the absolute address `address`.
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    fn read_u32(&self, address: u64) -> Result<u32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }
}

impl<R: ReadMemory + ?Sized> ReadMemory for &R {
    fn base_address(&self) -> u64 {
        (**self).base_address()
    }

    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, size)
    }
}
