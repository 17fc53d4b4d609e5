//! Test doubles for memory access.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::memory::ReadMemory;

/// Builder for sparse mock memory used in unit tests.
pub struct MockMemoryBuilder {
    base: u64,
    cells: BTreeMap<u64, u8>,
}

impl MockMemoryBuilder {
    pub fn new(base: u64) -> Self {
        Self {
            base,
            cells: BTreeMap::new(),
        }
    }

    pub fn write_bytes(mut self, address: u64, bytes: &[u8]) -> Self {
        for (i, byte) in bytes.iter().enumerate() {
            self.cells.insert(address + i as u64, *byte);
        }
        self
    }

    pub fn write_u64(self, address: u64, value: u64) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn build(self) -> MockMemory {
        MockMemory {
            base: self.base,
            cells: self.cells,
        }
    }
}

/// Sparse mock memory: reads of unwritten addresses fail, like reads of
/// unmapped pages would.
pub struct MockMemory {
    base: u64,
    cells: BTreeMap<u64, u8>,
}

impl ReadMemory for MockMemory {
    fn base_address(&self) -> u64 {
        self.base
    }

    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(size);
        for i in 0..size {
            let addr = address + i as u64;
            match self.cells.get(&addr) {
                Some(byte) => bytes.push(*byte),
                None => {
                    return Err(Error::MemoryReadFailed {
                        address: addr,
                        message: "address not present in mock memory".to_string(),
                    });
                }
            }
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_reads_written_bytes() {
        let memory = MockMemoryBuilder::new(0x1000)
            .write_u64(0x1000, 0xDEAD_BEEF)
            .build();
        assert_eq!(memory.read_u64(0x1000).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_mock_unwritten_read_fails() {
        let memory = MockMemoryBuilder::new(0x1000).build();
        assert!(memory.read_bytes(0x1000, 1).is_err());
    }
}
