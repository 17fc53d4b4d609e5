//! Address representations and the pointer model.
//!
//! Resolution strategies hand back addresses in three shapes: absolute,
//! relative to the module base, or relative with a fixup tag bit that
//! requests one extra level of pointer indirection. All three resolve to a
//! plain [`Pointer`].

use std::fmt;
use std::ops::{Add, Sub};

use crate::error::{Error, Result};
use crate::memory::ReadMemory;

/// An opaque absolute address in the target's address space.
///
/// Arithmetic is always permitted and wraps; whether the address is actually
/// mapped is the caller's problem, not this type's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pointer(u64);

impl Pointer {
    pub const NULL: Pointer = Pointer(0);

    pub const fn new(address: u64) -> Self {
        Self(address)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Apply a signed byte offset.
    pub const fn offset(self, delta: i64) -> Self {
        Self(self.0.wrapping_add_signed(delta))
    }
}

impl Add<u64> for Pointer {
    type Output = Pointer;

    fn add(self, rhs: u64) -> Pointer {
        Pointer(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Pointer {
    type Output = Pointer;

    fn sub(self, rhs: u64) -> Pointer {
        Pointer(self.0.wrapping_sub(rhs))
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for Pointer {
    fn from(address: u64) -> Self {
        Self(address)
    }
}

/// Base-relative address: `resolve(base) = base + delta`.
///
/// A delta of 0 is legal and denotes "same address as base".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeAddress {
    pub delta: u64,
}

impl RelativeAddress {
    pub const fn new(delta: u64) -> Self {
        Self { delta }
    }

    pub fn resolve(&self, base: Pointer) -> Pointer {
        base + self.delta
    }
}

/// Base-relative address with an indirection tag in the low bit.
///
/// `resolve` computes `addr = base + delta`; if `addr & 1` is set, the
/// remaining bits point at a pointer slot, whose 8-byte value is the final
/// address. The indirection is applied at most once, even when the loaded
/// value also carries a set low bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixupAddress {
    pub delta: u64,
}

impl FixupAddress {
    pub const fn new(delta: u64) -> Self {
        Self { delta }
    }

    pub fn resolve<M: ReadMemory>(&self, base: Pointer, memory: &M) -> Result<Pointer> {
        if base.is_null() {
            return Err(Error::InvalidBase);
        }

        let addr = base + self.delta;
        if addr.as_u64() & 1 == 0 {
            return Ok(addr);
        }

        // Low bit is a tag, not part of the address.
        let slot = addr.as_u64() - 1;
        let target = memory.read_u64(slot)?;
        Ok(Pointer::new(target))
    }
}

/// The uniform result type of every resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressRef {
    /// Already absolute; the module base is ignored.
    Absolute(Pointer),
    /// Module-base relative.
    Relative(RelativeAddress),
    /// Module-base relative with an optional single indirection.
    Fixup(FixupAddress),
}

impl AddressRef {
    pub const fn absolute(address: u64) -> Self {
        AddressRef::Absolute(Pointer::new(address))
    }

    pub const fn relative(delta: u64) -> Self {
        AddressRef::Relative(RelativeAddress::new(delta))
    }

    pub const fn fixup(delta: u64) -> Self {
        AddressRef::Fixup(FixupAddress::new(delta))
    }

    /// Resolve against a module base. `memory` is consulted only for the
    /// fixup indirection read.
    pub fn resolve<M: ReadMemory>(&self, base: Pointer, memory: &M) -> Result<Pointer> {
        match self {
            AddressRef::Absolute(address) => Ok(*address),
            AddressRef::Relative(rel) => Ok(rel.resolve(base)),
            AddressRef::Fixup(fixup) => fixup.resolve(base, memory),
        }
    }
}
