//! # sigil-core
//!
//! Runtime address resolution for unexported symbols in loaded binary
//! images.
//!
//! The addresses of interesting functions and data inside a target binary
//! are not stable across builds and are not exported anywhere; this crate
//! locates them at runtime from whichever evidence is available:
//!
//! - a precomputed index document (per-name hex offset or byte signature),
//! - a debug-symbol file (PDB) opened as the current image,
//! - a raw wildcard-tolerant byte-pattern scan.
//!
//! The [`ImportRegistry`] façade binds a set of logical names to one
//! provider and one module base, resolves lazily or eagerly, and caches
//! every resolved [`Pointer`] for its lifetime.
//!
//! All operations are synchronous and blocking. Instances are independent;
//! sharing a single instance across threads requires external serialization.

pub mod addr;
pub mod error;
pub mod index;
pub mod memory;
pub mod pattern;
pub mod provider;
pub mod registry;
pub mod symbol;

pub use addr::{AddressRef, FixupAddress, Pointer, RelativeAddress};
pub use error::{Error, Result};
pub use index::{EntryKind, IndexEntry, IndexPayload, IndexStore, GLOBAL_SCOPE, SCOPE_SEPARATOR};
pub use memory::{ImageBuffer, ReadMemory};
pub use pattern::{Matches, Pattern};
pub use provider::{AddressProvider, IndexProvider, PatternProvider, SymbolProvider};
pub use registry::ImportRegistry;
pub use symbol::{PdbSource, SymbolSource, SymbolStore};
