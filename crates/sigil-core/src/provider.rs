//! Resolution strategies behind one contract.
//!
//! An [`AddressProvider`] turns a logical name into an [`AddressRef`]. The
//! production set is closed: a precomputed index, a debug-symbol store, or a
//! bare pattern table. All three return module-base-relative references; the
//! registry combines them with the actual base.

use std::collections::HashMap;

use tracing::debug;

use crate::addr::AddressRef;
use crate::error::{Error, Result};
use crate::index::{IndexPayload, IndexStore};
use crate::pattern::Pattern;
use crate::symbol::{PdbSource, SymbolSource, SymbolStore};

/// Resolves logical names to address references.
///
/// `resolve_many` defaults to sequential resolution; variants with a cheaper
/// batched path (the symbol store) override it. Either way the output order
/// matches the input order and the first failure aborts the batch.
pub trait AddressProvider {
    fn resolve(&mut self, name: &str) -> Result<AddressRef>;

    fn resolve_many(&mut self, names: &[&str]) -> Result<Vec<AddressRef>> {
        names.iter().map(|name| self.resolve(name)).collect()
    }
}

/// Provider backed by a precomputed [`IndexStore`].
///
/// Offset entries need no image bytes. Signature entries scan the attached
/// image snapshot; constructing the provider without one makes signature
/// resolution a typed `Unsupported` failure instead of a wrong answer.
pub struct IndexProvider {
    store: IndexStore,
    image: Option<Vec<u8>>,
}

impl IndexProvider {
    pub fn new(store: IndexStore, image: Vec<u8>) -> Self {
        Self {
            store,
            image: Some(image),
        }
    }

    /// Offset-only provider: signature entries cannot be resolved.
    pub fn without_image(store: IndexStore) -> Self {
        Self { store, image: None }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }
}

impl AddressProvider for IndexProvider {
    fn resolve(&mut self, name: &str) -> Result<AddressRef> {
        let entry = self
            .store
            .entry(name)
            .ok_or_else(|| Error::NameNotFound(name.to_string()))?;

        match &entry.payload {
            IndexPayload::Offset(delta) => Ok(AddressRef::relative(*delta)),
            IndexPayload::Signature(pattern) => {
                let image = self.image.as_deref().ok_or_else(|| {
                    Error::Unsupported(format!(
                        "signature entry '{}' requires image bytes",
                        name
                    ))
                })?;
                let offset = pattern.find(image)?;
                debug!("Index signature '{}' matched at offset {:#x}", name, offset);
                Ok(AddressRef::relative(offset as u64))
            }
        }
    }
}

/// Provider backed by a [`SymbolStore`].
pub struct SymbolProvider<S: SymbolSource = PdbSource> {
    store: SymbolStore<S>,
}

impl<S: SymbolSource> SymbolProvider<S> {
    pub fn new(store: SymbolStore<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SymbolStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SymbolStore<S> {
        &mut self.store
    }
}

impl<S: SymbolSource> AddressProvider for SymbolProvider<S> {
    fn resolve(&mut self, name: &str) -> Result<AddressRef> {
        let offset = self.store.resolve(name)?;
        Ok(AddressRef::relative(offset as u64))
    }

    /// One batched query against the current image.
    fn resolve_many(&mut self, names: &[&str]) -> Result<Vec<AddressRef>> {
        let offsets = self.store.resolve_many(names)?;
        Ok(offsets
            .into_iter()
            .map(|offset| AddressRef::relative(offset as u64))
            .collect())
    }
}

/// Provider backed by an explicit name-to-pattern table and an image
/// snapshot, for callers that have neither an index nor symbols.
pub struct PatternProvider {
    patterns: HashMap<String, Pattern>,
    image: Vec<u8>,
}

impl PatternProvider {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            patterns: HashMap::new(),
            image,
        }
    }

    /// Register a pattern under a logical name. The last registration for a
    /// name wins.
    pub fn register(&mut self, name: impl Into<String>, pattern: Pattern) {
        self.patterns.insert(name.into(), pattern);
    }

    pub fn with_pattern(mut self, name: impl Into<String>, pattern: Pattern) -> Self {
        self.register(name, pattern);
        self
    }
}

impl AddressProvider for PatternProvider {
    fn resolve(&mut self, name: &str) -> Result<AddressRef> {
        let pattern = self
            .patterns
            .get(name)
            .ok_or_else(|| Error::NameNotFound(name.to_string()))?;
        let offset = pattern.find(&self.image)?;
        debug!("Pattern '{}' matched at offset {:#x}", name, offset);
        Ok(AddressRef::relative(offset as u64))
    }
}
