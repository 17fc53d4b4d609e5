//! The resolution façade.
//!
//! An [`ImportRegistry`] binds a declared set of logical names to one
//! provider and one module base, resolves lazily (or eagerly at bind), and
//! caches each resolved address for the registry's lifetime. A registry is a
//! single resolution epoch: there is no partial invalidation, re-resolution
//! after the image changes means building a new registry.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::addr::Pointer;
use crate::error::{Error, Result};
use crate::memory::ReadMemory;
use crate::provider::AddressProvider;

pub struct ImportRegistry<P: AddressProvider, M: ReadMemory> {
    provider: P,
    memory: M,
    base: Pointer,
    names: HashSet<String>,
    cache: HashMap<String, Pointer>,
}

impl<P: AddressProvider, M: ReadMemory> ImportRegistry<P, M> {
    /// Declare the set of names this registry is responsible for.
    ///
    /// Resolution is lazy: nothing is resolved until [`get`](Self::get) or
    /// [`get_many`](Self::get_many) asks for it. Fails with `InvalidBase`
    /// when the module base is null.
    pub fn bind<I, N>(provider: P, memory: M, base: Pointer, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        if base.is_null() {
            return Err(Error::InvalidBase);
        }

        let names: HashSet<String> = names.into_iter().map(Into::into).collect();
        debug!("Bound registry: {} names, base {}", names.len(), base);

        Ok(Self {
            provider,
            memory,
            base,
            names,
            cache: HashMap::new(),
        })
    }

    /// Like [`bind`](Self::bind), but resolves every declared name before
    /// returning. Any failure aborts the bind.
    pub fn bind_eager<I, N>(provider: P, memory: M, base: Pointer, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let mut registry = Self::bind(provider, memory, base, names)?;
        let declared: Vec<String> = registry.names.iter().cloned().collect();
        let declared_refs: Vec<&str> = declared.iter().map(String::as_str).collect();
        registry.get_many(&declared_refs)?;
        Ok(registry)
    }

    pub fn base(&self) -> Pointer {
        self.base
    }

    /// Whether `name` was declared at bind time.
    pub fn is_declared(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Whether `name` has already been resolved and cached.
    pub fn is_resolved(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Resolve one name to an absolute address.
    ///
    /// The first successful resolution per name is cached and returned for
    /// every later call. Failures are not cached, so a retry after an
    /// external fix (say, supplying the right symbol file) can succeed.
    pub fn get(&mut self, name: &str) -> Result<Pointer> {
        if !self.names.contains(name) {
            return Err(Error::NameNotFound(name.to_string()));
        }

        if let Some(address) = self.cache.get(name) {
            trace!("Cache hit for '{}': {}", name, address);
            return Ok(*address);
        }

        let address_ref = self.provider.resolve(name)?;
        let address = address_ref.resolve(self.base, &self.memory)?;
        debug!("Resolved '{}' -> {}", name, address);
        self.cache.insert(name.to_string(), address);
        Ok(address)
    }

    /// Resolve several names, preserving input order in the output.
    ///
    /// The not-yet-cached subset goes through one `resolve_many` provider
    /// call, so providers with a batched path (symbols) pay for one query.
    pub fn get_many(&mut self, names: &[&str]) -> Result<Vec<Pointer>> {
        for name in names {
            if !self.names.contains(*name) {
                return Err(Error::NameNotFound((*name).to_string()));
            }
        }

        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| !self.cache.contains_key(*name))
            .collect();

        if !missing.is_empty() {
            let refs = self.provider.resolve_many(&missing)?;
            for (name, address_ref) in missing.iter().zip(refs) {
                let address = address_ref.resolve(self.base, &self.memory)?;
                debug!("Resolved '{}' -> {}", name, address);
                self.cache.insert((*name).to_string(), address);
            }
        }

        names
            .iter()
            .map(|name| {
                self.cache
                    .get(*name)
                    .copied()
                    .ok_or_else(|| Error::NameNotFound((*name).to_string()))
            })
            .collect()
    }
}
