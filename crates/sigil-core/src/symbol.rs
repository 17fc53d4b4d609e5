//! Debug-symbol lookup against one current image.
//!
//! A [`SymbolStore`] answers "what is the offset of symbol X in the
//! debug-symbol file currently open". The store holds exactly one image at a
//! time; switching images is explicit and invalidates nothing a caller has
//! already resolved (a registry is one resolution epoch, re-resolution means
//! a new registry).
//!
//! The symbol container format is behind the [`SymbolSource`] seam; the
//! production source parses Microsoft PDB files. Tests substitute an
//! in-memory map.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use pdb::FallibleIterator;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// The opaque platform symbol container, reduced to the two operations this
/// subsystem needs.
pub trait SymbolSource: Sized {
    /// Open and parse a symbol file. Fails with `SymbolFileNotFound` when the
    /// file is missing or is not a valid container.
    fn load(path: &Path) -> Result<Self>;

    /// Offset of `name` relative to the image's load base, if present.
    fn offset_of(&self, name: &str) -> Option<i64>;
}

/// Symbol source backed by a Microsoft PDB file.
///
/// Public symbols are extracted eagerly into an RVA map at open time, so
/// lookups afterwards are plain map hits and batching costs nothing extra.
pub struct PdbSource {
    symbols: HashMap<String, i64>,
}

impl PdbSource {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolSource for PdbSource {
    fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::SymbolFileNotFound(format!("{}: {}", path.display(), e))
        })?;
        let mut pdb = pdb::PDB::open(file).map_err(|e| {
            Error::SymbolFileNotFound(format!("{}: {}", path.display(), e))
        })?;

        let address_map = pdb.address_map().map_err(|e| {
            Error::SymbolFileNotFound(format!("{}: {}", path.display(), e))
        })?;
        let symbol_table = pdb.global_symbols().map_err(|e| {
            Error::SymbolFileNotFound(format!("{}: {}", path.display(), e))
        })?;

        let mut symbols = HashMap::new();
        let mut iter = symbol_table.iter();
        while let Some(symbol) = iter.next().map_err(|e| {
            Error::SymbolFileNotFound(format!("{}: {}", path.display(), e))
        })? {
            let Ok(pdb::SymbolData::Public(data)) = symbol.parse() else {
                continue;
            };
            let Some(rva) = data.offset.to_rva(&address_map) else {
                continue;
            };
            // First definition wins when a name appears more than once.
            symbols
                .entry(data.name.to_string().into_owned())
                .or_insert(i64::from(rva.0));
        }

        if symbols.is_empty() {
            warn!("No public symbols in {}", path.display());
        } else {
            debug!(
                "Loaded {} public symbols from {}",
                symbols.len(),
                path.display()
            );
        }

        Ok(Self { symbols })
    }

    fn offset_of(&self, name: &str) -> Option<i64> {
        self.symbols.get(name).copied()
    }
}

struct CurrentImage<S> {
    path: PathBuf,
    source: S,
}

/// Name-to-offset lookup against a single open debug-symbol file.
///
/// The current-image slot is single-owner state: the store does no internal
/// locking, so concurrent `set_current_image` and `resolve` calls on a shared
/// instance must be serialized by the caller.
pub struct SymbolStore<S: SymbolSource = PdbSource> {
    current: Option<CurrentImage<S>>,
}

impl<S: SymbolSource> SymbolStore<S> {
    /// Create a store with no current image.
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Create a store and open `path` as the current image.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut store = Self::new();
        store.set_current_image(path)?;
        Ok(store)
    }

    /// Switch the current image. A failed switch leaves no current image
    /// rather than silently keeping the old one.
    pub fn set_current_image<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.current = None;
        let source = S::load(path)?;
        debug!("Current symbol image: {}", path.display());
        self.current = Some(CurrentImage {
            path: path.to_path_buf(),
            source,
        });
        Ok(())
    }

    /// Path of the current image, if one is open.
    pub fn current_image(&self) -> Option<&Path> {
        self.current.as_ref().map(|image| image.path.as_path())
    }

    fn source(&self) -> Result<&S> {
        self.current
            .as_ref()
            .map(|image| &image.source)
            .ok_or_else(|| Error::SymbolFileNotFound("no current image is open".to_string()))
    }

    /// Offset of `name` relative to the image's load base.
    pub fn resolve(&self, name: &str) -> Result<i64> {
        self.source()?
            .offset_of(name)
            .ok_or_else(|| Error::NameNotFound(name.to_string()))
    }

    /// Resolve several names against the same current image in one pass.
    ///
    /// Output order matches input order. Any unresolved name fails the whole
    /// batch, naming the first one that was missing.
    pub fn resolve_many(&self, names: &[&str]) -> Result<Vec<i64>> {
        let source = self.source()?;
        let mut offsets = Vec::with_capacity(names.len());
        for name in names {
            match source.offset_of(name) {
                Some(offset) => offsets.push(offset),
                None => return Err(Error::NameNotFound((*name).to_string())),
            }
        }
        Ok(offsets)
    }
}

impl<S: SymbolSource> Default for SymbolStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory symbol source for tests. "Loading" ignores the path and
    /// serves whatever the thread-local fixture holds.
    pub struct MapSource {
        pub symbols: HashMap<String, i64>,
    }

    thread_local! {
        static FIXTURE: std::cell::RefCell<Option<HashMap<String, i64>>> =
            const { std::cell::RefCell::new(None) };
    }

    pub fn install_fixture(symbols: &[(&str, i64)]) {
        let map = symbols
            .iter()
            .map(|(name, offset)| (name.to_string(), *offset))
            .collect();
        FIXTURE.with(|slot| *slot.borrow_mut() = Some(map));
    }

    impl SymbolSource for MapSource {
        fn load(path: &Path) -> Result<Self> {
            let symbols = FIXTURE
                .with(|slot| slot.borrow_mut().take())
                .ok_or_else(|| Error::SymbolFileNotFound(path.display().to_string()))?;
            Ok(Self { symbols })
        }

        fn offset_of(&self, name: &str) -> Option<i64> {
            self.symbols.get(name).copied()
        }
    }
}
