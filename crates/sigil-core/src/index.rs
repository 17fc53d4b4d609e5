//! Precomputed resolution index.
//!
//! The index is a JSON document mapping scope names to ordered lists of
//! entries. Each entry carries a logical name, a kind (`offset` or
//! `signature`), and a textual payload. Loading flattens all scopes into a
//! single namespace: entries under the reserved `Global` scope keep their
//! bare name, every other scope prefixes its entries as `Scope.Name`.
//!
//! Loading is fail-fast: a single malformed entry or a flattened-name
//! collision aborts the load. A partially-loaded index could silently
//! resolve to wrong addresses, which is worse than a visible failure.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use serde::de::{MapAccess, Visitor};
use strum::{Display, EnumString};
use tracing::debug;

use crate::addr::{Pointer, RelativeAddress};
use crate::error::{Error, Result};
use crate::pattern::Pattern;

/// Reserved scope whose entries keep their bare name.
pub const GLOBAL_SCOPE: &str = "Global";

/// Separator joining scope and entry name during flattening.
pub const SCOPE_SEPARATOR: char = '.';

/// How an index entry locates its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum EntryKind {
    /// Byte pattern to scan the image for.
    Signature,
    /// Literal offset from the module base, hexadecimal.
    Offset,
}

/// Decoded payload of an index entry.
#[derive(Debug, Clone)]
pub enum IndexPayload {
    Signature(Pattern),
    Offset(u64),
}

impl IndexPayload {
    pub fn kind(&self) -> EntryKind {
        match self {
            IndexPayload::Signature(_) => EntryKind::Signature,
            IndexPayload::Offset(_) => EntryKind::Offset,
        }
    }
}

/// One flattened index entry.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub name: String,
    pub payload: IndexPayload,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

/// The raw document as a list of scope blocks.
///
/// A plain map type would silently last-wins-merge a document that repeats a
/// scope key, losing the earlier block's entries. Keeping every block as-is
/// lets flattening see all entries, so colliding names are caught no matter
/// which blocks they came from.
struct RawDocument {
    scopes: Vec<(String, Vec<RawEntry>)>,
}

impl<'de> Deserialize<'de> for RawDocument {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = RawDocument;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from scope name to a list of index entries")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut scopes = Vec::new();
                while let Some(block) = map.next_entry::<String, Vec<RawEntry>>()? {
                    scopes.push(block);
                }
                Ok(RawDocument { scopes })
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

/// Flattened mapping from logical name to resolvable payload.
#[derive(Debug, Clone, Default)]
pub struct IndexStore {
    entries: BTreeMap<String, IndexEntry>,
}

impl IndexStore {
    /// Load an index document from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let store = Self::from_str(&content)?;
        debug!(
            "Loaded index from {}: {} entries",
            path.as_ref().display(),
            store.len()
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a flattened entry by name.
    pub fn entry(&self, name: &str) -> Option<&IndexEntry> {
        self.entries.get(name)
    }

    /// All flattened names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Resolve a name to an absolute address.
    ///
    /// Offset entries resolve as `base + delta`. Signature entries scan
    /// `image` and resolve as `base +` the first match offset; `image` is
    /// expected to start at `base`.
    pub fn resolve(&self, name: &str, base: Pointer, image: &[u8]) -> Result<Pointer> {
        let entry = self
            .entry(name)
            .ok_or_else(|| Error::NameNotFound(name.to_string()))?;

        match &entry.payload {
            IndexPayload::Offset(delta) => Ok(RelativeAddress::new(*delta).resolve(base)),
            IndexPayload::Signature(pattern) => {
                let offset = pattern.find(image)?;
                Ok(base + offset as u64)
            }
        }
    }
}

impl FromStr for IndexStore {
    type Err = Error;

    /// Parse and flatten an index document.
    fn from_str(content: &str) -> Result<Self> {
        let document: RawDocument = serde_json::from_str(content)?;

        let mut entries = BTreeMap::new();
        for (scope, scope_entries) in &document.scopes {
            let is_global = scope.eq_ignore_ascii_case(GLOBAL_SCOPE);
            for raw in scope_entries {
                let name = if is_global {
                    raw.name.clone()
                } else {
                    format!("{}{}{}", scope, SCOPE_SEPARATOR, raw.name)
                };

                let payload = parse_payload(&name, &raw.kind, &raw.value)?;
                let entry = IndexEntry {
                    name: name.clone(),
                    payload,
                };

                if entries.insert(name.clone(), entry).is_some() {
                    return Err(Error::DuplicateName(name));
                }
            }
        }

        debug!("Flattened index: {} entries", entries.len());
        Ok(Self { entries })
    }
}

fn parse_payload(name: &str, kind: &str, value: &str) -> Result<IndexPayload> {
    let kind = EntryKind::from_str(kind).map_err(|_| Error::MalformedIndexEntry {
        name: name.to_string(),
        message: format!("unknown entry type '{}'", kind),
    })?;

    match kind {
        EntryKind::Offset => {
            let text = value.trim();
            let text = text
                .strip_prefix("0x")
                .or_else(|| text.strip_prefix("0X"))
                .unwrap_or(text);
            let delta =
                u64::from_str_radix(text, 16).map_err(|e| Error::MalformedIndexEntry {
                    name: name.to_string(),
                    message: format!("invalid hex offset '{}': {}", value, e),
                })?;
            Ok(IndexPayload::Offset(delta))
        }
        EntryKind::Signature => {
            let pattern = Pattern::parse(value).map_err(|e| Error::MalformedIndexEntry {
                name: name.to_string(),
                message: e.to_string(),
            })?;
            Ok(IndexPayload::Signature(pattern))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "Global": [
            { "name": "GcHeap", "type": "offset", "value": "1a2b" },
            { "name": "ExecuteMethod", "type": "signature", "value": "48 8B ?? E8" }
        ],
        "MethodTable": [
            { "name": "SlotCount", "type": "Offset", "value": "40" },
            { "name": "ParentChain", "type": "SIGNATURE", "value": "AA ?? CC" }
        ]
    }"#;

    #[test]
    fn test_flatten_and_lookup() {
        let store: IndexStore = SAMPLE.parse().unwrap();
        assert_eq!(store.len(), 4);

        // Global entries keep their bare name.
        assert!(store.entry("GcHeap").is_some());
        assert!(store.entry("ExecuteMethod").is_some());

        // Other scopes are joined with a dot.
        assert!(store.entry("MethodTable.SlotCount").is_some());
        assert!(store.entry("MethodTable.ParentChain").is_some());
        assert!(store.entry("SlotCount").is_none());
    }

    #[test]
    fn test_every_flattened_name_resolves_to_its_entry() {
        let store: IndexStore = SAMPLE.parse().unwrap();
        for name in store.names().map(str::to_string).collect::<Vec<_>>() {
            let entry = store.entry(&name).unwrap();
            assert_eq!(entry.name, name);
        }
    }

    #[test]
    fn test_kind_is_case_insensitive() {
        let store: IndexStore = SAMPLE.parse().unwrap();
        let entry = store.entry("MethodTable.SlotCount").unwrap();
        assert_eq!(entry.payload.kind(), EntryKind::Offset);
        let entry = store.entry("MethodTable.ParentChain").unwrap();
        assert_eq!(entry.payload.kind(), EntryKind::Signature);
    }

    #[test]
    fn test_offset_resolves_against_zero_base() {
        let store: IndexStore = SAMPLE.parse().unwrap();
        let resolved = store.resolve("GcHeap", Pointer::NULL, &[]).unwrap();
        assert_eq!(resolved, Pointer::new(0x1A2B));
    }

    #[test]
    fn test_offset_resolves_against_base() {
        let store: IndexStore = SAMPLE.parse().unwrap();
        let resolved = store
            .resolve("GcHeap", Pointer::new(0x1400_0000), &[])
            .unwrap();
        assert_eq!(resolved, Pointer::new(0x1400_1A2B));
    }

    #[test]
    fn test_signature_resolves_to_first_match() {
        let store: IndexStore = SAMPLE.parse().unwrap();
        let image = [0x01, 0xAA, 0xFF, 0xCC, 0x02];
        let resolved = store
            .resolve("MethodTable.ParentChain", Pointer::new(0x1000), &image)
            .unwrap();
        assert_eq!(resolved, Pointer::new(0x1001));
    }

    #[test]
    fn test_signature_absent_from_image_fails() {
        let store: IndexStore = SAMPLE.parse().unwrap();
        let image = [0x00; 16];
        assert!(matches!(
            store.resolve("MethodTable.ParentChain", Pointer::new(0x1000), &image),
            Err(Error::PatternNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_name_fails() {
        let store: IndexStore = SAMPLE.parse().unwrap();
        assert!(matches!(
            store.resolve("Nope", Pointer::NULL, &[]),
            Err(Error::NameNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_kind_aborts_load() {
        let doc = r#"{ "Global": [ { "name": "X", "type": "rva", "value": "10" } ] }"#;
        assert!(matches!(
            doc.parse::<IndexStore>(),
            Err(Error::MalformedIndexEntry { .. })
        ));
    }

    #[test]
    fn test_malformed_hex_aborts_load() {
        let doc = r#"{ "Global": [ { "name": "X", "type": "offset", "value": "zz" } ] }"#;
        assert!(matches!(
            doc.parse::<IndexStore>(),
            Err(Error::MalformedIndexEntry { .. })
        ));
    }

    #[test]
    fn test_malformed_signature_aborts_load() {
        let doc = r#"{ "Global": [ { "name": "X", "type": "signature", "value": "A" } ] }"#;
        assert!(matches!(
            doc.parse::<IndexStore>(),
            Err(Error::MalformedIndexEntry { .. })
        ));
    }

    #[test]
    fn test_one_bad_entry_invalidates_whole_load() {
        let doc = r#"{
            "Global": [
                { "name": "Good", "type": "offset", "value": "10" },
                { "name": "Bad", "type": "offset", "value": "not-hex" }
            ]
        }"#;
        assert!(doc.parse::<IndexStore>().is_err());
    }

    #[test]
    fn test_duplicate_flattened_name_fails() {
        let doc = r#"{
            "Global": [
                { "name": "Scope.X", "type": "offset", "value": "10" }
            ],
            "Scope": [
                { "name": "X", "type": "offset", "value": "20" }
            ]
        }"#;
        assert!(matches!(
            doc.parse::<IndexStore>(),
            Err(Error::DuplicateName(name)) if name == "Scope.X"
        ));
    }

    #[test]
    fn test_repeated_scope_blocks_with_colliding_names_fail() {
        // Two blocks for the same scope each define X; neither may silently
        // shadow the other.
        let doc = r#"{
            "MethodTable": [
                { "name": "X", "type": "offset", "value": "10" }
            ],
            "MethodTable": [
                { "name": "X", "type": "offset", "value": "20" }
            ]
        }"#;
        assert!(matches!(
            doc.parse::<IndexStore>(),
            Err(Error::DuplicateName(name)) if name == "MethodTable.X"
        ));
    }

    #[test]
    fn test_repeated_global_blocks_with_colliding_names_fail() {
        let doc = r#"{
            "Global": [
                { "name": "GcHeap", "type": "offset", "value": "10" }
            ],
            "Global": [
                { "name": "GcHeap", "type": "offset", "value": "20" }
            ]
        }"#;
        assert!(matches!(
            doc.parse::<IndexStore>(),
            Err(Error::DuplicateName(name)) if name == "GcHeap"
        ));
    }

    #[test]
    fn test_repeated_scope_blocks_with_disjoint_names_keep_all_entries() {
        // Repeated blocks for one scope are treated as one scope; no entry
        // is dropped.
        let doc = r#"{
            "MethodTable": [
                { "name": "X", "type": "offset", "value": "10" }
            ],
            "MethodTable": [
                { "name": "Y", "type": "offset", "value": "20" }
            ]
        }"#;
        let store: IndexStore = doc.parse().unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.resolve("MethodTable.X", Pointer::NULL, &[]).unwrap(),
            Pointer::new(0x10)
        );
        assert_eq!(
            store.resolve("MethodTable.Y", Pointer::NULL, &[]).unwrap(),
            Pointer::new(0x20)
        );
    }

    #[test]
    fn test_hex_prefix_is_tolerated() {
        let doc = r#"{ "Global": [ { "name": "X", "type": "offset", "value": "0x40" } ] }"#;
        let store: IndexStore = doc.parse().unwrap();
        let resolved = store.resolve("X", Pointer::NULL, &[]).unwrap();
        assert_eq!(resolved, Pointer::new(0x40));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let store = IndexStore::load(file.path()).unwrap();
        assert_eq!(store.len(), 4);
    }
}
