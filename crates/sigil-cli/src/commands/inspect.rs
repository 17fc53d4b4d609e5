//! Inspect command: list the flattened entries of an index document.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use sigil_core::{EntryKind, IndexPayload, IndexStore};

pub fn run(index_path: &Path) -> Result<()> {
    let store = IndexStore::load(index_path)
        .with_context(|| format!("failed to load index {}", index_path.display()))?;

    println!(
        "{} ({} entries)",
        index_path.display().to_string().bold(),
        store.len()
    );
    println!();

    for entry in store.entries() {
        match &entry.payload {
            IndexPayload::Offset(delta) => {
                println!(
                    "  {:<40} {:>9}  0x{:X}",
                    entry.name,
                    EntryKind::Offset.to_string().cyan(),
                    delta
                );
            }
            IndexPayload::Signature(pattern) => {
                println!(
                    "  {:<40} {:>9}  {}",
                    entry.name,
                    EntryKind::Signature.to_string().yellow(),
                    pattern
                );
            }
        }
    }

    Ok(())
}
