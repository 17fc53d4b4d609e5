//! Symbols command: resolve names through a debug-symbol (PDB) file.

use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;
use sigil_core::SymbolStore;
use tracing::info;

use super::parse_hex_address;

pub fn run(pdb_path: &Path, base: &str, names: &[String]) -> Result<()> {
    let base = parse_hex_address(base)?;
    let store: SymbolStore = SymbolStore::open(pdb_path)?;
    info!("Opened symbol image {}", pdb_path.display());

    if names.is_empty() {
        anyhow::bail!("no symbol names given");
    }

    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let offsets = store.resolve_many(&name_refs)?;

    for (name, offset) in names.iter().zip(offsets) {
        let absolute = base.wrapping_add_signed(offset);
        println!(
            "  {:<40} offset 0x{:X}  ->  {}",
            name,
            offset,
            format!("0x{:X}", absolute).green()
        );
    }

    Ok(())
}
