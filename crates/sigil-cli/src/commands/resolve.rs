//! Resolve command: resolve logical names from an index against an image.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use sigil_core::{ImageBuffer, ImportRegistry, IndexProvider, IndexStore, Pointer};
use tracing::{info, warn};

use super::parse_hex_address;

pub fn run(
    index_path: &Path,
    image_path: Option<&Path>,
    base: &str,
    names: &[String],
) -> Result<()> {
    let base = Pointer::new(parse_hex_address(base)?);
    let store = IndexStore::load(index_path)
        .with_context(|| format!("failed to load index {}", index_path.display()))?;
    info!(
        "Loaded index {} ({} entries)",
        index_path.display(),
        store.len()
    );

    let names: Vec<String> = if names.is_empty() {
        store.names().map(str::to_string).collect()
    } else {
        names.to_vec()
    };

    let (provider, memory) = match image_path {
        Some(path) => {
            let image = ImageBuffer::from_file(path, base.as_u64())
                .with_context(|| format!("failed to read image {}", path.display()))?;
            let provider = IndexProvider::new(store, image.bytes().to_vec());
            (provider, image)
        }
        None => {
            // Offset-only resolution; signature entries will fail with a
            // typed Unsupported error.
            (
                IndexProvider::without_image(store),
                ImageBuffer::new(base.as_u64(), Vec::new()),
            )
        }
    };

    let mut registry = ImportRegistry::bind(provider, memory, base, names.iter().cloned())?;

    let mut failures = 0usize;
    for name in &names {
        match registry.get(name) {
            Ok(address) => println!("  {:<40} {}", name, address.to_string().green()),
            Err(e) => {
                failures += 1;
                warn!("Failed to resolve '{}': {}", name, e);
                println!("  {:<40} {}", name, e.to_string().red());
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} names failed to resolve", failures, names.len());
    }
    Ok(())
}
