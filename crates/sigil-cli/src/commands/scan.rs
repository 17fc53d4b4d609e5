//! Scan command: find a byte pattern in an image file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use sigil_core::Pattern;
use tracing::info;

use super::parse_hex_address;

pub fn run(image_path: &Path, pattern_text: &str, all: bool, base: &str) -> Result<()> {
    let base = parse_hex_address(base)?;
    let pattern = Pattern::parse(pattern_text)?;
    let image = fs::read(image_path)
        .with_context(|| format!("failed to read image {}", image_path.display()))?;
    info!(
        "Scanning {} bytes from {} for pattern {}",
        image.len(),
        image_path.display(),
        pattern
    );

    println!(
        "Scanning {} ({} bytes) for {}",
        image_path.display(),
        image.len(),
        pattern.to_string().yellow()
    );

    if all {
        let mut count = 0usize;
        for offset in pattern.find_all(&image) {
            println!("  0x{:X} (offset 0x{:X})", base + offset as u64, offset);
            count += 1;
        }
        if count == 0 {
            anyhow::bail!("pattern not found");
        }
        println!("{} match(es)", count);
    } else {
        let offset = pattern.find(&image)?;
        println!("  0x{:X} (offset 0x{:X})", base + offset as u64, offset);
    }

    Ok(())
}
