use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "sigil")]
#[command(about = "Resolve unexported symbols in binary images")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load an index document and list its flattened entries
    Inspect {
        /// Path to the index JSON document
        index: PathBuf,
    },
    /// Scan a binary file for a byte pattern
    Scan {
        /// Path to the image file to scan
        image: PathBuf,

        /// Pattern text, e.g. "48 8B ?? E8"
        #[arg(short, long)]
        pattern: String,

        /// Report every match instead of only the first
        #[arg(long)]
        all: bool,

        /// Base address added to reported offsets (hex)
        #[arg(short, long, default_value = "0")]
        base: String,
    },
    /// Resolve names from an index against an image file
    Resolve {
        /// Path to the index JSON document
        #[arg(short, long)]
        index: PathBuf,

        /// Path to the image file (needed for signature entries)
        #[arg(long)]
        image: Option<PathBuf>,

        /// Module base address (hex)
        #[arg(short, long)]
        base: String,

        /// Logical names to resolve (all index entries when omitted)
        names: Vec<String>,
    },
    /// Resolve names through a debug-symbol (PDB) file
    Symbols {
        /// Path to the PDB file
        #[arg(long)]
        pdb: PathBuf,

        /// Module base address added to symbol offsets (hex)
        #[arg(short, long, default_value = "0")]
        base: String,

        /// Symbol names to resolve
        names: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sigil=info".parse()?))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Inspect { index } => commands::inspect::run(&index),
        Command::Scan {
            image,
            pattern,
            all,
            base,
        } => commands::scan::run(&image, &pattern, all, &base),
        Command::Resolve {
            index,
            image,
            base,
            names,
        } => commands::resolve::run(&index, image.as_deref(), &base, &names),
        Command::Symbols { pdb, base, names } => commands::symbols::run(&pdb, &base, &names),
    }
}
