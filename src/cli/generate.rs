//! Generate command: scaffold a new migration file.

use super::DirectoryArgs;
use crate::migration::scaffold;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the generate command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Short description, used for the file name and the `config` label
    #[arg(value_name = "NAME")]
    pub name: String,

    #[command(flatten)]
    pub dir: DirectoryArgs,

    /// Version to assign (default: one above the highest existing version)
    #[arg(long)]
    pub version: Option<u64>,
}

/// Run the generate command.
pub fn run_generate(args: &GenerateArgs) -> Result<PathBuf> {
    let dir = args.dir.resolve();
    let path = scaffold::generate(&dir, &args.name, args.version)
        .with_context(|| format!("Failed to generate migration in {}", dir.display()))?;

    println!("Created {}", path.display());
    Ok(path)
}
