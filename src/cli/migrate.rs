//! Migrate command: apply pending migrations to a configuration file.

use super::DirectoryArgs;
use crate::migration::{MigrationReport, MigrationRunner};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the migrate command.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Configuration file to migrate (created if missing)
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    #[command(flatten)]
    pub dir: DirectoryArgs,

    /// Show the migrated configuration without writing it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the migrate command.
pub fn run_migrate(args: &MigrateArgs) -> Result<MigrationReport> {
    let runner = MigrationRunner::new(&args.config, args.dir.resolve());

    if args.dry_run {
        let (document, report) = runner
            .run_in_memory()
            .with_context(|| format!("Failed to migrate {}", args.config.display()))?;
        print_summary(&report);
        println!();
        print!("{}", document.serialize()?);
        println!();
        println!("Dry run: No changes made.");
        return Ok(report);
    }

    let report = runner
        .run()
        .with_context(|| format!("Failed to migrate {}", args.config.display()))?;
    print_summary(&report);

    Ok(report)
}

fn print_summary(report: &MigrationReport) {
    if report.is_up_to_date() {
        println!("Already up to date at version {}.", report.final_version);
        return;
    }

    println!(
        "Migrated from version {} to {}:",
        report.starting_version, report.final_version
    );
    for applied in &report.applied {
        println!(
            "  v{} {} (+{} -{} ~{})",
            applied.version,
            applied.path.display(),
            applied.added,
            applied.removed,
            applied.modified
        );
        for key in &applied.missing {
            println!("    not found, skipped remove: {}", key);
        }
    }
}
