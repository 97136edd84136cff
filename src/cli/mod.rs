//! CLI command definitions for config-migrate
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod generate;
pub mod migrate;
pub mod operation;

use crate::error::{ErrorCode, MigrateError};
use clap::{Args, Parser, Subcommand};
use generate::GenerateArgs;
use migrate::MigrateArgs;
use operation::{OperationArgs, RemoveArgs};
use std::path::PathBuf;

/// Environment variable naming the migrations directory.
pub const DIRECTORY_ENV: &str = "CONFIG_MIGRATE_DIRECTORY";

/// Migrations directory used when neither the flag nor the env var is set.
pub const DEFAULT_DIRECTORY: &str = "migrations";

/// Versioned, declarative migrations for YAML configuration files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply pending migrations to a configuration file
    Migrate(MigrateArgs),

    /// Create a new, empty migration file
    Generate(GenerateArgs),

    /// Append an `add` operation to the latest migration
    Add(OperationArgs),

    /// Append a `remove` operation to the latest migration
    Remove(RemoveArgs),

    /// Append a `modify` operation to the latest migration
    Modify(OperationArgs),
}

/// Migrations directory selection shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct DirectoryArgs {
    /// Migrations directory (default: $CONFIG_MIGRATE_DIRECTORY or ./migrations)
    #[arg(short = 'D', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

impl DirectoryArgs {
    /// Resolve the directory: flag, then environment, then default.
    pub fn resolve(&self) -> PathBuf {
        self.directory
            .clone()
            .or_else(|| std::env::var(DIRECTORY_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DIRECTORY))
    }
}

/// Code of the first engine error in `err`'s context chain, if any.
pub fn error_code(err: &anyhow::Error) -> Option<ErrorCode> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<MigrateError>())
        .map(MigrateError::code)
}

/// One-line failure report printed by the binary.
pub fn render_error(err: &anyhow::Error) -> String {
    match error_code(err) {
        Some(code) => format!("error[{}]: {:#}", code, err),
        None => format!("error: {:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_parse_migrate_command() {
        let cli = Cli::parse_from([
            "config-migrate",
            "migrate",
            "config.yaml",
            "--directory",
            "db/migrations",
            "--dry-run",
        ]);

        match cli.command {
            Command::Migrate(args) => {
                assert_eq!(args.config, PathBuf::from("config.yaml"));
                assert_eq!(args.dir.resolve(), PathBuf::from("db/migrations"));
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.log, "2");
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_generate_command() {
        let cli = Cli::parse_from(["config-migrate", "-v", "generate", "add cache", "--version", "7"]);

        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.name, "add cache");
                assert_eq!(args.version, Some(7));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(cli.verbose);
    }

    #[test]
    fn test_parse_operation_commands() {
        let cli = Cli::parse_from(["config-migrate", "modify", "database.port", "5433"]);
        match cli.command {
            Command::Modify(args) => {
                assert_eq!(args.key, "database.port");
                assert_eq!(args.value.as_deref(), Some("5433"));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::parse_from(["config-migrate", "remove", "features.legacy", "-D", "m"]);
        match cli.command {
            Command::Remove(args) => {
                assert_eq!(args.key, "features.legacy");
                assert_eq!(args.dir.directory, Some(PathBuf::from("m")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_render_error_includes_code() {
        let result: Result<(), MigrateError> = Err(MigrateError::NoMigrations {
            path: PathBuf::from("migrations"),
        });
        let err = result.context("Failed to append add a").unwrap_err();

        assert_eq!(error_code(&err), Some(ErrorCode::NoMigrations));
        assert_eq!(
            render_error(&err),
            "error[NO_MIGRATIONS]: Failed to append add a: no migration files found in migrations"
        );
    }

    #[test]
    fn test_render_error_without_code() {
        let err = anyhow::anyhow!("Failed to open log file");
        assert_eq!(error_code(&err), None);
        assert_eq!(render_error(&err), "error: Failed to open log file");
    }

    #[test]
    fn test_explicit_directory_wins() {
        let args = DirectoryArgs {
            directory: Some(PathBuf::from("explicit")),
        };
        assert_eq!(args.resolve(), PathBuf::from("explicit"));
    }
}
