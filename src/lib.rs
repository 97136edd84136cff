//! Config Migrate Library
//!
//! Applies ordered, versioned migration files (add / remove / modify
//! operations on dotted key paths) to a YAML configuration file. The applied
//! version is stored in the configuration file itself, so re-running against
//! the same directory is a no-op.

pub mod cli;
pub mod document;
pub mod error;
pub mod logging;
pub mod migration;

pub use document::ConfigDocument;
pub use error::{ErrorCode, MigrateError, MigrateResult};
pub use migration::{MigrationDescriptor, MigrationReport, MigrationRunner, Operation};

use std::path::Path;

/// Apply every pending migration in `migrations_dir` to the file at
/// `config_path` and write the result back.
///
/// Either the whole run completes and the file is written once, or an error is
/// returned and the file is left untouched.
pub fn apply(config_path: &Path, migrations_dir: &Path) -> MigrateResult<MigrationReport> {
    MigrationRunner::new(config_path, migrations_dir).run()
}
