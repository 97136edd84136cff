//! Migration runner: load, gate, apply, persist.
//!
//! A run loads the configuration once, applies every migration whose version
//! is above the tracked version, and writes the file once at the end. Nothing
//! is written if any step fails, so an interrupted run leaves the original
//! file as it was.

use super::discovery::discover;
use super::{MigrationDescriptor, Operation};
use crate::document::ConfigDocument;
use crate::error::{MigrateError, MigrateResult};
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Summary of one applied migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub path: PathBuf,
    pub version: u64,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    /// Remove paths that did not resolve to an existing key.
    pub missing: Vec<String>,
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Version recorded in the configuration before the run.
    pub starting_version: u64,
    /// Version recorded after the run.
    pub final_version: u64,
    pub applied: Vec<AppliedMigration>,
    /// Files skipped by the version gate.
    pub skipped: Vec<PathBuf>,
}

impl MigrationReport {
    /// True when no migration had to be applied.
    pub fn is_up_to_date(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Applies a directory of migrations to one configuration file.
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    config_path: PathBuf,
    migrations_dir: PathBuf,
}

impl MigrationRunner {
    pub fn new(config_path: impl Into<PathBuf>, migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            migrations_dir: migrations_dir.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Run the full cycle and write the result back to the configuration file.
    pub fn run(&self) -> MigrateResult<MigrationReport> {
        let (document, report) = self.run_in_memory()?;
        document.save(&self.config_path)?;

        info!(
            config = %self.config_path.display(),
            from = report.starting_version,
            to = report.final_version,
            applied = report.applied.len(),
            "Configuration written"
        );
        Ok(report)
    }

    /// Run the full cycle without writing anything.
    ///
    /// Returns the migrated document so callers can inspect or render it.
    pub fn run_in_memory(&self) -> MigrateResult<(ConfigDocument, MigrationReport)> {
        let mut document = ConfigDocument::load(&self.config_path)?;
        let migrations = self.plan()?;
        let report = apply_migrations(&mut document, &migrations);
        Ok((document, report))
    }

    /// Discover and parse every migration file, in file name order.
    ///
    /// Any unparsable file fails the whole run, as does a version declared by
    /// more than one file.
    pub fn plan(&self) -> MigrateResult<Vec<MigrationDescriptor>> {
        let files = discover(&self.migrations_dir)?;
        debug!(
            dir = %self.migrations_dir.display(),
            count = files.len(),
            "Discovered migration files"
        );

        let mut seen: HashMap<u64, PathBuf> = HashMap::new();
        let mut migrations = Vec::with_capacity(files.len());
        for file in files {
            let migration = MigrationDescriptor::load(&file)?;
            if let Some(first) = seen.insert(migration.version(), file.clone()) {
                return Err(MigrateError::DuplicateVersion {
                    version: migration.version(),
                    first,
                    second: file,
                });
            }
            migrations.push(migration);
        }

        Ok(migrations)
    }
}

/// Apply migrations to an in-memory document, in the order given.
///
/// A migration applies only if its version is above the document's current
/// version; after it applies, its version becomes the current version.
pub fn apply_migrations(
    document: &mut ConfigDocument,
    migrations: &[MigrationDescriptor],
) -> MigrationReport {
    let mut report = MigrationReport {
        starting_version: document.version(),
        final_version: document.version(),
        ..Default::default()
    };

    for migration in migrations {
        let current = document.version();
        if migration.version() <= current {
            if migration.version() > report.starting_version {
                warn!(
                    migration = %migration.path().display(),
                    version = migration.version(),
                    current,
                    "Skipping migration whose version is below one applied earlier in this run; \
                     file name order does not match version order"
                );
            } else {
                debug!(
                    migration = %migration.path().display(),
                    version = migration.version(),
                    current,
                    "Skipping already applied migration"
                );
            }
            report.skipped.push(migration.path().to_path_buf());
            continue;
        }

        let applied = apply_one(document, migration);
        info!(
            migration = %migration.path().display(),
            version = applied.version,
            added = applied.added,
            removed = applied.removed,
            modified = applied.modified,
            "Applied migration"
        );
        report.applied.push(applied);
    }

    report.final_version = document.version();
    report
}

/// Apply a single migration: adds, then removes, then modifies.
fn apply_one(document: &mut ConfigDocument, migration: &MigrationDescriptor) -> AppliedMigration {
    for (key, value) in migration.add() {
        debug!(op = %Operation::Add, key = %key, "Applying operation");
        document.mutate(Operation::Add, key, value.clone());
    }

    let mut missing = Vec::new();
    for key in migration.remove() {
        debug!(op = %Operation::Remove, key = %key, "Applying operation");
        if !document.mutate(Operation::Remove, key, Value::Null) {
            warn!(
                migration = %migration.path().display(),
                key = %key,
                "Key not found, nothing to remove"
            );
            missing.push(key.clone());
        }
    }

    for (key, value) in migration.modify() {
        debug!(op = %Operation::Modify, key = %key, "Applying operation");
        document.mutate(Operation::Modify, key, value.clone());
    }

    document.set_version(migration.version());

    AppliedMigration {
        path: migration.path().to_path_buf(),
        version: migration.version(),
        added: migration.add().len(),
        removed: migration.remove().len() - missing.len(),
        modified: migration.modify().len(),
        missing,
    }
}
