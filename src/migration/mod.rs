//! Migration files and the engine that applies them.
//!
//! A migration file is a YAML document of the form:
//!
//! ```yaml
//! config: add-cache          # informational only
//! version: 2                 # required, positive
//! add:
//!   cache.enabled: true
//! remove:
//!   features.legacy: null
//! modify:
//!   database.port: 5433
//! ```
//!
//! Operations run add, then remove, then modify, whatever order the sections
//! appear in the file.

pub mod discovery;
pub mod runner;
pub mod scaffold;

pub use discovery::discover;
pub use runner::{AppliedMigration, MigrationReport, MigrationRunner};

use crate::document::{VERSION_KEY, describe};
use crate::error::{MigrateError, MigrateResult};
use serde::Deserialize;
use serde_yaml::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Kind of change a migration entry makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Remove,
    Modify,
}

impl Operation {
    /// All operations, in application order.
    pub const ALL: [Operation; 3] = [Operation::Add, Operation::Remove, Operation::Modify];

    /// Section name in a migration file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Remove => "remove",
            Operation::Modify => "modify",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk shape, before validation.
#[derive(Debug, Deserialize)]
struct RawMigration {
    #[serde(default)]
    config: Option<String>,
    #[serde(default)]
    version: Option<Value>,
    #[serde(default)]
    add: Value,
    #[serde(default)]
    remove: Value,
    #[serde(default)]
    modify: Value,
}

/// One parsed migration file.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationDescriptor {
    path: PathBuf,
    name: Option<String>,
    version: u64,
    add: Vec<(String, Value)>,
    remove: Vec<String>,
    modify: Vec<(String, Value)>,
}

impl MigrationDescriptor {
    /// Read and parse a migration file.
    pub fn load(path: &Path) -> MigrateResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| MigrateError::io(path, e))?;
        Self::parse(&content, path)
    }

    /// Parse migration text. `path` is kept for diagnostics.
    pub fn parse(content: &str, path: &Path) -> MigrateResult<Self> {
        let raw: RawMigration =
            serde_yaml::from_str(content).map_err(|source| MigrateError::MigrationParse {
                path: path.to_path_buf(),
                source,
            })?;

        let version = match raw.version {
            None | Some(Value::Null) => {
                return Err(MigrateError::invalid_migration(
                    path,
                    "missing required field `version`",
                ));
            }
            Some(value) => match value.as_u64() {
                Some(version) if version > 0 => version,
                _ => {
                    return Err(MigrateError::invalid_migration(
                        path,
                        format!("version must be a positive integer, found {}", describe(&value)),
                    ));
                }
            },
        };

        let add = section_entries(raw.add, Operation::Add, path)?;
        let modify = section_entries(raw.modify, Operation::Modify, path)?;

        let mut remove: Vec<String> = Vec::new();
        for (key, _) in section_entries(raw.remove, Operation::Remove, path)? {
            if !remove.contains(&key) {
                remove.push(key);
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            name: raw.config,
            version,
            add,
            remove,
            modify,
        })
    }

    /// File this migration was parsed from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Informational `config` label.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Add entries in declaration order.
    pub fn add(&self) -> &[(String, Value)] {
        &self.add
    }

    /// Key paths to remove, in declaration order.
    pub fn remove(&self) -> &[String] {
        &self.remove
    }

    /// Modify entries in declaration order.
    pub fn modify(&self) -> &[(String, Value)] {
        &self.modify
    }

    /// Total number of operations across all sections.
    pub fn operation_count(&self) -> usize {
        self.add.len() + self.remove.len() + self.modify.len()
    }
}

/// Validate one operation section into `(key path, value)` pairs.
///
/// A missing or null section is empty. `remove` may also be a plain list of
/// key paths.
fn section_entries(
    section: Value,
    operation: Operation,
    path: &Path,
) -> MigrateResult<Vec<(String, Value)>> {
    match section {
        Value::Null => Ok(Vec::new()),
        Value::Mapping(mapping) => mapping
            .into_iter()
            .map(|(key, value)| -> MigrateResult<(String, Value)> {
                Ok((key_path(key, operation, path)?, value))
            })
            .collect(),
        Value::Sequence(items) if operation == Operation::Remove => items
            .into_iter()
            .map(|item| -> MigrateResult<(String, Value)> {
                Ok((key_path(item, operation, path)?, Value::Null))
            })
            .collect(),
        other => Err(MigrateError::invalid_migration(
            path,
            format!(
                "`{}` must be a mapping of key paths, found {}",
                operation,
                describe(&other)
            ),
        )),
    }
}

/// Every segment must be non-empty, and the top-level `version` key belongs to
/// the runner.
fn key_path(key: Value, operation: Operation, path: &Path) -> MigrateResult<String> {
    let key = match key {
        Value::String(key) if !key.is_empty() => key,
        other => {
            return Err(MigrateError::invalid_migration(
                path,
                format!("`{}` has an invalid key path: {}", operation, describe(&other)),
            ));
        }
    };

    if key.split('.').any(str::is_empty) {
        return Err(MigrateError::invalid_migration(
            path,
            format!("`{}` key path `{}` has an empty segment", operation, key),
        ));
    }
    if key.split('.').next() == Some(VERSION_KEY) {
        return Err(MigrateError::invalid_migration(
            path,
            format!(
                "`{}` cannot change `{}`, it is set by the migration runner",
                operation, VERSION_KEY
            ),
        ));
    }

    Ok(key)
}
