//! Writing migration files: generating new ones and appending operations.

use super::discovery::{discover, latest};
use super::{MigrationDescriptor, Operation};
use crate::document::{describe, leading_comments};
use crate::error::{MigrateError, MigrateResult};
use chrono::{DateTime, Utc};
use heck::ToSnakeCase;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name for a migration: zero-padded version plus a snake_case slug.
pub fn migration_file_name(version: u64, name: &str) -> String {
    format!("{:04}_{}.yaml", version, name.to_snake_case())
}

/// One above the highest version declared in `dir`, or 1 when there is none.
pub fn next_version(dir: &Path) -> MigrateResult<u64> {
    if !dir.exists() {
        return Ok(1);
    }

    let mut highest: u64 = 0;
    for file in discover(dir)? {
        highest = highest.max(MigrationDescriptor::load(&file)?.version());
    }
    highest.checked_add(1).ok_or_else(|| {
        MigrateError::invalid_migration(dir, format!("no version left above {}", highest))
    })
}

/// Interpret a command-line value as YAML, falling back to a plain string.
///
/// `5433` becomes an integer, `true` a boolean, `[a, b]` a sequence.
pub fn parse_value(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::String(raw.to_string());
    }
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn render_template(name: &str, version: u64, created: DateTime<Utc>) -> String {
    let label = describe(&Value::String(name.to_string()));
    format!(
        "# Generated {}\nconfig: {}\nversion: {}\nadd: {{}}\nremove: {{}}\nmodify: {{}}\n",
        created.to_rfc3339(),
        label,
        version
    )
}

/// Create a new, empty migration file in `dir`.
///
/// The directory is created if needed. Without an explicit `version`, the
/// next free version is used. An existing file is never overwritten.
pub fn generate(dir: &Path, name: &str, version: Option<u64>) -> MigrateResult<PathBuf> {
    let version = match version {
        Some(version) => version,
        None => next_version(dir)?,
    };

    let path = dir.join(migration_file_name(version, name));
    if version == 0 {
        return Err(MigrateError::invalid_migration(
            &path,
            "version must be a positive integer",
        ));
    }
    if path.exists() {
        return Err(MigrateError::AlreadyExists { path });
    }

    fs::create_dir_all(dir).map_err(|e| MigrateError::io(dir, e))?;
    fs::write(&path, render_template(name, version, Utc::now()))
        .map_err(|e| MigrateError::io(&path, e))?;

    info!(migration = %path.display(), version, "Generated migration");
    Ok(path)
}

/// Append one operation to the latest migration file in `dir`.
///
/// Returns the path of the file that was updated. The file is re-validated
/// before it is written.
pub fn append_operation(
    dir: &Path,
    operation: Operation,
    key_path: &str,
    value: Value,
) -> MigrateResult<PathBuf> {
    let path = latest(dir)?.ok_or_else(|| MigrateError::NoMigrations {
        path: dir.to_path_buf(),
    })?;
    if key_path.is_empty() {
        return Err(MigrateError::invalid_migration(&path, "key path is empty"));
    }

    let content = fs::read_to_string(&path).map_err(|e| MigrateError::io(&path, e))?;
    let mut root = match serde_yaml::from_str::<Value>(&content) {
        Ok(Value::Mapping(root)) => root,
        Ok(other) => {
            return Err(MigrateError::invalid_migration(
                &path,
                format!("expected a mapping, found {}", describe(&other)),
            ));
        }
        Err(source) => return Err(MigrateError::MigrationParse { path, source }),
    };

    let key = Value::String(key_path.to_string());
    let section = root
        .entry(Value::String(operation.as_str().to_string()))
        .or_insert(Value::Null);
    if section.is_null() {
        *section = Value::Mapping(Mapping::new());
    }
    match section {
        Value::Mapping(entries) => {
            entries.insert(key, value);
        }
        Value::Sequence(items) if operation == Operation::Remove => {
            if !items.contains(&key) {
                items.push(key);
            }
        }
        other => {
            return Err(MigrateError::invalid_migration(
                &path,
                format!(
                    "`{}` must be a mapping of key paths, found {}",
                    operation,
                    describe(other)
                ),
            ));
        }
    }

    let body = serde_yaml::to_string(&root).map_err(|source| MigrateError::Serialize { source })?;
    let header = leading_comments(&content);
    let rendered = if header.is_empty() {
        body
    } else {
        format!("{}\n{}", header.join("\n"), body)
    };

    MigrationDescriptor::parse(&rendered, &path)?;
    fs::write(&path, rendered).map_err(|e| MigrateError::io(&path, e))?;

    info!(
        migration = %path.display(),
        op = %operation,
        key = %key_path,
        "Appended operation"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_migration_file_name() {
        assert_eq!(
            migration_file_name(3, "Add Cache Settings"),
            "0003_add_cache_settings.yaml"
        );
        assert_eq!(migration_file_name(12, "dark-mode"), "0012_dark_mode.yaml");
        assert_eq!(migration_file_name(12345, "big"), "12345_big.yaml");
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("5433"), Value::from(5433));
        assert_eq!(parse_value("true"), Value::from(true));
        assert_eq!(parse_value("hello world"), Value::from("hello world"));
        assert_eq!(
            parse_value("[a, b]"),
            Value::Sequence(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(parse_value("a: [1"), Value::from("a: [1"));
    }

    #[test]
    fn test_generate_numbers_sequentially() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("migrations");

        let first = generate(&dir, "initial setup", None).unwrap();
        let second = generate(&dir, "add cache", None).unwrap();

        assert_eq!(first, dir.join("0001_initial_setup.yaml"));
        assert_eq!(second, dir.join("0002_add_cache.yaml"));

        let parsed = MigrationDescriptor::load(&second).unwrap();
        assert_eq!(parsed.version(), 2);
        assert_eq!(parsed.name(), Some("add cache"));
        assert_eq!(parsed.operation_count(), 0);
    }

    #[test]
    fn test_generate_explicit_version() {
        let temp = TempDir::new().unwrap();
        let path = generate(temp.path(), "jump", Some(10)).unwrap();
        assert_eq!(path, temp.path().join("0010_jump.yaml"));
        assert_eq!(next_version(temp.path()).unwrap(), 11);
    }

    #[test]
    fn test_next_version_at_maximum_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("9999_last.yaml"),
            format!("version: {}\n", u64::MAX),
        )
        .unwrap();

        let err = next_version(temp.path()).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidMigration { .. }));
        assert!(generate(temp.path(), "overflow", None).is_err());
    }

    #[test]
    fn test_generate_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        generate(temp.path(), "same", Some(1)).unwrap();
        let err = generate(temp.path(), "same", Some(1)).unwrap_err();
        assert!(matches!(err, MigrateError::AlreadyExists { .. }));
    }

    #[test]
    fn test_generate_rejects_zero_version() {
        let temp = TempDir::new().unwrap();
        assert!(generate(temp.path(), "zero", Some(0)).is_err());
    }

    #[test]
    fn test_append_to_latest_migration() {
        let temp = TempDir::new().unwrap();
        generate(temp.path(), "first", None).unwrap();
        let latest = generate(temp.path(), "second", None).unwrap();

        let updated = append_operation(
            temp.path(),
            Operation::Add,
            "cache.ttl",
            parse_value("3600"),
        )
        .unwrap();
        append_operation(temp.path(), Operation::Remove, "features.old", Value::Null).unwrap();
        append_operation(temp.path(), Operation::Modify, "db.port", Value::from(5433)).unwrap();

        assert_eq!(updated, latest);
        let parsed = MigrationDescriptor::load(&latest).unwrap();
        assert_eq!(parsed.version(), 2);
        assert_eq!(parsed.add(), &[("cache.ttl".to_string(), Value::from(3600))]);
        assert_eq!(parsed.remove(), &["features.old".to_string()]);
        assert_eq!(parsed.modify(), &[("db.port".to_string(), Value::from(5433))]);

        let content = fs::read_to_string(&latest).unwrap();
        assert!(content.starts_with("# Generated "));
    }

    #[test]
    fn test_append_remove_to_list_section() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("0001_list.yaml");
        fs::write(&path, "version: 1\nremove:\n  - a\n").unwrap();

        append_operation(temp.path(), Operation::Remove, "b", Value::Null).unwrap();
        append_operation(temp.path(), Operation::Remove, "a", Value::Null).unwrap();

        let parsed = MigrationDescriptor::load(&path).unwrap();
        assert_eq!(parsed.remove(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_append_rejects_reserved_and_malformed_paths() {
        let temp = TempDir::new().unwrap();
        let path = generate(temp.path(), "first", None).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        for key in ["version", "a..b", "trailing."] {
            let err = append_operation(temp.path(), Operation::Modify, key, Value::from(1))
                .unwrap_err();
            assert!(matches!(err, MigrateError::InvalidMigration { .. }));
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_append_without_migrations() {
        let temp = TempDir::new().unwrap();
        let err = append_operation(temp.path(), Operation::Add, "a", Value::from(1)).unwrap_err();
        assert!(matches!(err, MigrateError::NoMigrations { .. }));
    }
}
