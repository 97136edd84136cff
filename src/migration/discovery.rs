//! Locating migration files on disk.
//!
//! Files are ordered by file name, not by the `version` inside them. Names are
//! expected to start with a zero-padded number (`0001_init.yaml`) so the two
//! orders agree; nothing here checks that they do.

use crate::error::{MigrateError, MigrateResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions recognized as migration files.
const MIGRATION_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Check whether a path looks like a migration file.
pub fn is_migration_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MIGRATION_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// List migration files in `dir`, sorted lexicographically by file name.
///
/// Only regular files directly inside `dir` are considered. A missing or
/// unreadable directory is an error.
pub fn discover(dir: &Path) -> MigrateResult<Vec<PathBuf>> {
    let access_error = |source: std::io::Error| MigrateError::DirectoryAccess {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(access_error)? {
        let entry = entry.map_err(access_error)?;
        let path = entry.path();
        if path.is_file() && is_migration_file(&path) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// The last migration file in `dir` by file name, if any.
pub fn latest(dir: &Path) -> MigrateResult<Option<PathBuf>> {
    Ok(discover(dir)?.pop())
}
