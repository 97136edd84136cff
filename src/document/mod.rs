//! The configuration document being migrated.
//!
//! The tracked `version` lives outside the body: it is stripped on load and
//! written back as the last statement of the file, below a fixed warning
//! comment. Key order of the body is preserved, and so is the comment block at
//! the top of the file. Comments inside the body are lost on rewrite.

pub mod path;

use crate::error::{MigrateError, MigrateResult};
use crate::migration::Operation;
use serde_yaml::{Mapping, Value};
use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Key that carries the applied migration version.
pub const VERSION_KEY: &str = "version";

/// Comment written directly above the version marker.
pub const VERSION_WARNING: &str =
    "# DO NOT CHANGE. This value is used for migrations. If you change this, you risk losing data.";

/// A parsed configuration file plus its tracked migration version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    /// Comment lines found above the first statement of the file.
    header: Vec<String>,
    /// Document body, without the version key.
    body: Mapping,
    version: u64,
}

impl ConfigDocument {
    /// Create an empty document at version 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a document from disk.
    ///
    /// A missing file yields an empty document at version 0. A file that exists
    /// but cannot be parsed is an error.
    pub fn load(path: &Path) -> MigrateResult<Self> {
        if !path.exists() {
            debug!(config = %path.display(), "Configuration not found, starting empty");
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(|e| MigrateError::io(path, e))?;
        Self::parse(&content, path)
    }

    /// Parse document text. `path` is only used for diagnostics.
    pub fn parse(content: &str, path: &Path) -> MigrateResult<Self> {
        let value: Value = if is_blank(content) {
            Value::Null
        } else {
            serde_yaml::from_str(content).map_err(|source| MigrateError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?
        };

        let mut body = match value {
            Value::Null => Mapping::new(),
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(MigrateError::ConfigShape {
                    path: path.to_path_buf(),
                });
            }
        };

        let version = match body.shift_remove(VERSION_KEY) {
            Some(value) => value
                .as_u64()
                .ok_or_else(|| MigrateError::InvalidVersion {
                    path: path.to_path_buf(),
                    found: describe(&value),
                })?,
            None => {
                warn!(
                    config = %path.display(),
                    "Configuration has no version field, assuming version 0"
                );
                0
            }
        };

        Ok(Self {
            header: leading_comments(content),
            body,
            version,
        })
    }

    /// Current tracked version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Record a new version. The body is left untouched.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Document body (without the version key).
    pub fn body(&self) -> &Mapping {
        &self.body
    }

    /// Look up a dotted path in the body.
    pub fn get(&self, key_path: &str) -> Option<&Value> {
        path::get(&self.body, key_path)
    }

    /// Apply one operation at `key_path`.
    ///
    /// Add and modify always succeed. Remove returns `false` when nothing was
    /// found at `key_path`; `value` is ignored for removes.
    pub fn mutate(&mut self, operation: Operation, key_path: &str, value: Value) -> bool {
        match operation {
            Operation::Add | Operation::Modify => {
                path::set(&mut self.body, key_path, value);
                true
            }
            Operation::Remove => path::delete(&mut self.body, key_path),
        }
    }

    /// Render the document: header comments, body, then the version marker.
    ///
    /// A top-level `version` key in the body is never rendered; the tracked
    /// version is the only one written.
    pub fn serialize(&self) -> MigrateResult<String> {
        let mut out = String::new();

        if !self.header.is_empty() {
            out.push_str(&self.header.join("\n"));
            out.push('\n');
        }

        let body = if self.body.contains_key(VERSION_KEY) {
            let mut body = self.body.clone();
            body.shift_remove(VERSION_KEY);
            Cow::Owned(body)
        } else {
            Cow::Borrowed(&self.body)
        };

        if !body.is_empty() {
            let body = serde_yaml::to_string(body.as_ref())
                .map_err(|source| MigrateError::Serialize { source })?;
            out.push_str(&body);
            out.push('\n');
        }

        out.push_str(VERSION_WARNING);
        out.push('\n');
        out.push_str(&format!("{}: {}\n", VERSION_KEY, self.version));

        Ok(out)
    }

    /// Serialize and write the document to `path`.
    ///
    /// Writes a temporary file in the same directory and renames it into place.
    /// An existing file keeps its permissions. The temporary file is removed if
    /// any step fails.
    pub fn save(&self, path: &Path) -> MigrateResult<()> {
        let rendered = self.serialize()?;

        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staging = NamedTempFile::new_in(parent).map_err(|e| MigrateError::io(parent, e))?;
        staging
            .write_all(rendered.as_bytes())
            .map_err(|e| MigrateError::io(path, e))?;
        staging
            .as_file()
            .sync_all()
            .map_err(|e| MigrateError::io(path, e))?;

        if path.exists() {
            let permissions = fs::metadata(path)
                .map_err(|e| MigrateError::io(path, e))?
                .permissions();
            staging
                .as_file()
                .set_permissions(permissions)
                .map_err(|e| MigrateError::io(path, e))?;
        }

        staging
            .persist(path)
            .map_err(|e| MigrateError::io(path, e.error))?;
        Ok(())
    }
}

/// Collect the comment block at the top of a file.
///
/// Stops at the first line that is neither blank nor a comment. The version
/// warning is dropped so it is not duplicated when the marker is re-appended.
pub(crate) fn leading_comments(content: &str) -> Vec<String> {
    let mut header: Vec<String> = content
        .lines()
        .take_while(|line| {
            let trimmed = line.trim();
            trimmed.is_empty() || trimmed.starts_with('#')
        })
        .filter(|line| line.trim() != VERSION_WARNING)
        .map(str::to_string)
        .collect();

    while header.last().is_some_and(|line| line.trim().is_empty()) {
        header.pop();
    }
    let leading_blank = header.iter().take_while(|line| line.trim().is_empty()).count();
    header.drain(..leading_blank);

    header
}

/// True when the text holds nothing but blank lines and comments.
fn is_blank(content: &str) -> bool {
    content.lines().all(|line| {
        let trimmed = line.trim();
        trimmed.is_empty() || trimmed.starts_with('#')
    })
}

/// Short rendering of a value for error messages.
pub(crate) fn describe(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| format!("{:?}", value))
}
