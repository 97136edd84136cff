//! Add, remove and modify commands: append one operation to the latest migration.

use super::DirectoryArgs;
use crate::migration::{Operation, scaffold};
use anyhow::{Context, Result};
use clap::Args;
use serde_yaml::Value;
use std::path::PathBuf;

/// Arguments for the add and modify commands.
#[derive(Args, Debug)]
pub struct OperationArgs {
    /// Dotted key path, e.g. `database.port`
    #[arg(value_name = "KEY")]
    pub key: String,

    /// Value, parsed as YAML (`5433`, `true`, `[a, b]`); plain text otherwise
    #[arg(value_name = "VALUE")]
    pub value: Option<String>,

    #[command(flatten)]
    pub dir: DirectoryArgs,
}

/// Arguments for the remove command.
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Dotted key path to remove
    #[arg(value_name = "KEY")]
    pub key: String,

    #[command(flatten)]
    pub dir: DirectoryArgs,
}

/// Run an add or modify command.
pub fn run_operation(operation: Operation, args: &OperationArgs) -> Result<PathBuf> {
    let value = args
        .value
        .as_deref()
        .map(scaffold::parse_value)
        .unwrap_or(Value::Null);
    append(operation, &args.key, value, &args.dir)
}

/// Run the remove command.
pub fn run_remove(args: &RemoveArgs) -> Result<PathBuf> {
    append(Operation::Remove, &args.key, Value::Null, &args.dir)
}

fn append(operation: Operation, key: &str, value: Value, dir: &DirectoryArgs) -> Result<PathBuf> {
    let dir = dir.resolve();
    let path = scaffold::append_operation(&dir, operation, key, value)
        .with_context(|| format!("Failed to append {} {}", operation, key))?;

    println!("Added {} {} to {}", operation, key, path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::MigrationDescriptor;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_operation_commands_append_to_latest() {
        let temp = TempDir::new().unwrap();
        let dir = DirectoryArgs {
            directory: Some(temp.path().to_path_buf()),
        };
        let path = temp.path().join("0001_init.yaml");
        fs::write(&path, "version: 1\n").unwrap();

        run_operation(
            Operation::Add,
            &OperationArgs {
                key: "features.dark_mode".to_string(),
                value: Some("false".to_string()),
                dir: dir.clone(),
            },
        )
        .unwrap();
        run_remove(&RemoveArgs {
            key: "features.user_registration".to_string(),
            dir: dir.clone(),
        })
        .unwrap();
        run_operation(
            Operation::Modify,
            &OperationArgs {
                key: "motd".to_string(),
                value: None,
                dir,
            },
        )
        .unwrap();

        let parsed = MigrationDescriptor::load(&path).unwrap();
        assert_eq!(
            parsed.add(),
            &[("features.dark_mode".to_string(), Value::from(false))]
        );
        assert_eq!(parsed.remove(), &["features.user_registration".to_string()]);
        assert_eq!(parsed.modify(), &[("motd".to_string(), Value::Null)]);
    }
}
