//! JSON I/O handling for CLI
//!
//! - Input: replica set config documents read from files
//! - Output: single JSON object per command on stdout

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::Value;

use super::errors::{CliError, CliResult};
use crate::replset::ReplicaSetConfig;

/// Read a replica set config from a JSON file.
///
/// Accepts either the bare config or a `replSetGetConfig` reply carrying it
/// under `config`.
pub fn read_config(path: &Path) -> CliResult<ReplicaSetConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::input_error(format!("Failed to read {:?}: {}", path, e)))?;

    let value: Value = serde_json::from_str(&content)
        .map_err(|e| CliError::input_error(format!("Invalid JSON in {:?}: {}", path, e)))?;

    let doc = match value {
        Value::Object(mut doc) => match doc.remove("config") {
            Some(Value::Object(inner)) => inner,
            Some(other) => {
                doc.insert("config".into(), other);
                doc
            }
            None => doc,
        },
        _ => {
            return Err(CliError::input_error(format!(
                "{:?} does not contain a JSON object",
                path
            )))
        }
    };

    Ok(ReplicaSetConfig::from_document(doc)?)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
