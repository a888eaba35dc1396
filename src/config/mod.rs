//! Configuration loading and validation.

mod validate;

pub use validate::{ConfigError, validate};

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read a raw `modes` configuration from a JSON file.
///
/// The value is returned untyped; [`validate`] turns it into mode
/// definitions or a full list of violations.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid JSON.
pub fn load_value(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config from {}", path.display()))
}

/// Built-in demo configuration: a capturing `normal` mode with a couple of
/// bindings and a pass-through `insert` mode.
#[must_use]
pub fn sample() -> Value {
    serde_json::json!([
        {
            "name": "normal",
            "icon": "keyboard",
            "capturing": true,
            "startingMode": true,
            "keybindings": [
                { "key": "i", "command": "keymode.enter.insert" },
                { "key": "c", "command": "keymode.change" },
                { "key": "h", "command": "cursor.left" },
                { "key": "j", "command": "cursor.down" },
                { "key": "k", "command": "cursor.up" },
                { "key": "l", "command": "cursor.right" }
            ]
        },
        {
            "name": "insert",
            "icon": "edit",
            "capturing": false
        }
    ])
}
