//! Schema validation for the raw `modes` setting.
//!
//! The validator is deliberately fed an untyped [`Value`] instead of a
//! `Deserialize` type: a derive stops at the first malformed field, while
//! the contract here is to report *every* violation in one pass so the user
//! can fix their whole configuration at once.

use crate::modes::{Keybind, ModeDefinition};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Longest accepted mode name, in characters.
const MAX_NAME_LEN: usize = 16;

/// A single violation found in the raw configuration.
///
/// Validation never stops at the first problem; callers always receive the
/// complete set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The top-level setting is not an array.
    #[error("expected an array of mode definitions, got {found}")]
    NotAnArray {
        /// JSON type that was found instead.
        found: &'static str,
    },
    /// The modes array is empty.
    #[error("no modes were defined")]
    NoModesDefined,
    /// An entry that should be a JSON object is not.
    #[error("{path}: expected an object, got {found}")]
    NotAnObject {
        /// Location of the entry, e.g. `modes[2]`.
        path: String,
        /// JSON type that was found instead.
        found: &'static str,
    },
    /// A required field is absent.
    #[error("{path}: missing required field '{field}'")]
    MissingField {
        /// Location of the enclosing object.
        path: String,
        /// Name of the missing field.
        field: &'static str,
    },
    /// A field holds a value of the wrong JSON type.
    #[error("{path}.{field}: expected {expected}, got {found}")]
    WrongType {
        /// Location of the enclosing object.
        path: String,
        /// Name of the offending field.
        field: &'static str,
        /// JSON type the schema requires.
        expected: &'static str,
        /// JSON type that was found instead.
        found: &'static str,
    },
    /// A field the schema does not know about (the schema is closed).
    #[error("{path}: unexpected field '{field}'")]
    UnknownField {
        /// Location of the enclosing object.
        path: String,
        /// Name of the unexpected field.
        field: String,
    },
    /// A well-typed field holds an invalid value.
    #[error("{path}: {reason}")]
    InvalidValue {
        /// Location of the offending field.
        path: String,
        /// Human-readable rule that was broken.
        reason: String,
    },
    /// The same mode name appears more than once.
    #[error("duplicate mode name '{name}' at positions {indices:?}")]
    DuplicateMode {
        /// The duplicated name.
        name: String,
        /// Every position the name occurs at, in definition order.
        indices: Vec<usize>,
    },
    /// The same key is bound twice within one mode.
    #[error("{path}: key '{key}' is bound more than once in this mode")]
    DuplicateKey {
        /// Location of the second occurrence.
        path: String,
        /// The duplicated key.
        key: char,
    },
    /// Every defined mode captures keystrokes, leaving no escape mode.
    #[error("at least one non-capturing mode must be defined")]
    NoNonCapturingMode,
}

/// JSON types the schema distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    Bool,
    Array,
}

impl Kind {
    const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "boolean",
            Self::Array => "array",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::Array => value.is_array(),
        }
    }
}

/// One field of a closed object schema.
#[derive(Debug, Clone, Copy)]
struct Field {
    name: &'static str,
    kind: Kind,
    required: bool,
}

const MODE_FIELDS: &[Field] = &[
    Field {
        name: "name",
        kind: Kind::String,
        required: true,
    },
    Field {
        name: "icon",
        kind: Kind::String,
        required: false,
    },
    Field {
        name: "capturing",
        kind: Kind::Bool,
        required: true,
    },
    Field {
        name: "startingMode",
        kind: Kind::Bool,
        required: false,
    },
    Field {
        name: "keybindings",
        kind: Kind::Array,
        required: false,
    },
];

const KEYBIND_FIELDS: &[Field] = &[
    Field {
        name: "key",
        kind: Kind::String,
        required: true,
    },
    Field {
        name: "command",
        kind: Kind::String,
        required: true,
    },
];

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check an object against a closed field table: required fields must be
/// present, present fields must have the declared type, and fields outside
/// the table are rejected. Value-level rules layer on top of this.
fn check_shape(
    object: &Map<String, Value>,
    fields: &[Field],
    path: &str,
    errors: &mut Vec<ConfigError>,
) {
    for field in fields {
        match object.get(field.name) {
            None if field.required => errors.push(ConfigError::MissingField {
                path: path.to_string(),
                field: field.name,
            }),
            Some(value) if !field.kind.matches(value) => errors.push(ConfigError::WrongType {
                path: path.to_string(),
                field: field.name,
                expected: field.kind.name(),
                found: json_kind(value),
            }),
            _ => {}
        }
    }

    for key in object.keys() {
        if !fields.iter().any(|field| field.name == key) {
            errors.push(ConfigError::UnknownField {
                path: path.to_string(),
                field: key.clone(),
            });
        }
    }
}

fn check_name(name: &str, path: &str, errors: &mut Vec<ConfigError>) {
    let path = format!("{path}.name");
    if name.is_empty() {
        errors.push(ConfigError::InvalidValue {
            path,
            reason: "name must not be empty".to_string(),
        });
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push(ConfigError::InvalidValue {
            path,
            reason: format!("name must be at most {MAX_NAME_LEN} characters"),
        });
    } else if !name.chars().all(|c| c.is_ascii_lowercase() || c == ' ') {
        errors.push(ConfigError::InvalidValue {
            path,
            reason: "name may only contain lowercase letters and spaces".to_string(),
        });
    }
}

fn is_kebab_case(icon: &str) -> bool {
    !icon.is_empty()
        && icon
            .split('-')
            .all(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_lowercase()))
}

fn check_icon(icon: &str, path: &str, errors: &mut Vec<ConfigError>) {
    if !is_kebab_case(icon) {
        errors.push(ConfigError::InvalidValue {
            path: format!("{path}.icon"),
            reason: "icon must be a kebab-case identifier".to_string(),
        });
    }
}

fn check_key(key: &str, path: &str, errors: &mut Vec<ConfigError>) -> Option<char> {
    let mut chars = key.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        errors.push(ConfigError::InvalidValue {
            path: format!("{path}.key"),
            reason: "key must be exactly one character".to_string(),
        });
        return None;
    };
    if c.is_ascii_digit() {
        errors.push(ConfigError::InvalidValue {
            path: format!("{path}.key"),
            reason: "key must not be a digit".to_string(),
        });
        return None;
    }
    Some(c)
}

fn check_command(command: &str, path: &str, errors: &mut Vec<ConfigError>) -> Option<String> {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        errors.push(ConfigError::InvalidValue {
            path: format!("{path}.command"),
            reason: "command must not be empty".to_string(),
        });
        return None;
    }
    Some(trimmed.to_string())
}

fn collect_keybinds(
    list: &[Value],
    mode_path: &str,
    errors: &mut Vec<ConfigError>,
) -> Vec<Keybind> {
    let mut seen = Vec::new();
    let mut binds = Vec::new();

    for (index, item) in list.iter().enumerate() {
        let path = format!("{mode_path}.keybindings[{index}]");
        let Value::Object(object) = item else {
            errors.push(ConfigError::NotAnObject {
                path,
                found: json_kind(item),
            });
            continue;
        };
        check_shape(object, KEYBIND_FIELDS, &path, errors);

        let key = object
            .get("key")
            .and_then(Value::as_str)
            .and_then(|key| check_key(key, &path, errors));
        let command = object
            .get("command")
            .and_then(Value::as_str)
            .and_then(|command| check_command(command, &path, errors));

        if let Some(key) = key {
            if seen.contains(&key) {
                errors.push(ConfigError::DuplicateKey { path, key });
                continue;
            }
            seen.push(key);
            if let Some(command) = command {
                binds.push(Keybind { key, command });
            }
        }
    }

    binds
}

/// Validate the raw `modes` setting into mode definitions.
///
/// Pure over its input; collects every violation instead of stopping at the
/// first one.
///
/// # Errors
///
/// Returns the complete list of violations when the configuration breaks
/// any rule: shape errors per field, charset rules, duplicate mode names
/// (with every occurrence index), duplicate keys within one mode, and the
/// cross-mode requirement that at least one mode is non-capturing.
pub fn validate(raw: &Value) -> Result<Vec<ModeDefinition>, Vec<ConfigError>> {
    let Value::Array(entries) = raw else {
        return Err(vec![ConfigError::NotAnArray {
            found: json_kind(raw),
        }]);
    };
    if entries.is_empty() {
        return Err(vec![ConfigError::NoModesDefined]);
    }

    let mut errors = Vec::new();
    let mut defs = Vec::with_capacity(entries.len());
    let mut names: Vec<(usize, String)> = Vec::new();
    let mut saw_non_capturing = false;

    for (index, entry) in entries.iter().enumerate() {
        let path = format!("modes[{index}]");
        let Value::Object(object) = entry else {
            errors.push(ConfigError::NotAnObject {
                path,
                found: json_kind(entry),
            });
            continue;
        };
        check_shape(object, MODE_FIELDS, &path, &mut errors);

        let name = object.get("name").and_then(Value::as_str).map(str::trim);
        if let Some(name) = name {
            check_name(name, &path, &mut errors);
            names.push((index, name.to_string()));
        }

        let icon = object.get("icon").and_then(Value::as_str).map(str::trim);
        if let Some(icon) = icon {
            check_icon(icon, &path, &mut errors);
        }

        let capturing = object.get("capturing").and_then(Value::as_bool);
        if capturing == Some(false) {
            saw_non_capturing = true;
        }
        let starting_mode = object
            .get("startingMode")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let keybindings = if let Some(Value::Array(list)) = object.get("keybindings") {
            if capturing == Some(false) {
                errors.push(ConfigError::InvalidValue {
                    path: format!("{path}.keybindings"),
                    reason: "only capturing modes may define keybindings".to_string(),
                });
            }
            collect_keybinds(list, &path, &mut errors)
        } else {
            Vec::new()
        };

        if let (Some(name), Some(capturing)) = (name, capturing) {
            defs.push(ModeDefinition {
                name: name.to_string(),
                icon: icon.map(ToString::to_string),
                capturing,
                starting_mode,
                keybindings,
            });
        }
    }

    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, name) in &names {
        groups.entry(name).or_default().push(*index);
    }
    for (name, indices) in groups {
        if indices.len() > 1 {
            errors.push(ConfigError::DuplicateMode {
                name: name.to_string(),
                indices,
            });
        }
    }

    if !saw_non_capturing {
        errors.push(ConfigError::NoNonCapturingMode);
    }

    if errors.is_empty() { Ok(defs) } else { Err(errors) }
}
