//! Dotted field paths and the record operations that walk them.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::HjlError;

/// One decoded or to-be-encoded object.
pub type Record = Map<String, Value>;

/// Dotted address of a possibly nested field, e.g. `sub.text`.
///
/// Segments are non-empty and contain no `.`, `=` or whitespace, so a path
/// always survives being written into a field line and parsed back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self, HjlError> {
        let segments = path
            .split('.')
            .map(|segment| {
                if is_valid_segment(segment) {
                    Ok(segment.to_string())
                } else {
                    Err(HjlError::InvalidFieldPath {
                        path: path.to_string(),
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = HjlError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        Self::parse(path)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment
            .chars()
            .any(|c| c == '.' || c == '=' || c.is_whitespace() || c.is_control())
}

/// Removes and returns the string at `path`.
///
/// Returns `None` and leaves the record untouched when a parent is missing or
/// not an object, or when the leaf is missing or not a string.
pub fn extract(record: &mut Record, path: &FieldPath) -> Option<String> {
    let (leaf, parents) = path.segments.split_last()?;

    let mut object = record;
    for segment in parents {
        object = object.get_mut(segment)?.as_object_mut()?;
    }

    if !matches!(object.get(leaf), Some(Value::String(_))) {
        return None;
    }
    match object.remove(leaf) {
        Some(Value::String(value)) => Some(value),
        _ => None,
    }
}

/// Sets `value` at `path`, creating empty objects for missing parents.
///
/// A path can only be assigned once: an existing leaf of any type, `null`
/// included, is a redefinition.
pub fn insert(record: &mut Record, path: &FieldPath, value: Value) -> Result<(), HjlError> {
    let Some((leaf, parents)) = path.segments.split_last() else {
        return Err(HjlError::InvalidFieldPath {
            path: path.to_string(),
        });
    };

    let mut object = record;
    for segment in parents {
        let child = object
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        object = match child {
            Value::Object(map) => map,
            _ => {
                return Err(HjlError::InvalidPath {
                    path: path.to_string(),
                })
            }
        };
    }

    if object.contains_key(leaf) {
        return Err(HjlError::Redefinition {
            path: path.to_string(),
        });
    }
    object.insert(leaf.clone(), value);
    Ok(())
}
