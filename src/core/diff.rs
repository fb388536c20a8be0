//! Structural diff between two configuration values.
//!
//! Both values are projected into a [`serde_json::Value`] tree and walked
//! side by side. Every leaf that differs is reported with its path, made of
//! field names for records and maps and numeric positions for sequences.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Errors produced by the structural differ.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// The two values have incomparable kinds at the same position.
    #[error("type mismatch at '{path}': {left} vs {right}")]
    TypeMismatch {
        /// Dotted path where the mismatch was found
        path: String,
        /// Kind of the left-hand value
        left: &'static str,
        /// Kind of the right-hand value
        right: &'static str,
    },

    /// A value could not be projected into the generic value tree.
    #[error("failed to serialize value for diffing: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One segment of a change path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A record field or map key.
    Field(String),
    /// A position in a sequence.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

/// How a leaf differs between the two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Present only in the new value.
    Create,
    /// Present in both, with different values.
    Update,
    /// Present only in the old value.
    Delete,
}

/// A single differing leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// What happened to the leaf
    pub kind: ChangeKind,
    /// Path from the root to the leaf
    pub path: Vec<PathSegment>,
}

impl Change {
    /// Render the path with `.` between segments, e.g. `Three.0.Thirty`.
    pub fn dotted_path(&self) -> String {
        join_path(&self.path)
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted_path())
    }
}

/// Diff two serializable values.
///
/// # Errors
///
/// Returns an error if either value cannot be serialized, or if the values
/// have incomparable kinds at the same position.
pub fn diff<T: Serialize + ?Sized>(old: &T, new: &T) -> Result<Vec<Change>, DiffError> {
    let old = serde_json::to_value(old)?;
    let new = serde_json::to_value(new)?;
    diff_values(&old, &new)
}

/// Diff two values that are already in tree form.
///
/// # Errors
///
/// Returns [`DiffError::TypeMismatch`] on incomparable kinds.
pub fn diff_values(old: &Value, new: &Value) -> Result<Vec<Change>, DiffError> {
    let mut changes = Vec::new();
    let mut path = Vec::new();
    walk(&mut path, Some(old), Some(new), &mut changes)?;
    Ok(changes)
}

fn walk(
    path: &mut Vec<PathSegment>,
    old: Option<&Value>,
    new: Option<&Value>,
    out: &mut Vec<Change>,
) -> Result<(), DiffError> {
    // A null behaves like an absent value.
    let old = old.filter(|value| !value.is_null());
    let new = new.filter(|value| !value.is_null());

    match (old, new) {
        (None, None) => Ok(()),
        (None, Some(value)) => {
            leaves(path, value, ChangeKind::Create, out);
            Ok(())
        }
        (Some(value), None) => {
            leaves(path, value, ChangeKind::Delete, out);
            Ok(())
        }
        (Some(Value::Object(a)), Some(Value::Object(b))) => {
            for (key, left) in a {
                path.push(PathSegment::Field(key.clone()));
                walk(path, Some(left), b.get(key), out)?;
                path.pop();
            }
            for (key, right) in b {
                if a.contains_key(key) {
                    continue;
                }
                path.push(PathSegment::Field(key.clone()));
                leaves(path, right, ChangeKind::Create, out);
                path.pop();
            }
            Ok(())
        }
        (Some(Value::Array(a)), Some(Value::Array(b))) => {
            for index in 0..a.len().max(b.len()) {
                path.push(PathSegment::Index(index));
                walk(path, a.get(index), b.get(index), out)?;
                path.pop();
            }
            Ok(())
        }
        (Some(left), Some(right)) => {
            if kind_of(left) != kind_of(right) {
                return Err(DiffError::TypeMismatch {
                    path: join_path(path),
                    left: kind_of(left),
                    right: kind_of(right),
                });
            }
            if left != right {
                out.push(Change {
                    kind: ChangeKind::Update,
                    path: path.clone(),
                });
            }
            Ok(())
        }
    }
}

/// Report every leaf beneath `value`; empty containers count as one leaf.
fn leaves(path: &mut Vec<PathSegment>, value: &Value, kind: ChangeKind, out: &mut Vec<Change>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                path.push(PathSegment::Field(key.clone()));
                leaves(path, child, kind, out);
                path.pop();
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                leaves(path, child, kind, out);
                path.pop();
            }
        }
        Value::Null => {}
        _ => out.push(Change {
            kind,
            path: path.clone(),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "record",
    }
}

fn join_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}
