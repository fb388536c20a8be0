//! The set of configuration paths changed by the most recent reload.

use std::sync::Arc;

/// Entry meaning "treat everything as changed".
pub const ALL: &str = "*";

/// Suffix that turns a query into a "this path or anything below it" match.
const WILDCARD_SUFFIX: &str = ".*";

/// Ordered collection of dotted paths that differ between the previous and the
/// current configuration.
///
/// A set holding only [`ALL`] means everything changed (first load). An empty
/// set means nothing changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    entries: Arc<[String]>,
}

impl ChangeSet {
    /// A change set that matches every query.
    pub fn all() -> Self {
        Self {
            entries: Arc::from(vec![ALL.to_string()]),
        }
    }

    /// A change set that matches nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a change set from dotted paths, keeping their order.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the set contains the "everything changed" entry.
    pub fn is_all(&self) -> bool {
        self.entries.iter().any(|entry| entry == ALL)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Check whether `item` changed.
    ///
    /// Deep keys use `.` as a delimiter and numbers address sequence positions,
    /// e.g. `Database.Replicas.0.Host`. A trailing `.*` matches the key's
    /// descendants: if `Database.Connection.Host` changed, then `*`,
    /// `Database.*` and `Database.Connection.*` all match. Matching is on whole
    /// segments, so `Data.*` does not match `Database.Connection.Host`.
    pub fn matches(&self, item: &str) -> bool {
        match item.strip_suffix(WILDCARD_SUFFIX) {
            Some(prefix) => {
                let prefix = format!("{}.", prefix);
                self.entries
                    .iter()
                    .any(|entry| entry == ALL || entry.starts_with(&prefix))
            }
            None => self
                .entries
                .iter()
                .any(|entry| entry == ALL || entry == item),
        }
    }
}

impl Default for ChangeSet {
    fn default() -> Self {
        Self {
            entries: Arc::from(Vec::new()),
        }
    }
}
