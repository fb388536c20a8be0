//! In-memory configuration source.

use super::ConfigSource;
use crate::error::Result;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;

/// A settable in-memory source, useful for tests and embedded environments.
///
/// Clones share the same value, so a handle kept by the caller can replace the
/// configuration after the source has been handed to a [`Control`](crate::core::Control).
///
/// # Examples
///
/// ```rust
/// use hotswap_control::sources::{ConfigSource, MemorySource};
///
/// let source = MemorySource::new("memory://app", 8080u16);
/// let handle = source.clone();
/// handle.set(9090);
/// assert_eq!(source.load().unwrap(), 9090);
/// ```
pub struct MemorySource<C> {
    identity: PathBuf,
    value: Arc<RwLock<C>>,
}

impl<C> MemorySource<C> {
    /// Creates a new source holding `value` under the given identity.
    pub fn new(identity: impl Into<PathBuf>, value: C) -> Self {
        Self {
            identity: identity.into(),
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// Replaces the value returned by the next load.
    pub fn set(&self, value: C) {
        *self.value.write() = value;
    }

    /// Modifies the held value in place.
    pub fn update(&self, f: impl FnOnce(&mut C)) {
        f(&mut *self.value.write());
    }
}

impl<C> Clone for MemorySource<C> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            value: Arc::clone(&self.value),
        }
    }
}

impl<C: Clone + Send + Sync> ConfigSource<C> for MemorySource<C> {
    fn identity(&self) -> PathBuf {
        self.identity.clone()
    }

    fn load(&self) -> Result<C> {
        Ok(self.value.read().clone())
    }

    fn name(&self) -> String {
        format!("memory:{}", self.identity.display())
    }
}
