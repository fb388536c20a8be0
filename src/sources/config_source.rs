//! Configuration source trait.

use crate::error::Result;
use std::path::PathBuf;

/// Trait for configuration sources.
///
/// A source knows which storage location it reads from (its identity, which
/// is also what gets watched for changes) and produces a fresh configuration
/// value on demand. Every call to [`load`](ConfigSource::load) replaces the
/// whole document.
pub trait ConfigSource<C>: Send + Sync {
    /// The watchable location of this source. Must not be empty.
    fn identity(&self) -> PathBuf;

    /// Load a fresh configuration value.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or parsed.
    fn load(&self) -> Result<C>;

    /// Get a human-readable name for this source (for logging/debugging).
    fn name(&self) -> String {
        self.identity().display().to_string()
    }
}
