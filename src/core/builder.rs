//! Builder for constructing Control instances.

use crate::core::{Configuration, Control, DiffFallback};
use crate::error::{ConfigError, Result};
use crate::sources::{ConfigSource, FileSource};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Builder for constructing a [`Control`] instance.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_control::prelude::*;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Deserialize, Serialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// impl Configuration for AppConfig {}
///
/// # fn example() -> Result<()> {
/// let control = Control::<AppConfig>::builder()
///     .with_file("config/default.yaml")
///     .on_diff_failure(DiffFallback::KeepPrevious)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ControlBuilder<C> {
    source: Option<Box<dyn ConfigSource<C>>>,
    diff_fallback: DiffFallback,
}

impl<C: Configuration> ControlBuilder<C> {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            source: None,
            diff_fallback: DiffFallback::default(),
        }
    }

    /// Set the configuration source. A later call replaces an earlier one.
    pub fn with_source<S>(mut self, source: S) -> Self
    where
        S: ConfigSource<C> + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Use a file as the configuration source.
    ///
    /// Supported formats: YAML (.yaml, .yml), TOML (.toml), JSON (.json)
    pub fn with_file(self, path: impl Into<PathBuf>) -> Self
    where
        C: DeserializeOwned,
    {
        self.with_source(FileSource::<C>::new(path))
    }

    /// Choose what the change set becomes when two snapshots cannot be compared.
    ///
    /// Defaults to [`DiffFallback::MarkAllChanged`].
    pub fn on_diff_failure(mut self, fallback: DiffFallback) -> Self {
        self.diff_fallback = fallback;
        self
    }

    /// Build the controller.
    ///
    /// This performs the initial load; on success every path reports as changed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No source was given, or its identity is empty
    /// - Initial configuration load fails
    pub fn build(self) -> Result<Control<C>> {
        let source = self.source.ok_or(ConfigError::NoSource)?;
        Control::from_parts(source, self.diff_fallback)
    }
}

impl<C: Configuration> Default for ControlBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
