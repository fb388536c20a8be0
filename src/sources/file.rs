//! File-based configuration source.

use super::ConfigSource;
use crate::error::{ConfigError, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;

/// On-disk formats understood by [`FileSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Toml,
    Json,
}

/// File-based configuration source.
///
/// Loads configuration from YAML, TOML, or JSON files with automatic format detection
/// based on file extension. Keys are matched against the target type exactly as
/// written, so `#[serde(rename_all = "PascalCase")]` documents load as-is. The
/// file path doubles as the watched identity.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_control::sources::FileSource;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let source = FileSource::<AppConfig>::new("config/default.yaml");
/// ```
pub struct FileSource<C> {
    path: PathBuf,
    _config: PhantomData<fn() -> C>,
}

impl<C> FileSource<C> {
    /// Create a new file source with automatic format detection.
    ///
    /// The format is detected from the file extension:
    /// - `.yaml`, `.yml` -> YAML
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _config: PhantomData,
        }
    }

    /// Detect the file format from the extension.
    fn format(&self) -> Result<Format> {
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                ConfigError::LoadError(format!(
                    "Unable to determine file format for: {}",
                    self.path.display()
                ))
            })?;

        match extension {
            "yaml" | "yml" => Ok(Format::Yaml),
            "toml" => Ok(Format::Toml),
            "json" => Ok(Format::Json),
            _ => Err(ConfigError::LoadError(format!(
                "Unsupported file extension: {}. Supported: .yaml, .yml, .toml, .json",
                extension
            ))),
        }
    }
}

impl<C: DeserializeOwned> ConfigSource<C> for FileSource<C> {
    fn identity(&self) -> PathBuf {
        self.path.clone()
    }

    fn load(&self) -> Result<C> {
        let format = self.format()?;

        let contents = fs::read_to_string(&self.path).map_err(|e| {
            ConfigError::LoadError(format!("reading {}: {}", self.path.display(), e))
        })?;

        let path = self.path.display();
        match format {
            Format::Yaml => serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::DeserializationError(format!("{}: {}", path, e))),
            Format::Toml => toml::from_str(&contents)
                .map_err(|e| ConfigError::DeserializationError(format!("{}: {}", path, e))),
            Format::Json => serde_json::from_str(&contents).map_err(|e| {
                if e.is_data() {
                    ConfigError::DeserializationError(format!("{}: {}", path, e))
                } else {
                    ConfigError::ParseError(format!("{}: {}", path, e))
                }
            }),
        }
    }

    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
