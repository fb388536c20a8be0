//! Error types for hotswap-control.

/// Result type alias for hotswap-control operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading, tracking or propagating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration source was given, or its identity is empty.
    #[error("No configuration source: a source with a non-empty identity is required")]
    NoSource,

    /// Failed to load configuration from a source.
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    /// Failed to deserialize configuration.
    #[error("Failed to deserialize configuration: {0}")]
    DeserializationError(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// File watching failed to initialize, register a path, or reported a runtime error.
    #[error("File watching error: {0}")]
    WatchError(String),

    /// The notifier is already watching its configuration source.
    #[error("Configuration source is already being watched")]
    AlreadyWatching,

    /// A consumer refused to apply the new configuration.
    #[error("Configuration update rejected: {0}")]
    UpdateRejected(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error for other cases.
    #[error("Configuration error: {0}")]
    Other(String),
}

impl ConfigError {
    /// Create an [`ConfigError::UpdateRejected`] error with the given reason.
    ///
    /// Intended for [`Updatable`](crate::notify::Updatable) implementations
    /// that cannot apply a configuration change.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::UpdateRejected(reason.into())
    }
}
