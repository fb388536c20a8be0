//! # hotswap-control
//!
//! Keep a long-running process's configuration fresh and tell interested
//! subsystems what changed, without restarting.
//!
//! ## Overview
//!
//! `hotswap-control` answers two questions on every reload:
//! - **What changed?** [`Control`](core::Control) keeps the current and previous
//!   snapshots and a field-path change set, queried with
//!   [`is_changed`](core::Control::is_changed) (`"Database.*"` style wildcards
//!   included).
//! - **Who needs to know?** [`Notifier`](notify::Notifier) updates registered
//!   consumers in order, broadcasts the first rejection to aborters, and
//!   watches the configuration file, re-attaching with backoff when it is
//!   removed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hotswap_control::prelude::*;
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug, Deserialize, Serialize)]
//! struct AppConfig {
//!     server: ServerConfig,
//! }
//!
//! #[derive(Debug, Deserialize, Serialize)]
//! struct ServerConfig {
//!     port: u16,
//! }
//!
//! impl Configuration for AppConfig {}
//!
//! # async fn example() -> hotswap_control::error::Result<()> {
//! let token = CancellationToken::new();
//! let control = Arc::new(
//!     Control::<AppConfig>::builder()
//!         .with_file("config/default.yaml")
//!         .build()?,
//! );
//!
//! let notifier = Notifier::new(token.clone(), control);
//! notifier.register_consumer(|_: &CancellationToken, control: &Control<AppConfig>| -> Result<()> {
//!     if control.is_changed("server.*") {
//!         println!("Server port: {}", control.snapshot().server.port);
//!     }
//!     Ok(())
//! })?;
//!
//! notifier.notify()?;
//! notifier.watch()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `file-watch` (default): watch the configuration file with the `notify` crate.
//!   Without it, [`Notifier::watch_with`](notify::Notifier::watch_with) still
//!   accepts a custom [`WatchResource`](notify::WatchResource).

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod sources;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{ChangeSet, Configuration, Control, ControlBuilder, DiffFallback};
    pub use crate::error::{ConfigError, Result};
    pub use crate::notify::{Aborter, Backoff, Notifier, Updatable, WatchState};
    pub use crate::sources::{ConfigSource, FileSource, MemorySource};
}
