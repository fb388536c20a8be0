//! The capability every configuration type provides.

use crate::notify::Updatable;
use serde::Serialize;

/// A configuration document that can be tracked by a [`Control`](crate::core::Control).
///
/// The type must be serializable so successive snapshots can be compared
/// field by field. Implementing it is usually a one-liner:
///
/// ```rust
/// use hotswap_control::core::Configuration;
/// use serde::Serialize;
///
/// #[derive(Debug, Serialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// impl Configuration for AppConfig {}
/// ```
///
/// A configuration that wants to react to its own reloads returns itself from
/// [`as_updatable`](Configuration::as_updatable). It is then updated before any
/// registered consumer, and a failure there does not abort the dispatch.
pub trait Configuration: Serialize + Send + Sync + Sized + 'static {
    /// Expose the consumer capability of this configuration value, if any.
    fn as_updatable(&self) -> Option<&dyn Updatable<Self>> {
        None
    }
}
