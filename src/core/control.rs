//! The controller tracking current and previous configuration snapshots.

use crate::core::changes::ChangeSet;
use crate::core::diff;
use crate::core::{Configuration, ControlBuilder};
use crate::error::{ConfigError, Result};
use crate::sources::ConfigSource;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// What to do with the change set when two snapshots cannot be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffFallback {
    /// Report everything as changed.
    #[default]
    MarkAllChanged,
    /// Leave the change set as it was after the previous reload.
    ///
    /// The change set then describes an older pair of snapshots than the one
    /// currently held.
    KeepPrevious,
}

/// A published configuration together with the changes that produced it.
struct Generation<C> {
    config: Arc<C>,
    changes: ChangeSet,
}

/// Keeps track of the current and previous configurations, and what changed
/// between them.
///
/// Readers never block: the current configuration and its change set are
/// published together through `arc-swap`. Reloads are serialized by a mutex
/// that also owns the previous snapshot.
///
/// # Examples
///
/// ```rust
/// use hotswap_control::prelude::*;
/// use serde::Serialize;
///
/// #[derive(Debug, Clone, Serialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// impl Configuration for AppConfig {}
///
/// # fn example() -> Result<()> {
/// let source = MemorySource::new("memory://app", AppConfig { port: 8080 });
/// let control = Control::new(source.clone())?;
/// assert!(control.is_changed("*"));
///
/// source.set(AppConfig { port: 9090 });
/// control.reload()?;
/// assert!(control.is_changed("port"));
/// assert_eq!(control.snapshot().port, 9090);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct Control<C> {
    source: Box<dyn ConfigSource<C>>,
    current: ArcSwap<Generation<C>>,
    /// Reload guard; holds the snapshot replaced by the last reload
    previous: Mutex<Option<Arc<C>>>,
    diff_fallback: DiffFallback,
}

impl<C: Configuration> Control<C> {
    /// Create a controller for `source` and load the initial configuration.
    ///
    /// Shorthand for `Control::builder().with_source(source).build()`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoSource`] if the source identity is empty, or a
    /// [`ConfigError::LoadError`] if the initial load fails.
    pub fn new<S>(source: S) -> Result<Self>
    where
        S: ConfigSource<C> + 'static,
    {
        ControlBuilder::new().with_source(source).build()
    }

    /// Create a new builder for constructing a controller.
    pub fn builder() -> ControlBuilder<C> {
        ControlBuilder::new()
    }

    /// Validate the source and perform the initial load.
    pub(crate) fn from_parts(
        source: Box<dyn ConfigSource<C>>,
        diff_fallback: DiffFallback,
    ) -> Result<Self> {
        if source.identity().as_os_str().is_empty() {
            return Err(ConfigError::NoSource);
        }

        let config = load_from(source.as_ref())?;
        tracing::debug!(source = %source.name(), "initial configuration loaded");

        Ok(Self {
            source,
            current: ArcSwap::from_pointee(Generation {
                config: Arc::new(config),
                changes: ChangeSet::all(),
            }),
            previous: Mutex::new(None),
            diff_fallback,
        })
    }

    /// Load a fresh configuration and recompute the change set.
    ///
    /// On a load failure nothing changes: the current snapshot, the previous
    /// snapshot and the change set all stay as they were. Concurrent reloads
    /// are applied one at a time.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::LoadError`] wrapping the source's failure.
    pub fn reload(&self) -> Result<()> {
        let mut previous = self.previous.lock();

        let fresh = Arc::new(load_from(self.source.as_ref())?);
        let current = self.current.load_full();

        let changes = match diff::diff(current.config.as_ref(), fresh.as_ref()) {
            Ok(changes) if changes.is_empty() => ChangeSet::none(),
            Ok(changes) => {
                let paths: Vec<String> = changes.iter().map(diff::Change::dotted_path).collect();
                tracing::debug!(changed = ?paths, "configuration changed");
                ChangeSet::from_paths(paths)
            }
            Err(err) => {
                tracing::warn!(error = %err, "change diff unsuccessful");
                match self.diff_fallback {
                    DiffFallback::MarkAllChanged => ChangeSet::all(),
                    DiffFallback::KeepPrevious => current.changes.clone(),
                }
            }
        };

        *previous = Some(Arc::clone(&current.config));
        self.current.store(Arc::new(Generation {
            config: fresh,
            changes,
        }));

        Ok(())
    }

    /// Get a reference-counted handle to the current configuration.
    ///
    /// This is a lock-free read.
    pub fn snapshot(&self) -> Arc<C> {
        Arc::clone(&self.current.load().config)
    }

    /// The configuration replaced by the most recent successful reload, if any.
    pub fn previous(&self) -> Option<Arc<C>> {
        self.previous.lock().clone()
    }

    /// The change set produced by the most recent successful reload.
    pub fn changes(&self) -> ChangeSet {
        self.current.load().changes.clone()
    }

    /// Confirm whether a certain portion of the configuration has changed.
    ///
    /// Keys are field names joined with `.`; numbers address sequence
    /// positions. A trailing `.*` matches any key below the given one. See
    /// [`ChangeSet::matches`] for the details.
    pub fn is_changed(&self, item: &str) -> bool {
        self.current.load().changes.matches(item)
    }

    /// The watchable identity of the configuration source.
    pub fn identity(&self) -> PathBuf {
        self.source.identity()
    }

    /// Human-readable name of the configuration source.
    pub fn source_name(&self) -> String {
        self.source.name()
    }
}

fn load_from<C>(source: &dyn ConfigSource<C>) -> Result<C> {
    source.load().map_err(|e| {
        let detail = match e {
            ConfigError::LoadError(detail) => detail,
            other => other.to_string(),
        };
        ConfigError::LoadError(format!("loading '{}': {}", source.name(), detail))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MemorySource;
    use serde::Serialize;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Clone, Serialize, PartialEq)]
    struct TestConfig {
        value: i32,
        name: String,
    }

    impl Configuration for TestConfig {}

    fn config(value: i32) -> TestConfig {
        TestConfig {
            value,
            name: "test".to_string(),
        }
    }

    struct FlakySource {
        inner: MemorySource<TestConfig>,
        fail: Arc<AtomicBool>,
    }

    impl ConfigSource<TestConfig> for FlakySource {
        fn identity(&self) -> PathBuf {
            self.inner.identity()
        }

        fn load(&self) -> Result<TestConfig> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ConfigError::LoadError("disk on fire".to_string()));
            }
            self.inner.load()
        }
    }

    #[test]
    fn test_first_load_marks_everything() {
        let control = Control::new(MemorySource::new("memory", config(1))).unwrap();
        assert!(control.changes().is_all());
        assert!(control.is_changed("*"));
        assert!(control.is_changed("value"));
        assert!(control.is_changed("anything.at.all"));
        assert!(control.previous().is_none());
    }

    #[test]
    fn test_empty_identity_is_rejected() {
        let result = Control::new(MemorySource::new("", config(1)));
        assert!(matches!(result, Err(ConfigError::NoSource)));
    }

    #[test]
    fn test_initial_load_failure() {
        let source = FlakySource {
            inner: MemorySource::new("memory", config(1)),
            fail: Arc::new(AtomicBool::new(true)),
        };
        let result = Control::new(source);
        match result {
            Err(ConfigError::LoadError(msg)) => assert!(msg.contains("disk on fire")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a load error"),
        }
    }

    #[test]
    fn test_load_error_is_not_wrapped_twice() {
        let fail = Arc::new(AtomicBool::new(false));
        let control = Control::new(FlakySource {
            inner: MemorySource::new("memory", config(1)),
            fail: Arc::clone(&fail),
        })
        .unwrap();
        fail.store(true, Ordering::SeqCst);

        let message = control.reload().unwrap_err().to_string();
        assert_eq!(message.matches("Failed to load configuration").count(), 1);
        assert!(message.contains("loading 'memory'"));
        assert!(message.contains("disk on fire"));
    }

    #[test]
    fn test_reload_without_change() {
        let control = Control::new(MemorySource::new("memory", config(1))).unwrap();
        control.reload().unwrap();

        assert!(control.changes().is_empty());
        assert!(!control.is_changed("*"));
        assert!(!control.is_changed("value"));
        assert_eq!(control.previous().as_deref(), Some(&config(1)));
    }

    #[test]
    fn test_reload_with_change() {
        let source = MemorySource::new("memory", config(1));
        let control = Control::new(source.clone()).unwrap();

        source.set(config(2));
        control.reload().unwrap();

        assert!(control.is_changed("value"));
        assert!(!control.is_changed("name"));
        assert_eq!(control.snapshot().value, 2);
        assert_eq!(control.previous().unwrap().value, 1);
    }

    #[test]
    fn test_failed_reload_keeps_state() {
        let inner = MemorySource::new("memory", config(1));
        let fail = Arc::new(AtomicBool::new(false));
        let control = Control::new(FlakySource {
            inner: inner.clone(),
            fail: Arc::clone(&fail),
        })
        .unwrap();

        inner.set(config(2));
        control.reload().unwrap();

        inner.set(config(3));
        fail.store(true, Ordering::SeqCst);
        assert!(matches!(control.reload(), Err(ConfigError::LoadError(_))));

        assert_eq!(control.snapshot().value, 2);
        assert_eq!(control.previous().unwrap().value, 1);
        assert!(control.is_changed("value"));
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(untagged)]
    enum Shape {
        Flat(i32),
        Nested { inner: i32 },
    }

    impl Configuration for Shape {}

    #[test]
    fn test_diff_failure_marks_all_by_default() {
        let source = MemorySource::new("memory", Shape::Flat(1));
        let control = Control::new(source.clone()).unwrap();
        control.reload().unwrap();
        assert!(control.changes().is_empty());

        source.set(Shape::Nested { inner: 1 });
        control.reload().unwrap();
        assert!(control.changes().is_all());
    }

    #[test]
    fn test_diff_failure_can_keep_previous_changes() {
        let source = MemorySource::new("memory", Shape::Flat(1));
        let control = Control::builder()
            .with_source(source.clone())
            .on_diff_failure(DiffFallback::KeepPrevious)
            .build()
            .unwrap();
        control.reload().unwrap();
        assert!(control.changes().is_empty());

        source.set(Shape::Nested { inner: 1 });
        control.reload().unwrap();

        // The snapshot advanced but the change set is the stale, empty one.
        assert!(control.changes().is_empty());
        assert!(matches!(*control.snapshot(), Shape::Nested { .. }));
    }

    #[test]
    fn test_concurrent_reloads() {
        let source = MemorySource::new("memory", config(0));
        let control = Arc::new(Control::new(source.clone()).unwrap());

        let handles: Vec<_> = (1..=8)
            .map(|i| {
                let control = Arc::clone(&control);
                let source = source.clone();
                std::thread::spawn(move || {
                    source.set(config(i));
                    control.reload().unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let current = control.snapshot();
        assert!((1..=8).contains(&current.value));
    }
}
