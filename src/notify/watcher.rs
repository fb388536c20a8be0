//! Watch resources that observe the configuration file.

use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

#[cfg(feature = "file-watch")]
use notify::{RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};

/// The kind of change reported for a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    /// File content was written
    Write,
    /// File was removed
    Remove,
    /// Anything else; ignored by the watch loop
    Other,
}

/// A change reported by a watch resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// The path that changed
    pub path: PathBuf,
    /// What happened to it
    pub kind: WatchEventKind,
}

impl WatchEvent {
    /// Create a new event.
    pub fn new(path: impl Into<PathBuf>, kind: WatchEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// The two streams a watch resource feeds: change events and watcher errors.
///
/// The watch loop ends when either stream closes.
pub struct WatchStreams {
    /// Change events
    pub events: mpsc::UnboundedReceiver<WatchEvent>,
    /// Runtime errors of the watch resource
    pub errors: mpsc::UnboundedReceiver<ConfigError>,
}

/// Sending halves matching a [`WatchStreams`].
#[derive(Clone)]
pub struct WatchSenders {
    /// Change events
    pub events: mpsc::UnboundedSender<WatchEvent>,
    /// Runtime errors of the watch resource
    pub errors: mpsc::UnboundedSender<ConfigError>,
}

impl WatchStreams {
    /// Create a connected pair of senders and streams.
    pub fn channel() -> (WatchSenders, Self) {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (error_tx, errors) = mpsc::unbounded_channel();
        (
            WatchSenders {
                events: event_tx,
                errors: error_tx,
            },
            Self { events, errors },
        )
    }
}

/// A resource that can be asked to watch a path.
///
/// Dropping the resource releases it.
pub trait WatchResource: Send + 'static {
    /// Start watching `path`. Also used to re-attach after the path was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be watched (e.g., doesn't exist).
    fn add(&mut self, path: &Path) -> Result<()>;
}

/// Watch resource backed by the platform's recommended `notify` watcher.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_control::notify::{FsWatcher, WatchResource};
/// use std::path::Path;
///
/// # fn example() -> hotswap_control::error::Result<()> {
/// let (mut watcher, streams) = FsWatcher::new()?;
/// watcher.add(Path::new("/etc/app/config.yaml"))?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "file-watch")]
pub struct FsWatcher {
    watcher: RecommendedWatcher,
}

#[cfg(feature = "file-watch")]
impl FsWatcher {
    /// Create a new watcher and the streams it reports to.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying file watcher cannot be created.
    pub fn new() -> Result<(Self, WatchStreams)> {
        let (senders, streams) = WatchStreams::channel();

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let kind = classify(&event.kind);
                    for path in event.paths {
                        let _ = senders.events.send(WatchEvent { path, kind });
                    }
                }
                Err(err) => {
                    let _ = senders.errors.send(ConfigError::WatchError(err.to_string()));
                }
            }
        })
        .map_err(|e| ConfigError::WatchError(format!("setting up new watcher for config: {}", e)))?;

        Ok((Self { watcher }, streams))
    }
}

#[cfg(feature = "file-watch")]
impl WatchResource for FsWatcher {
    fn add(&mut self, path: &Path) -> Result<()> {
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| {
                ConfigError::WatchError(format!(
                    "adding '{}' to watcher: {}",
                    path.display(),
                    e
                ))
            })
    }
}

#[cfg(feature = "file-watch")]
fn classify(kind: &notify::EventKind) -> WatchEventKind {
    use notify::EventKind;
    use notify::event::ModifyKind;

    match kind {
        EventKind::Modify(ModifyKind::Name(_)) => WatchEventKind::Other,
        EventKind::Modify(_) => WatchEventKind::Write,
        EventKind::Remove(_) => WatchEventKind::Remove,
        _ => WatchEventKind::Other,
    }
}

#[cfg(all(test, feature = "file-watch"))]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind, RenameMode};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::timeout;

    #[test]
    fn test_classify() {
        use notify::EventKind;

        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            WatchEventKind::Write
        );
        assert_eq!(
            classify(&EventKind::Remove(RemoveKind::File)),
            WatchEventKind::Remove
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            WatchEventKind::Other
        );
        assert_eq!(
            classify(&EventKind::Create(CreateKind::File)),
            WatchEventKind::Other
        );
    }

    #[tokio::test]
    async fn test_watch_nonexistent_file() {
        let (mut watcher, _streams) = FsWatcher::new().unwrap();
        let result = watcher.add(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigError::WatchError(_))));
    }

    #[tokio::test]
    async fn test_file_change_produces_write_event() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "port: 8080").unwrap();

        let (mut watcher, mut streams) = FsWatcher::new().unwrap();
        watcher.add(&config_path).unwrap();

        let path = config_path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            fs::write(&path, "port: 9090").unwrap();
        });

        let received = timeout(Duration::from_secs(2), async {
            while let Some(event) = streams.events.recv().await {
                if event.kind == WatchEventKind::Write {
                    return Some(event);
                }
            }
            None
        })
        .await
        .unwrap();
        assert!(received.is_some());
    }
}
