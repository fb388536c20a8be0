//! Configuration change notification system.
//!
//! Dispatches configuration changes to registered consumers, escalates
//! rejections to aborters, and watches the configuration file for changes.

mod backoff;
mod notifier;
mod subscriber;
mod watch_loop;
mod watcher;

pub use backoff::Backoff;
pub use notifier::{Notifier, WatchState};
pub use subscriber::{Aborter, Updatable};
pub use watcher::{WatchEvent, WatchEventKind, WatchResource, WatchSenders, WatchStreams};

#[cfg(feature = "file-watch")]
pub use watcher::FsWatcher;
