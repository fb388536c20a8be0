//! Ordered configuration change notification and file watching.

use crate::core::{Configuration, Control};
use crate::error::{ConfigError, Result};
use crate::notify::backoff::Backoff;
use crate::notify::subscriber::{Aborter, SubscriberRegistry, Updatable};
use crate::notify::watch_loop;
use crate::notify::watcher::{WatchResource, WatchStreams};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "file-watch")]
use crate::notify::watcher::FsWatcher;

/// Where the watch loop is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Watching has not been started.
    Idle,
    /// The configuration file is being watched.
    Watching,
    /// The file was removed and re-adding it has failed `attempt` times so far.
    Reattaching {
        /// Number of the attempt that failed last
        attempt: u32,
    },
    /// Re-attaching was given up; the loop still runs but the file is not watched.
    Disabled,
    /// The loop has ended and the watch resource is released.
    Closed,
}

struct WatchSlot {
    resource: Option<Box<dyn WatchResource>>,
    state: WatchState,
}

struct NotifierInner<C> {
    token: CancellationToken,
    control: Arc<Control<C>>,
    registry: SubscriberRegistry<C>,
    initial_sent: AtomicBool,
    backoff: Backoff,
    watch: Mutex<WatchSlot>,
}

/// Tells subsystems about configuration changes.
///
/// Consumers are updated one after another, in registration order. The first
/// consumer to reject an update stops the dispatch and triggers a single abort
/// broadcast to every registered [`Aborter`].
///
/// Cloning is cheap; clones share registrations and the watch loop.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_control::prelude::*;
/// use serde::{Deserialize, Serialize};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Debug, Deserialize, Serialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// impl Configuration for AppConfig {}
///
/// # async fn example() -> Result<()> {
/// let token = CancellationToken::new();
/// let control = Control::<AppConfig>::builder()
///     .with_file("config.yaml")
///     .build()?;
///
/// let notifier = Notifier::new(token.clone(), Arc::new(control));
/// notifier.register_consumer(|_: &CancellationToken, control: &Control<AppConfig>| -> Result<()> {
///     println!("port is now {}", control.snapshot().port);
///     Ok(())
/// })?;
/// let shutdown = token.clone();
/// notifier.register_aborter(move |_: &ConfigError| shutdown.cancel());
///
/// notifier.notify()?;
/// notifier.watch()?;
///
/// token.cancelled().await;
/// # Ok(())
/// # }
/// ```
pub struct Notifier<C> {
    inner: Arc<NotifierInner<C>>,
}

impl<C> Clone for Notifier<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Configuration> Notifier<C> {
    /// Create a notifier bound to a cancellation token and a controller.
    ///
    /// Cancelling the token is the only way to stop the watch loop.
    pub fn new(token: CancellationToken, control: Arc<Control<C>>) -> Self {
        Self::with_backoff(token, control, Backoff::default())
    }

    /// Like [`new`](Self::new), with a custom re-attach schedule.
    pub fn with_backoff(
        token: CancellationToken,
        control: Arc<Control<C>>,
        backoff: Backoff,
    ) -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                token,
                control,
                registry: SubscriberRegistry::new(),
                initial_sent: AtomicBool::new(false),
                backoff,
                watch: Mutex::new(WatchSlot {
                    resource: None,
                    state: WatchState::Idle,
                }),
            }),
        }
    }

    /// The controller whose configuration is propagated.
    pub fn control(&self) -> &Arc<Control<C>> {
        &self.inner.control
    }

    /// The token passed to consumers and watched by the watch loop.
    pub fn token(&self) -> &CancellationToken {
        &self.inner.token
    }

    /// Add consumers to the list of services to be notified.
    ///
    /// Once [`notify`](Self::notify) has run at least once, each new consumer
    /// is updated immediately with the current configuration; consumers that
    /// were already registered are not notified again.
    ///
    /// # Errors
    ///
    /// Returns the error of the first new consumer that rejects the current
    /// configuration. The remaining new consumers stay registered but are not
    /// updated.
    pub fn register_consumers<I>(&self, consumers: I) -> Result<()>
    where
        I: IntoIterator<Item = Arc<dyn Updatable<C>>>,
    {
        let consumers: Vec<_> = consumers.into_iter().collect();
        self.inner.registry.add_consumers(consumers.iter().cloned());

        if !self.inner.initial_sent.load(Ordering::SeqCst) {
            return Ok(());
        }

        for consumer in &consumers {
            self.inner
                .registry
                .update(consumer.as_ref(), &self.inner.token, &self.inner.control)?;
        }
        Ok(())
    }

    /// Add a single consumer. See [`register_consumers`](Self::register_consumers).
    ///
    /// # Errors
    ///
    /// Returns the consumer's error if it is updated immediately and rejects
    /// the current configuration.
    pub fn register_consumer<U>(&self, consumer: U) -> Result<()>
    where
        U: Updatable<C> + 'static,
    {
        self.register_consumers([Arc::new(consumer) as Arc<dyn Updatable<C>>])
    }

    /// Add aborters to the list of services handling abortions.
    pub fn register_aborters<I>(&self, aborters: I)
    where
        I: IntoIterator<Item = Arc<dyn Aborter>>,
    {
        self.inner.registry.add_aborters(aborters);
    }

    /// Add a single aborter.
    pub fn register_aborter<A>(&self, aborter: A)
    where
        A: Aborter + 'static,
    {
        self.register_aborters([Arc::new(aborter) as Arc<dyn Aborter>]);
    }

    /// Send the current configuration to every consumer.
    ///
    /// This method should be called right after consumers and aborters are
    /// registered. If the configuration value itself is [`Updatable`], it is
    /// updated first and its result is only logged.
    ///
    /// # Errors
    ///
    /// Returns the first consumer error. Consumers registered after the
    /// failing one are not updated for this call.
    pub fn notify(&self) -> Result<()> {
        let inner = &self.inner;

        let config = inner.control.snapshot();
        if let Some(own) = config.as_updatable() {
            if let Err(err) = own.update_config(&inner.token, &inner.control) {
                tracing::debug!(error = %err, "configuration self-update failed");
            }
        }

        let result = inner.registry.dispatch(&inner.token, &inner.control);
        inner.initial_sent.store(true, Ordering::SeqCst);
        result
    }

    /// Whether a consumer has rejected an update and aborters were called.
    pub fn is_aborting(&self) -> bool {
        self.inner.registry.is_aborting()
    }

    /// Number of registered consumers.
    pub fn consumer_count(&self) -> usize {
        self.inner.registry.consumer_count()
    }

    /// Number of registered aborters.
    pub fn aborter_count(&self) -> usize {
        self.inner.registry.aborter_count()
    }

    /// Current state of the watch loop.
    pub fn watch_state(&self) -> WatchState {
        self.inner.watch.lock().state
    }

    /// Start watching the configuration file for changes.
    ///
    /// Writes reload the configuration and, if anything changed, notify the
    /// consumers. When the file is removed it is re-added immediately, then
    /// retried with exponential backoff (starting with 1/2 second, with a
    /// multiplier of 1.5, giving up after 10 retries).
    ///
    /// Returns once the watch is set up; the loop runs on a background task
    /// until the token is cancelled. Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot be created, the file cannot be
    /// added to it, or watching has already been started.
    #[cfg(feature = "file-watch")]
    pub fn watch(&self) -> Result<()> {
        let (resource, streams) = FsWatcher::new()?;
        self.watch_with(resource, streams)
    }

    /// Start watching through a custom watch resource.
    ///
    /// `resource` must report to `streams`. See [`watch`](Self::watch).
    ///
    /// # Errors
    ///
    /// Returns an error if the identity cannot be added to the resource, or
    /// watching has already been started.
    pub fn watch_with<W>(&self, mut resource: W, streams: WatchStreams) -> Result<()>
    where
        W: WatchResource,
    {
        let path = self.inner.control.identity();
        {
            let mut slot = self.inner.watch.lock();
            if slot.state != WatchState::Idle {
                return Err(ConfigError::AlreadyWatching);
            }
            resource.add(&path)?;
            slot.resource = Some(Box::new(resource));
            slot.state = WatchState::Watching;
        }

        tracing::debug!(path = %path.display(), "watching configuration");
        tokio::spawn(watch_loop::run(self.clone(), streams));
        Ok(())
    }

    /// Reload and, if the change set is not empty, notify.
    pub(crate) fn refresh(&self) {
        let control = &self.inner.control;
        if let Err(err) = control.reload() {
            tracing::warn!(error = %err, "error reloading config");
            return;
        }

        if control.changes().is_empty() {
            tracing::debug!("configuration unchanged; skipping notification");
            return;
        }

        if let Err(err) = self.notify() {
            tracing::warn!(error = %err, "configuration update rejected");
        }
    }

    /// Try to re-add the removed file, scheduling a retry on failure.
    ///
    /// Runs on the watch-loop task. A failed attempt arms a timer that hands
    /// the next attempt number back to the loop through `retries`, so re-adds
    /// and the refresh after a successful one never race with event handling.
    pub(crate) fn reattach(&self, attempt: u32, retries: &mpsc::UnboundedSender<u32>) {
        let path = self.inner.control.identity();

        let result = {
            let mut slot = self.inner.watch.lock();
            let Some(resource) = slot.resource.as_mut() else {
                return;
            };
            let result = resource.add(&path);
            slot.state = match result {
                Ok(()) => WatchState::Watching,
                Err(_) if self.inner.backoff.exhausted(attempt) => WatchState::Disabled,
                Err(_) => WatchState::Reattaching { attempt },
            };
            result
        };

        let err = match result {
            Ok(()) => {
                tracing::debug!(path = %path.display(), attempt, "configuration file watch re-added");
                self.refresh();
                return;
            }
            Err(err) => err,
        };

        if self.inner.backoff.exhausted(attempt) {
            tracing::warn!(
                path = %path.display(),
                attempt,
                error = %err,
                "error re-adding config file watcher; disable watching"
            );
            return;
        }

        let delay = self.inner.backoff.delay(attempt);
        tracing::warn!(
            path = %path.display(),
            attempt,
            retry_in = ?delay,
            error = %err,
            "error re-adding config file watcher"
        );

        let token = self.inner.token.clone();
        let retries = retries.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = retries.send(attempt + 1);
                }
            }
        });
    }

    /// Drop the watch resource and mark the loop closed.
    pub(crate) fn release(&self) {
        let mut slot = self.inner.watch.lock();
        slot.resource = None;
        slot.state = WatchState::Closed;
    }
}
