//! Consumers and aborters of configuration changes.

use crate::core::Control;
use crate::error::{ConfigError, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// Enables objects to have their configuration updated.
///
/// # Examples
///
/// ```rust
/// use hotswap_control::prelude::*;
/// use serde::Serialize;
/// use std::sync::atomic::{AtomicU16, Ordering};
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Serialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// impl Configuration for AppConfig {}
///
/// struct Listener {
///     port: AtomicU16,
/// }
///
/// impl Updatable<AppConfig> for Listener {
///     fn update_config(&self, _token: &CancellationToken, control: &Control<AppConfig>) -> Result<()> {
///         if control.is_changed("port") {
///             self.port.store(control.snapshot().port, Ordering::SeqCst);
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Updatable<C>: Send + Sync {
    /// Called by the [`Notifier`](crate::notify::Notifier) on configuration change.
    ///
    /// Returning an error rejects the change, stops the dispatch to the
    /// consumers registered after this one, and initiates abort.
    fn update_config(&self, token: &CancellationToken, control: &Control<C>) -> Result<()>;
}

impl<C, F> Updatable<C> for F
where
    F: Fn(&CancellationToken, &Control<C>) -> Result<()> + Send + Sync,
{
    fn update_config(&self, token: &CancellationToken, control: &Control<C>) -> Result<()> {
        self(token, control)
    }
}

/// Receives the error that made a consumer reject a configuration change.
///
/// Used to spread an abort through the application, e.g. to cancel the root
/// token and shut the service down. Fire-and-forget.
pub trait Aborter: Send + Sync {
    /// Called once, with the first rejection error.
    fn abort(&self, err: &ConfigError);
}

impl<F> Aborter for F
where
    F: Fn(&ConfigError) + Send + Sync,
{
    fn abort(&self, err: &ConfigError) {
        self(err)
    }
}

/// Ordered registry of consumers and aborters with a one-shot abort latch.
pub(crate) struct SubscriberRegistry<C> {
    consumers: RwLock<Vec<Arc<dyn Updatable<C>>>>,
    aborters: RwLock<Vec<Arc<dyn Aborter>>>,
    aborting: AtomicBool,
}

impl<C: 'static> SubscriberRegistry<C> {
    pub(crate) fn new() -> Self {
        Self {
            consumers: RwLock::new(Vec::new()),
            aborters: RwLock::new(Vec::new()),
            aborting: AtomicBool::new(false),
        }
    }

    pub(crate) fn add_consumers(&self, consumers: impl IntoIterator<Item = Arc<dyn Updatable<C>>>) {
        self.consumers.write().extend(consumers);
    }

    pub(crate) fn add_aborters(&self, aborters: impl IntoIterator<Item = Arc<dyn Aborter>>) {
        self.aborters.write().extend(aborters);
    }

    /// Update every consumer in registration order, stopping at the first failure.
    ///
    /// The list is copied first so consumers may register others while being
    /// updated.
    pub(crate) fn dispatch(&self, token: &CancellationToken, control: &Control<C>) -> Result<()> {
        let consumers = self.consumers.read().clone();
        for consumer in &consumers {
            self.update(consumer.as_ref(), token, control)?;
        }
        Ok(())
    }

    /// Update a single consumer, escalating its failure.
    pub(crate) fn update(
        &self,
        consumer: &dyn Updatable<C>,
        token: &CancellationToken,
        control: &Control<C>,
    ) -> Result<()> {
        consumer
            .update_config(token, control)
            .inspect_err(|err| self.escalate(err))
    }

    /// Broadcast `err` to every aborter, but only for the first failure.
    fn escalate(&self, err: &ConfigError) {
        if self.aborting.swap(true, Ordering::SeqCst) {
            return;
        }

        let aborters = self.aborters.read().clone();
        tracing::warn!(error = %err, aborters = aborters.len(), "configuration update rejected; aborting");
        for aborter in &aborters {
            aborter.abort(err);
        }
    }

    pub(crate) fn is_aborting(&self) -> bool {
        self.aborting.load(Ordering::SeqCst)
    }

    pub(crate) fn consumer_count(&self) -> usize {
        self.consumers.read().len()
    }

    pub(crate) fn aborter_count(&self) -> usize {
        self.aborters.read().len()
    }
}
