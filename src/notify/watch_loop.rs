//! The background task driving configuration file watching.

use crate::core::Configuration;
use crate::notify::watcher::{WatchEvent, WatchEventKind, WatchStreams};
use crate::notify::{Notifier, WatchState};
use tokio::sync::mpsc;

/// Consume watch events until a stream closes or the token is cancelled.
///
/// Cancellation wins over pending events. Operational errors never end the
/// loop; they are logged or retried. Every reload and notification triggered
/// by watching runs on this task.
pub(crate) async fn run<C: Configuration>(notifier: Notifier<C>, mut streams: WatchStreams) {
    let token = notifier.token().clone();
    let (retry_tx, mut retries) = mpsc::unbounded_channel();

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => break,
            event = streams.events.recv() => match event {
                Some(event) => handle(&notifier, event, &retry_tx),
                None => break,
            },
            err = streams.errors.recv() => match err {
                Some(err) => tracing::warn!(error = %err, "watcher error"),
                None => break,
            },
            Some(attempt) = retries.recv() => notifier.reattach(attempt, &retry_tx),
        }
    }

    notifier.release();
    tracing::info!("watcher finished");
}

fn handle<C: Configuration>(
    notifier: &Notifier<C>,
    event: WatchEvent,
    retries: &mpsc::UnboundedSender<u32>,
) {
    match event.kind {
        WatchEventKind::Write => {
            tracing::debug!(path = %event.path.display(), "configuration modified");
            notifier.refresh();
        }
        WatchEventKind::Remove => {
            if let WatchState::Reattaching { attempt } = notifier.watch_state() {
                tracing::debug!(path = %event.path.display(), attempt, "configuration removed; re-attach already pending");
                return;
            }
            tracing::debug!(path = %event.path.display(), "configuration removed");
            notifier.reattach(0, retries);
        }
        WatchEventKind::Other => {}
    }
}
