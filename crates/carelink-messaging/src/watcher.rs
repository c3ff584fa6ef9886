// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory watcher: turns change events into fresh conversation-list
//! snapshots.
//!
//! The event bus delivers at-least-once with possible lag, so no event
//! payload is applied to the snapshot directly. Every signal triggers a full
//! re-query; a failed refresh keeps the previous snapshot (stale but
//! consistent) and waits for the next signal.

use carelink_bus::EventBus;
use carelink_core::{CarelinkError, ConversationSummary, Identity};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::directory::ConversationDirectory;

/// A background task holding a scoped bus subscription for one identity and
/// publishing refreshed conversation lists on a watch channel.
///
/// The subscription is released when the watcher shuts down; dropping the
/// handle aborts the task, so a torn-down view or an ended session cannot
/// leak the channel or keep refreshing against a stale identity.
pub struct DirectoryWatcher {
    snapshot_rx: watch::Receiver<Vec<ConversationSummary>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl DirectoryWatcher {
    /// Subscribe to changes involving `identity` and start refreshing.
    ///
    /// The initial snapshot is queried before the task starts, so the first
    /// `snapshot()` already reflects current state.
    pub async fn spawn(
        directory: ConversationDirectory,
        bus: &EventBus,
        identity: Identity,
    ) -> Result<Self, CarelinkError> {
        let mut subscription = bus.subscribe_scoped(&identity.id);
        let initial = directory.list_conversations(&identity).await?;
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!(identity_id = %identity.id, "watcher shut down");
                        break;
                    }
                    signal = subscription.recv() => match signal {
                        Some(_) => {
                            // Trigger only: re-query for the true state.
                            match directory.list_conversations(&identity).await {
                                Ok(fresh) => {
                                    if snapshot_tx.send(fresh).is_err() {
                                        // Nobody is watching anymore.
                                        break;
                                    }
                                }
                                Err(e) => {
                                    warn!(
                                        identity_id = %identity.id,
                                        error = %e,
                                        retryable = e.is_retryable(),
                                        "refresh failed, keeping previous snapshot"
                                    );
                                }
                            }
                        }
                        None => {
                            debug!(identity_id = %identity.id, "bus closed, watcher exiting");
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self {
            snapshot_rx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// The most recent conversation-list snapshot.
    pub fn snapshot(&self) -> Vec<ConversationSummary> {
        self.snapshot_rx.borrow().clone()
    }

    /// A receiver that can await snapshot changes (`changed().await`).
    pub fn subscribe_snapshots(&self) -> watch::Receiver<Vec<ConversationSummary>> {
        self.snapshot_rx.clone()
    }

    /// Stop the refresh task and wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        // Guaranteed release even without an explicit shutdown.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
