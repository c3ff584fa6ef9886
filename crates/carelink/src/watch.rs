// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `carelink watch` command implementation.
//!
//! Spawns a directory watcher for one identity and prints every refreshed
//! conversation-list snapshot until interrupted.

use std::sync::Arc;

use carelink_bus::EventBus;
use carelink_config::model::CarelinkConfig;
use carelink_core::{CarelinkError, ConversationStore, ConversationSummary};
use carelink_messaging::{ConversationDirectory, DirectoryWatcher};
use carelink_storage::SqliteStore;
use tracing::info;

/// Run the `carelink watch` command for the given identity id.
pub async fn run_watch(config: &CarelinkConfig, identity_id: &str) -> Result<(), CarelinkError> {
    let bus = EventBus::new(config.bus.capacity);
    let store = SqliteStore::new(config.storage.clone(), bus.clone());
    store.initialize().await?;

    let identity = store
        .get_identity(identity_id)
        .await?
        .ok_or_else(|| CarelinkError::NotFound {
            entity: "identity",
            id: identity_id.to_string(),
        })?;
    info!(identity_id, role = %identity.role, "watching conversations");

    let store: Arc<dyn ConversationStore> = Arc::new(store);
    let directory = ConversationDirectory::new(store);
    let watcher = DirectoryWatcher::spawn(directory, &bus, identity).await?;

    print_snapshot(&watcher.snapshot());
    let mut snapshots = watcher.subscribe_snapshots();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down watcher");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow().clone();
                print_snapshot(&snapshot);
            }
        }
    }

    watcher.shutdown().await;
    Ok(())
}

fn print_snapshot(summaries: &[ConversationSummary]) {
    println!("-- {} conversation(s) --", summaries.len());
    for summary in summaries {
        let preview = summary
            .last_message
            .as_ref()
            .map(|m| m.content.as_str())
            .unwrap_or("(no messages)");
        println!(
            "{}  {}  unread={}  {}",
            summary.last_message_at, summary.counterpart_name, summary.unread_count, preview
        );
    }
}
