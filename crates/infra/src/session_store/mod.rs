//! Session store adapters
//!
//! - [`InMemorySessionStore`]: process-local, `DashMap` backed
//! - [`SqliteSessionStore`]: file-backed, shareable between processes
//!
//! Both persist the PKCE challenge as JSON under
//! `pkce:session:<session-id>` with an absolute expiry.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use authbroker_core::SessionStore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

pub use memory::InMemorySessionStore;
pub use sqlite::SqliteSessionStore;

/// Periodically drop expired entries
///
/// Expired entries are already invisible to readers; the sweep only
/// reclaims space. The task runs until the returned handle is aborted.
pub fn spawn_session_janitor(store: Arc<dyn SessionStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "Purged expired login sessions"),
                Err(err) => warn!(error = %err, "Session cleanup failed"),
            }
        }
    })
}
