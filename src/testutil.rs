//! Shared test helpers — available to all `#[cfg(test)]` modules in the crate.

use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::{Config, NodeConfig, QueueConfig, SeatingConfig};
use crate::notify::{Notification, Notifier};
use crate::queue::Waitlist;
use crate::seating::SeatingRegistry;
use crate::storage::Database;
use crate::AppState;

/// Open a fresh database in a temporary directory.
///
/// Returns both the `Database` and the `TempDir` guard — the caller must
/// keep the `TempDir` alive for the duration of the test.
pub fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path()).unwrap();
    (db, temp_dir)
}

/// A minimal `Config` suitable for unit tests.
pub fn test_config() -> Config {
    Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:8080".to_string(),
            data_dir: "/tmp/test".to_string(),
            id: "test-instance".to_string(),
        },
        queue: QueueConfig::default(),
        seating: SeatingConfig::default(),
        test_mode: false,
    }
}

/// Build a `Waitlist` around the given database, returning the receiving
/// end of its notification channel so tests can assert on published events.
pub fn test_waitlist(db: Database) -> (Waitlist, UnboundedReceiver<Notification>) {
    let (notifier, rx) = Notifier::channel();
    let waitlist = Waitlist::restore(db, notifier, QueueConfig::default()).unwrap();
    (waitlist, rx)
}

/// Build a full `Arc<AppState>` around the given database. The
/// notification receiver is returned alongside so events are observable
/// (and the channel stays open).
pub fn test_state(db: Database) -> (Arc<AppState>, UnboundedReceiver<Notification>) {
    let config = test_config();
    let (waitlist, rx) = test_waitlist(db.clone());
    let seating = SeatingRegistry::restore_or_seed(db.clone(), &config.seating).unwrap();
    (
        Arc::new(AppState {
            config,
            db,
            seating,
            waitlist,
        }),
        rx,
    )
}
