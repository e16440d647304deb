//! SQLite persistence across process restarts.
//!
//! Run with: `cargo test --test sqlite_store`

mod common;

use std::sync::Arc;

use chrono::Utc;
use common::{init_test_logging, sample_at};
use tempfile::TempDir;
use trailsync::{
    DurableStore, OfflineQueueStore, PathPoint, PathTraceStore, SessionGate, SettingsPatch,
    SettingsStore, SharedStore, SqliteStore,
};

/// Helper: open a shared store over a database file in `dir`.
fn open(dir: &TempDir) -> (Arc<SqliteStore>, SharedStore) {
    let db_path = dir.path().join("trailsync.db");
    let sqlite =
        Arc::new(SqliteStore::new(db_path.to_str().unwrap()).expect("failed to open store"));
    let shared = SharedStore::new(sqlite.clone());
    (sqlite, shared)
}

#[test]
fn test_state_survives_reopen() {
    init_test_logging();
    let dir = TempDir::new().expect("failed to create temp dir");
    let now = Utc::now();

    let (queued_id, session_id) = {
        let (_sqlite, store) = open(&dir);
        let gate = SessionGate::new(store.clone());
        let session = gate.start_session("12").unwrap();
        let queue = OfflineQueueStore::new(store.clone());
        let first = queue.append(sample_at(54.1, now)).unwrap();
        queue.append(sample_at(54.2, now)).unwrap();
        queue.mark_synced(&first.id).unwrap();
        PathTraceStore::new(store.clone())
            .append(PathPoint::from(&first))
            .unwrap();
        SettingsStore::new(store)
            .update(SettingsPatch {
                path_recording: Some(false),
                ..SettingsPatch::default()
            })
            .unwrap();
        (first.id, session.session_id)
    };

    let (sqlite, store) = open(&dir);
    let queue = OfflineQueueStore::new(store.clone());
    let samples = queue.all();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].id, queued_id);
    assert!(samples[0].synced);
    assert_eq!(queue.pending().len(), 1);

    let gate = SessionGate::new(store.clone());
    assert!(gate.evaluate().allowed);
    assert_eq!(gate.current().unwrap().session_id, session_id);

    assert_eq!(PathTraceStore::new(store.clone()).len(), 1);
    assert!(!SettingsStore::new(store).get().path_recording);
    assert_eq!(sqlite.key_count().unwrap(), 4);
}

#[test]
fn test_legacy_blob_is_migrated_on_next_write() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (sqlite, store) = open(&dir);

    // Bare array as written by the first app release
    let legacy = r#"[{"id": 1718000000000, "latitude": 54.68, "longitude": 25.27,
        "timestamp": "2024-06-10T06:13:20.000Z", "isBackground": true, "synced": false}]"#;
    sqlite.set("offline_locations", legacy.as_bytes()).unwrap();

    let queue = OfflineQueueStore::new(store);
    let pending = queue.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "legacy-1718000000000");

    queue.append(sample_at(54.0, Utc::now())).unwrap();
    let raw = sqlite.get("offline_locations").unwrap().unwrap();
    let envelope: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(envelope["version"], 1);
    assert_eq!(envelope["data"].as_array().unwrap().len(), 2);
}

#[test]
fn test_corrupt_blob_is_set_aside() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let (sqlite, store) = open(&dir);
    sqlite.set("user_path_history", b"{{ not json").unwrap();

    let path = PathTraceStore::new(store);
    assert!(path.is_empty());
    path.append(PathPoint::new(54.0, 25.0, Utc::now())).unwrap();

    assert_eq!(path.len(), 1);
    assert_eq!(
        sqlite.get("user_path_history.corrupt").unwrap(),
        Some(b"{{ not json".to_vec())
    );
}
