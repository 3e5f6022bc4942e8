//! Manual export of the pending queue
//!
//! Writes the current device snapshot and every queued event to a local JSON
//! file. Export is read-only with respect to the queue: nothing is deleted,
//! and the batch cap does not apply.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::EventStore;
use crate::error::Result;
use crate::types::{DeviceSnapshot, Event};

#[derive(Serialize)]
struct ExportDocument<'a> {
    exported_at: DateTime<Utc>,
    snapshot: &'a DeviceSnapshot,
    pending_events: &'a [Event],
}

/// Write a timestamped JSON export into `dir`, returning the file path.
pub fn export_pending(
    store: &EventStore,
    snapshot: &DeviceSnapshot,
    dir: &Path,
) -> Result<PathBuf> {
    let events = store.list_all()?;

    std::fs::create_dir_all(dir)?;
    let exported_at = Utc::now();
    let path = dir.join(format!(
        "fieldrelay-export-{}.json",
        exported_at.format("%Y%m%dT%H%M%SZ")
    ));

    let document = ExportDocument {
        exported_at,
        snapshot,
        pending_events: &events,
    };
    std::fs::write(&path, serde_json::to_string_pretty(&document)?)?;

    tracing::info!(
        path = %path.display(),
        events = events.len(),
        "Exported pending queue"
    );

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeviceIdentity, Payload};

    fn snapshot() -> DeviceSnapshot {
        DeviceSnapshot {
            device: DeviceIdentity {
                model: "test-device".to_string(),
                os_version: "test-os 1.0".to_string(),
            },
            location: None,
            battery: None,
            wifi: None,
            cell: None,
            taken_at: Utc::now(),
        }
    }

    #[test]
    fn test_export_writes_queue_and_keeps_it() {
        let store = EventStore::open_in_memory().unwrap();
        store.migrate().unwrap();

        let mut payload = Payload::new();
        payload.insert("title".to_string(), "Build finished".to_string());
        store.insert("ci", &payload).unwrap();
        store.insert("ci", &payload).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = export_pending(&store, &snapshot(), dir.path()).unwrap();

        assert!(path.exists());
        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["pending_events"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["snapshot"]["device"]["model"], "test-device");

        // Export must not drain the queue
        assert_eq!(store.pending_count().unwrap(), 2);
    }

    #[test]
    fn test_export_creates_target_dir() {
        let store = EventStore::open_in_memory().unwrap();
        store.migrate().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("exports/archive");
        let path = export_pending(&store, &snapshot(), &nested).unwrap();

        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }
}
