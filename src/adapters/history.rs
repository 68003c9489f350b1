//! JSON-file-backed occupancy history.
//!
//! The store is a single JSON array of motion records, read in full and
//! rewritten on each append. Volumes are small (one record per detected
//! occupancy transition), so simplicity wins over an append-only
//! format. A missing or corrupt file is treated as empty history — the
//! habit model must never be blocked by storage damage.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::app::ports::{HistoryError, HistoryStore, MotionRecord};

/// File-backed [`HistoryStore`].
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load records, downgrading missing/corrupt files to an empty
    /// history with a log line. This is the startup entry point.
    pub fn load_or_empty(&self) -> Vec<MotionRecord> {
        match self.load() {
            Ok(records) => records,
            Err(HistoryError::NotFound) => {
                warn!("no history file at {} — starting empty", self.path.display());
                Vec::new()
            }
            Err(e) => {
                warn!("history unreadable ({e}) — starting empty");
                Vec::new()
            }
        }
    }
}

impl HistoryStore for JsonHistoryStore {
    fn load(&self) -> Result<Vec<MotionRecord>, HistoryError> {
        if !self.path.exists() {
            return Err(HistoryError::NotFound);
        }
        let raw = fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw).map_err(|_| HistoryError::Corrupted)
    }

    fn append(&mut self, record: &MotionRecord) -> Result<(), HistoryError> {
        let mut records = match self.load() {
            Ok(records) => records,
            // Do not wipe knowledge we cannot read back, but a brand-new
            // or corrupt file starts over.
            Err(HistoryError::NotFound | HistoryError::Corrupted) => Vec::new(),
            Err(e) => return Err(e),
        };
        records.push(record.clone());
        let raw = serde_json::to_string_pretty(&records).map_err(std::io::Error::other)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::parse_timestamp;

    fn record(ts: &str) -> MotionRecord {
        MotionRecord {
            timestamp: ts.into(),
            event: MotionRecord::MOTION_DETECTED.into(),
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("none.json"));
        assert!(matches!(store.load(), Err(HistoryError::NotFound)));
        assert!(store.load_or_empty().is_empty());
    }

    #[test]
    fn append_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonHistoryStore::new(dir.path().join("motion.json"));

        store.append(&record("2026-08-03 07:15:00")).unwrap();
        store.append(&record("2026-08-03 19:02:41")).unwrap();

        let records = store.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp, "2026-08-03 07:15:00");
        assert_eq!(records[1].event, MotionRecord::MOTION_DETECTED);
        assert!(parse_timestamp(&records[1].timestamp).is_some());
    }

    #[test]
    fn corrupt_file_reads_as_empty_and_recovers_on_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motion.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut store = JsonHistoryStore::new(&path);
        assert!(matches!(store.load(), Err(HistoryError::Corrupted)));
        assert!(store.load_or_empty().is_empty());

        store.append(&record("2026-08-03 07:15:00")).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn written_file_matches_the_wire_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motion.json");
        let mut store = JsonHistoryStore::new(&path);
        store.append(&record("2026-08-03 07:15:00")).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed[0]["timestamp"], "2026-08-03 07:15:00");
        assert_eq!(parsed[0]["event"], "MOTION_DETECTED");
    }
}
