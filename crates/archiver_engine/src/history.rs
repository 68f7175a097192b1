use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use archiver_core::HistoryMarker;
use archiver_logging::engine_warn;

use crate::persist::{AtomicFileWriter, StoreError};

/// Durable `fakeid → HistoryMarker` map used as the update-mode boundary.
pub trait HistoryStore: Send + Sync {
    fn get(&self, fakeid: &str) -> Option<HistoryMarker>;
    /// Overwrite the record of one account and persist the whole map.
    fn put(&self, fakeid: &str, marker: HistoryMarker) -> Result<(), StoreError>;
}

/// Pretty-printed JSON object on disk, loaded once and written through on every
/// `put`.
#[derive(Debug)]
pub struct JsonHistoryStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, HistoryMarker>>,
}

impl JsonHistoryStore {
    /// Load `path`. A missing file is an empty store. An unparsable one is
    /// logged and also treated as empty; it is replaced on the next `put`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => match serde_json::from_str(&text) {
                Ok(records) => records,
                Err(err) => {
                    engine_warn!("Ignoring unreadable history file {}: {}", path.display(), err);
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, HistoryMarker>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn save(&self, records: &BTreeMap<String, HistoryMarker>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(records).map_err(|err| StoreError::Corrupt {
            path: self.path.clone(),
            message: err.to_string(),
        })?;
        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| StoreError::Corrupt {
                path: self.path.clone(),
                message: "history path has no file name".to_string(),
            })?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        AtomicFileWriter::new(dir).write(file_name, &json)?;
        Ok(())
    }
}

impl HistoryStore for JsonHistoryStore {
    fn get(&self, fakeid: &str) -> Option<HistoryMarker> {
        self.lock().get(fakeid).cloned()
    }

    fn put(&self, fakeid: &str, marker: HistoryMarker) -> Result<(), StoreError> {
        let mut records = self.lock();
        let previous = records.insert(fakeid.to_string(), marker);
        if let Err(err) = self.save(&records) {
            // Keep memory consistent with disk.
            match previous {
                Some(previous) => records.insert(fakeid.to_string(), previous),
                None => records.remove(fakeid),
            };
            return Err(err);
        }
        Ok(())
    }
}
