//! Persistence seams.
//!
//! The core owns its state in memory; these traits are the injection
//! points for keeping a boiler's temperature history across restarts and
//! for persisting policy checkpoints. Blobs are opaque to the stores.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

use crate::domain::HISTORY_CAPACITY;

/// Bounded read/append store for recent temperature samples.
///
/// At most [`HISTORY_CAPACITY`] samples are retained; implementations
/// trim from the front.
pub trait HistoryStore: Send + Sync {
    fn load(&self) -> Result<Vec<f64>>;
    fn append(&self, sample: f64) -> Result<()>;
}

/// Opaque checkpoint blob store keyed by model name.
pub trait CheckpointStore: Send + Sync {
    fn save(&self, name: &str, blob: &[u8]) -> Result<()>;
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>>;
}

/// JSON-file-backed temperature history.
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self) -> Result<Vec<f64>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading history file {}", self.path.display()))?;
        let samples: Vec<f64> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing history file {}", self.path.display()))?;
        Ok(samples)
    }

    fn append(&self, sample: f64) -> Result<()> {
        let mut samples = self.load()?;
        samples.push(sample);
        if samples.len() > HISTORY_CAPACITY {
            let excess = samples.len() - HISTORY_CAPACITY;
            samples.drain(..excess);
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string(&samples)?)
            .with_context(|| format!("writing history file {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory history, for tests and ephemeral runs.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    samples: Mutex<Vec<f64>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn load(&self) -> Result<Vec<f64>> {
        Ok(self.samples.lock().expect("history lock").clone())
    }

    fn append(&self, sample: f64) -> Result<()> {
        let mut samples = self.samples.lock().expect("history lock");
        samples.push(sample);
        if samples.len() > HISTORY_CAPACITY {
            let excess = samples.len() - HISTORY_CAPACITY;
            samples.drain(..excess);
        }
        Ok(())
    }
}

/// Directory-backed checkpoint store; one `<name>.ckpt` file per model.
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.ckpt"))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&self, name: &str, blob: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating checkpoint dir {}", self.dir.display()))?;
        let path = self.path_for(name);
        fs::write(&path, blob)
            .with_context(|| format!("writing checkpoint {}", path.display()))?;
        debug!(checkpoint = %path.display(), bytes = blob.len(), "checkpoint saved");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        let blob = fs::read(&path)
            .with_context(|| format!("reading checkpoint {}", path.display()))?;
        Ok(Some(blob))
    }
}

/// In-memory checkpoint store for tests.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    blobs: Mutex<std::collections::HashMap<String, Vec<u8>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn save(&self, name: &str, blob: &[u8]) -> Result<()> {
        self.blobs
            .lock()
            .expect("checkpoint lock")
            .insert(name.to_string(), blob.to_vec());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .blobs
            .lock()
            .expect("checkpoint lock")
            .get(name)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_history_trims_to_capacity() {
        let store = InMemoryHistoryStore::new();
        for i in 0..40 {
            store.append(i as f64).unwrap();
        }
        let samples = store.load().unwrap();
        assert_eq!(samples.len(), HISTORY_CAPACITY);
        assert_eq!(samples[0], 16.0);
        assert_eq!(*samples.last().unwrap(), 39.0);
    }

    #[test]
    fn test_file_history_round_trip() {
        let dir = std::env::temp_dir().join("boiler-history-test");
        let path = dir.join("history.json");
        let _ = fs::remove_file(&path);

        let store = FileHistoryStore::new(&path);
        assert!(store.load().unwrap().is_empty());

        for i in 0..30 {
            store.append(20.0 + i as f64).unwrap();
        }
        let samples = store.load().unwrap();
        assert_eq!(samples.len(), HISTORY_CAPACITY);
        assert_eq!(*samples.last().unwrap(), 49.0);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_checkpoint_missing_is_none() {
        let store = InMemoryCheckpointStore::new();
        assert!(store.load("nope").unwrap().is_none());
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let store = InMemoryCheckpointStore::new();
        store.save("model", &[1, 2, 3]).unwrap();
        assert_eq!(store.load("model").unwrap(), Some(vec![1, 2, 3]));
    }
}
