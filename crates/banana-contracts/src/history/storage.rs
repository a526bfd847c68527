use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;

/// Single-key snapshot persistence behind the history store.
pub trait SnapshotStorage: Send + Sync {
    /// Returns `None` when no snapshot has been written yet.
    fn read(&self) -> anyhow::Result<Option<String>>;
    fn write(&self, snapshot: &str) -> anyhow::Result<()>;
    fn remove(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSnapshotStorage {
    path: PathBuf,
}

impl FileSnapshotStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStorage for FileSnapshotStorage {
    fn read(&self) -> anyhow::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("failed reading {}", self.path.display()))
            }
        }
    }

    fn write(&self, snapshot: &str) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed creating {}", parent.display()))?;
        }
        std::fs::write(&self.path, snapshot)
            .with_context(|| format!("failed writing {}", self.path.display()))
    }

    fn remove(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed removing {}", self.path.display()))
            }
        }
    }
}

/// In-memory slot. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStorage {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemorySnapshotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(snapshot.into()))),
        }
    }

    pub fn snapshot(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl SnapshotStorage for MemorySnapshotStorage {
    fn read(&self) -> anyhow::Result<Option<String>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("snapshot slot lock poisoned"))?;
        Ok(slot.clone())
    }

    fn write(&self, snapshot: &str) -> anyhow::Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("snapshot slot lock poisoned"))?;
        *slot = Some(snapshot.to_string());
        Ok(())
    }

    fn remove(&self) -> anyhow::Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("snapshot slot lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FileSnapshotStorage, MemorySnapshotStorage, SnapshotStorage};

    #[test]
    fn file_storage_reads_none_before_first_write() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let storage = FileSnapshotStorage::new(temp.path().join("nested").join("history.json"));
        assert_eq!(storage.read()?, None);
        storage.remove()?;
        Ok(())
    }

    #[test]
    fn file_storage_creates_parent_dirs_and_removes() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("history.json");
        let storage = FileSnapshotStorage::new(&path);
        storage.write("[]")?;
        assert_eq!(std::fs::read_to_string(&path)?, "[]");
        assert_eq!(storage.read()?.as_deref(), Some("[]"));
        storage.remove()?;
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn memory_storage_clones_share_the_slot() -> anyhow::Result<()> {
        let storage = MemorySnapshotStorage::new();
        let probe = storage.clone();
        storage.write("[1]")?;
        assert_eq!(probe.snapshot().as_deref(), Some("[1]"));
        storage.remove()?;
        assert_eq!(probe.read()?, None);
        Ok(())
    }
}
