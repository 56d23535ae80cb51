use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use super::memory::{InMemorySeedStore, StoreSnapshot};
use super::{EntityKind, SeedStore, StoreError};

/// Store backed by a JSON snapshot file. Reads and writes are served from memory; every
/// commit rewrites the file through a temporary sibling and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: InMemorySeedStore,
}

impl JsonFileStore {
    /// Open the snapshot at `path`, starting empty when the file does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let inner = if path.exists() {
            let raw = fs::read(&path)?;
            let snapshot: StoreSnapshot = serde_json::from_slice(&raw).map_err(|err| {
                StoreError::Unavailable(format!(
                    "snapshot {} is not valid JSON: {err}",
                    path.display()
                ))
            })?;
            InMemorySeedStore::from_snapshot(snapshot)
        } else {
            InMemorySeedStore::new()
        };

        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec_pretty(snapshot).map_err(StoreError::Encode)?;

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let staging = self.path.with_extension("json.tmp");
        let written = write_staging(&staging, &encoded)
            .and_then(|()| fs::rename(&staging, &self.path));
        if let Err(err) = written {
            if let Err(cleanup_err) = fs::remove_file(&staging) {
                if cleanup_err.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        path = %staging.display(),
                        error = %cleanup_err,
                        "failed to remove staging snapshot"
                    );
                }
            }
            return Err(err.into());
        }

        debug!(path = %self.path.display(), "store snapshot written");
        Ok(())
    }
}

fn write_staging(staging: &Path, encoded: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(staging)?;
    file.write_all(encoded)?;
    file.sync_all()
}

impl SeedStore for JsonFileStore {
    fn find_by_key(&self, kind: EntityKind, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.find_by_key(kind, key)
    }

    fn insert(&self, kind: EntityKind, key: &str, record: Value) -> Result<Value, StoreError> {
        self.inner.insert(kind, key, record)
    }

    fn update(&self, kind: EntityKind, key: &str, record: Value) -> Result<(), StoreError> {
        self.inner.update(kind, key, record)
    }

    fn list_all(&self, kind: EntityKind) -> Result<Vec<Value>, StoreError> {
        self.inner.list_all(kind)
    }

    fn reset(&self) -> Result<(), StoreError> {
        self.inner.reset()
    }

    /// The file is written before the in-memory batch is published, so a failed write
    /// leaves the batch pending and rollback-able.
    fn commit(&self) -> Result<(), StoreError> {
        let pending = self.inner.pending_snapshot()?;
        self.persist(&pending)?;
        self.inner.commit()
    }

    fn rollback(&self) -> Result<(), StoreError> {
        self.inner.rollback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn committed_rows_survive_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("seed.json");

        let store = JsonFileStore::open(&path).expect("open new store");
        store
            .insert(EntityKind::ActivityType, "video", json!({ "type_name": "video" }))
            .expect("insert");
        store.commit().expect("commit");
        store
            .insert(EntityKind::ActivityType, "music", json!({ "type_name": "music" }))
            .expect("insert");

        let reopened = JsonFileStore::open(&path).expect("reopen");
        let rows = reopened
            .list_all(EntityKind::ActivityType)
            .expect("list rows");
        assert_eq!(rows, vec![json!({ "type_name": "video" })]);
    }

    #[test]
    fn invalid_snapshot_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("seed.json");
        fs::write(&path, b"not json").expect("write garbage");

        let error = JsonFileStore::open(&path).expect_err("garbage rejected");
        assert!(matches!(error, StoreError::Unavailable(_)));
    }

    #[test]
    fn failed_write_removes_staging_file_and_stays_pending() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("seed.json");
        let store = JsonFileStore::open(&path).expect("open new store");

        // A non-empty directory at the target makes the final rename fail.
        fs::create_dir_all(path.join("occupied")).expect("block target");
        store
            .insert(EntityKind::ActivityType, "video", json!({ "type_name": "video" }))
            .expect("insert");

        let error = store.commit().expect_err("rename onto directory fails");
        assert!(matches!(error, StoreError::Io(_)));
        assert!(!path.with_extension("json.tmp").exists());
        assert!(store.inner.has_pending_changes().expect("state"));

        store.rollback().expect("rollback");
        assert!(store
            .list_all(EntityKind::ActivityType)
            .expect("list rows")
            .is_empty());
    }
}
