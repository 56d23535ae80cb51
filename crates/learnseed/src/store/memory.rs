use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{EntityKind, SeedStore, StoreError};

type Tables = BTreeMap<EntityKind, BTreeMap<String, Value>>;

/// Serializable image of the committed tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    #[serde(default)]
    pub tables: BTreeMap<EntityKind, BTreeMap<String, Value>>,
}

impl StoreSnapshot {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn record_count(&self, kind: EntityKind) -> usize {
        self.tables.get(&kind).map(BTreeMap::len).unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    committed: Tables,
    working: Tables,
}

/// Transactional in-memory store: writes go to a working copy that `commit` publishes
/// and `rollback` discards. Rows are listed in key order.
#[derive(Debug, Default, Clone)]
pub struct InMemorySeedStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemorySeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let state = StoreState {
            committed: snapshot.tables.clone(),
            working: snapshot.tables,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Committed tables only; pending writes are not included.
    pub fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        let guard = self.lock()?;
        Ok(StoreSnapshot {
            version: StoreSnapshot::CURRENT_VERSION,
            tables: guard.committed.clone(),
        })
    }

    /// Working tables, including writes not yet committed.
    pub fn pending_snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        let guard = self.lock()?;
        Ok(StoreSnapshot {
            version: StoreSnapshot::CURRENT_VERSION,
            tables: guard.working.clone(),
        })
    }

    pub fn has_pending_changes(&self) -> Result<bool, StoreError> {
        let guard = self.lock()?;
        Ok(guard.committed != guard.working)
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl SeedStore for InMemorySeedStore {
    fn find_by_key(&self, kind: EntityKind, key: &str) -> Result<Option<Value>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .working
            .get(&kind)
            .and_then(|table| table.get(key))
            .cloned())
    }

    fn insert(&self, kind: EntityKind, key: &str, record: Value) -> Result<Value, StoreError> {
        let mut guard = self.lock()?;
        let table = guard.working.entry(kind).or_default();
        if table.contains_key(key) {
            return Err(StoreError::Conflict {
                kind,
                key: key.to_string(),
            });
        }
        table.insert(key.to_string(), record.clone());
        Ok(record)
    }

    fn update(&self, kind: EntityKind, key: &str, record: Value) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        match guard.working.get_mut(&kind).and_then(|table| table.get_mut(key)) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(StoreError::NotFound {
                kind,
                key: key.to_string(),
            }),
        }
    }

    fn list_all(&self, kind: EntityKind) -> Result<Vec<Value>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .working
            .get(&kind)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    fn reset(&self) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        guard.working.clear();
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        guard.committed = guard.working.clone();
        Ok(())
    }

    fn rollback(&self) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        guard.working = guard.committed.clone();
        Ok(())
    }
}
