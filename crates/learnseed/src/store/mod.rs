//! Persistence collaborator contract used by the seeding session.
//!
//! Records travel as `serde_json::Value` blobs, which is the native representation of
//! both bundled stores. Typed access goes through [`TypedStore`].

mod file;
mod memory;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use file::JsonFileStore;
pub use memory::{InMemorySeedStore, StoreSnapshot};

/// Tables known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    SurveyTemplate,
    ActivityType,
    Activity,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::SurveyTemplate,
        EntityKind::ActivityType,
        EntityKind::Activity,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::SurveyTemplate => "survey_template",
            EntityKind::ActivityType => "activity_type",
            EntityKind::Activity => "activity",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Storage abstraction so seeding and scoring can run against any backend.
///
/// Writes land in a pending batch until [`SeedStore::commit`]; [`SeedStore::rollback`]
/// discards everything written since the last commit.
pub trait SeedStore: Send + Sync {
    fn find_by_key(&self, kind: EntityKind, key: &str) -> Result<Option<Value>, StoreError>;
    fn insert(&self, kind: EntityKind, key: &str, record: Value) -> Result<Value, StoreError>;
    fn update(&self, kind: EntityKind, key: &str, record: Value) -> Result<(), StoreError>;
    fn list_all(&self, kind: EntityKind) -> Result<Vec<Value>, StoreError>;
    /// Clear every table. Part of the pending batch like any other write.
    fn reset(&self) -> Result<(), StoreError>;
    fn commit(&self) -> Result<(), StoreError>;
    fn rollback(&self) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} '{key}' already exists")]
    Conflict { kind: EntityKind, key: String },
    #[error("{kind} '{key}' not found")]
    NotFound { kind: EntityKind, key: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stored {kind} record is unreadable: {source}")]
    Corrupt {
        kind: EntityKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A record type that lives in exactly one table under a unique natural key.
pub trait Entity: Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn key(&self) -> &str;
}

/// Typed helpers layered over any [`SeedStore`].
pub trait TypedStore {
    fn load_all<E: Entity>(&self) -> Result<Vec<E>, StoreError>;
    fn find<E: Entity>(&self, key: &str) -> Result<Option<E>, StoreError>;
    fn insert_entity<E: Entity>(&self, entity: &E) -> Result<(), StoreError>;
    fn update_entity<E: Entity>(&self, entity: &E) -> Result<(), StoreError>;
}

impl<S: SeedStore + ?Sized> TypedStore for S {
    fn load_all<E: Entity>(&self) -> Result<Vec<E>, StoreError> {
        self.list_all(E::KIND)?
            .into_iter()
            .map(decode::<E>)
            .collect()
    }

    fn find<E: Entity>(&self, key: &str) -> Result<Option<E>, StoreError> {
        self.find_by_key(E::KIND, key)?.map(decode::<E>).transpose()
    }

    fn insert_entity<E: Entity>(&self, entity: &E) -> Result<(), StoreError> {
        let record = serde_json::to_value(entity).map_err(StoreError::Encode)?;
        self.insert(E::KIND, entity.key(), record)?;
        Ok(())
    }

    fn update_entity<E: Entity>(&self, entity: &E) -> Result<(), StoreError> {
        let record = serde_json::to_value(entity).map_err(StoreError::Encode)?;
        self.update(E::KIND, entity.key(), record)
    }
}

fn decode<E: Entity>(record: Value) -> Result<E, StoreError> {
    serde_json::from_value(record).map_err(|source| StoreError::Corrupt {
        kind: E::KIND,
        source,
    })
}
