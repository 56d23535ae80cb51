use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::activity::{ActivityDraft, ActivityTypeSchema, SchemaError};
use crate::survey::Question;

const DEPLOY_SURVEYS: &str = include_str!("../../data/deploy/surveys.json");
const DEPLOY_ACTIVITY_TYPES: &str = include_str!("../../data/deploy/activity_types.json");
const DEPLOY_ACTIVITIES: &str = include_str!("../../data/deploy/activities.json");
const DEPLOY_MANIFEST: &str = include_str!("../../data/deploy/manifest.json");

pub const SURVEYS_FILE: &str = "surveys.json";
pub const ACTIVITY_TYPES_FILE: &str = "activity_types.json";
pub const ACTIVITIES_FILE: &str = "activities.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Survey template as authored in seed data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveySpec {
    pub title: String,
    pub questions: Vec<Question>,
}

/// Activity type schema as authored in seed data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTypeSpec {
    pub type_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub optional_fields: Vec<String>,
    #[serde(default)]
    pub example_content: Map<String, Value>,
}

impl ActivityTypeSpec {
    pub fn to_schema(&self) -> Result<ActivityTypeSchema, SchemaError> {
        ActivityTypeSchema::new(
            self.type_name.clone(),
            self.description.clone(),
            self.required_fields.iter().cloned(),
            self.optional_fields.iter().cloned(),
            self.example_content.clone(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Manifest {
    #[serde(default)]
    system_default: Option<String>,
}

/// Everything one seed run writes, in dependency order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedDataset {
    pub surveys: Vec<SurveySpec>,
    pub activity_types: Vec<ActivityTypeSpec>,
    pub activities: Vec<ActivityDraft>,
    /// Activity to designate as the catalog fallback after the activity phase.
    pub system_default: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset file {file} is invalid: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SeedDataset {
    /// The dataset bundled with the crate: two learning-style surveys, the five built-in
    /// activity types, and the starter activity catalog.
    pub fn deploy() -> Result<Self, DatasetError> {
        let manifest: Manifest = parse(MANIFEST_FILE, DEPLOY_MANIFEST)?;
        Ok(Self {
            surveys: parse(SURVEYS_FILE, DEPLOY_SURVEYS)?,
            activity_types: parse(ACTIVITY_TYPES_FILE, DEPLOY_ACTIVITY_TYPES)?,
            activities: parse(ACTIVITIES_FILE, DEPLOY_ACTIVITIES)?,
            system_default: manifest.system_default,
        })
    }

    /// Load a dataset directory laid out like `data/deploy`. The directory must exist;
    /// missing files inside it are logged and treated as empty sections.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, DatasetError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(DatasetError::Io {
                path: dir.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "dataset directory does not exist",
                ),
            });
        }
        let manifest: Manifest = read_optional(dir, MANIFEST_FILE)?.unwrap_or_default();
        Ok(Self {
            surveys: read_optional(dir, SURVEYS_FILE)?.unwrap_or_default(),
            activity_types: read_optional(dir, ACTIVITY_TYPES_FILE)?.unwrap_or_default(),
            activities: read_optional(dir, ACTIVITIES_FILE)?.unwrap_or_default(),
            system_default: manifest.system_default,
        })
    }
}

fn parse<T: DeserializeOwned>(file: &str, raw: &str) -> Result<T, DatasetError> {
    serde_json::from_str(raw).map_err(|source| DatasetError::Json {
        file: file.to_string(),
        source,
    })
}

fn read_optional<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Option<T>, DatasetError> {
    let path = dir.join(file);
    if !path.exists() {
        warn!(path = %path.display(), "dataset file missing, section left empty");
        return Ok(None);
    }
    let raw = fs::read_to_string(&path).map_err(|source| DatasetError::Io {
        path: path.clone(),
        source,
    })?;
    parse(file, &raw).map(Some)
}
