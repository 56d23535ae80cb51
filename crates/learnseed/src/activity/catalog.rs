use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::content::ActivityContent;
use super::schema::ActivityTypeRegistry;
use super::validation::{validate_content_with, ContentValidationError, UnknownFieldPolicy};
use crate::attribution::Creator;
use crate::store::{Entity, EntityKind};

/// Tag marking the catalog-wide fallback activity. At most one activity carries it.
pub const SYSTEM_DEFAULT_TAG: &str = "__system_default__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityId(pub Uuid);

impl ActivityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActivityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A committed catalog entry. Content is always the validated, typed variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ActivityRow")]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    pub summary: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub tags: BTreeSet<String>,
    pub content: ActivityContent,
    pub creator: Creator,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_system_default(&self) -> bool {
        self.has_tag(SYSTEM_DEFAULT_TAG)
    }
}

impl Entity for Activity {
    const KIND: EntityKind = EntityKind::Activity;

    fn key(&self) -> &str {
        &self.name
    }
}

/// Stored shape of an activity: the content is a flat field map whose variant is
/// recovered from `type`.
#[derive(Deserialize)]
struct ActivityRow {
    id: ActivityId,
    name: String,
    summary: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    content: Map<String, Value>,
    creator: Creator,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ActivityRow> for Activity {
    type Error = serde_json::Error;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let content = ActivityContent::from_fields(&row.type_name, row.content)?;
        Ok(Self {
            id: row.id,
            name: row.name,
            summary: row.summary,
            type_name: row.type_name,
            tags: row.tags,
            content,
            creator: row.creator,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Untyped activity input, as authored in seed data or submitted over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDraft {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    pub type_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub content: Map<String, Value>,
    /// Left empty by most callers; the writing session stamps its own creator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Creator>,
}

/// Result of `upsert_activity`.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// A new record was admitted. `displaced` lists activities that lost the
    /// system-default tag because the new record carried it.
    Inserted {
        activity: Activity,
        displaced: Vec<Activity>,
    },
    /// The name was already taken; the existing record is returned untouched.
    Existing(Activity),
}

impl Admission {
    pub fn activity(&self) -> &Activity {
        match self {
            Admission::Inserted { activity, .. } | Admission::Existing(activity) => activity,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, Admission::Inserted { .. })
    }
}

/// Result of `mark_system_default`.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultDesignation {
    Marked {
        activity: Activity,
        displaced: Vec<Activity>,
    },
    AlreadyDefault(Activity),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("activity name must not be empty")]
    EmptyName,
    #[error("activity type '{0}' is not registered")]
    UnknownType(String),
    #[error(transparent)]
    InvalidContent(#[from] ContentValidationError),
}

/// Name-indexed view over the activities of one seeding session.
#[derive(Debug, Clone, Default)]
pub struct ActivityCatalog {
    activities: BTreeMap<String, Activity>,
    unknown_fields: UnknownFieldPolicy,
}

impl ActivityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unknown_field_policy(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    pub fn get(&self, name: &str) -> Option<&Activity> {
        self.activities.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.activities.values()
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Activity> + 'a {
        self.activities
            .values()
            .filter(move |activity| activity.has_tag(tag))
    }

    pub fn system_default(&self) -> Option<&Activity> {
        self.tagged(SYSTEM_DEFAULT_TAG).next()
    }

    /// Resolve the type, validate the content, then admit the draft unless an activity
    /// with the same name (exact, case-sensitive) exists. Existing records are returned
    /// as they are; no merge happens.
    pub fn upsert_activity(
        &mut self,
        registry: &ActivityTypeRegistry,
        draft: ActivityDraft,
    ) -> Result<Admission, CatalogError> {
        let ActivityDraft {
            name,
            summary,
            type_name,
            tags,
            content,
            creator,
        } = draft;

        if name.trim().is_empty() {
            return Err(CatalogError::EmptyName);
        }

        let schema = registry
            .get(&type_name)
            .ok_or_else(|| CatalogError::UnknownType(type_name.clone()))?;
        let content = validate_content_with(schema, content, self.unknown_fields)?;

        if let Some(existing) = self.activities.get(&name) {
            return Ok(Admission::Existing(existing.clone()));
        }

        let mut tags: BTreeSet<String> = tags
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        let wants_default = tags.remove(SYSTEM_DEFAULT_TAG);

        let now = Utc::now();
        let activity = Activity {
            id: ActivityId::new(),
            name: name.clone(),
            summary,
            type_name,
            tags,
            content,
            creator: creator.unwrap_or_else(Creator::system_seed),
            created_at: now,
            updated_at: now,
        };
        self.activities.insert(name.clone(), activity);

        let displaced = if wants_default {
            self.assign_default(&name)
        } else {
            Vec::new()
        };

        let activity = self.activities[&name].clone();
        Ok(Admission::Inserted {
            activity,
            displaced,
        })
    }

    /// Make `name` the single holder of the system-default tag.
    pub fn mark_system_default(&mut self, name: &str) -> DefaultDesignation {
        let Some(target) = self.activities.get(name) else {
            return DefaultDesignation::NotFound;
        };

        let sole_holder = target.is_system_default()
            && self
                .tagged(SYSTEM_DEFAULT_TAG)
                .all(|activity| activity.name == name);
        if sole_holder {
            return DefaultDesignation::AlreadyDefault(target.clone());
        }

        let displaced = self.assign_default(name);
        DefaultDesignation::Marked {
            activity: self.activities[name].clone(),
            displaced,
        }
    }

    /// Strip the tag from every other holder, then tag `name`. Returns the updated
    /// former holders.
    fn assign_default(&mut self, name: &str) -> Vec<Activity> {
        let now = Utc::now();
        let mut displaced = Vec::new();

        for activity in self.activities.values_mut() {
            if activity.name != name && activity.tags.remove(SYSTEM_DEFAULT_TAG) {
                activity.updated_at = now;
                displaced.push(activity.clone());
            }
        }

        if let Some(target) = self.activities.get_mut(name) {
            if target.tags.insert(SYSTEM_DEFAULT_TAG.to_string()) {
                target.updated_at = now;
            }
        }

        displaced
    }
}

impl FromIterator<Activity> for ActivityCatalog {
    fn from_iter<I: IntoIterator<Item = Activity>>(iter: I) -> Self {
        let activities = iter
            .into_iter()
            .map(|activity| (activity.name.clone(), activity))
            .collect();
        Self {
            activities,
            unknown_fields: UnknownFieldPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::schema::ActivityTypeSchema;
    use crate::activity::validation::ContentViolation;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn registry() -> ActivityTypeRegistry {
        [
            ActivityTypeSchema::new(
                "video",
                "Short clip",
                ["url"],
                ["duration_sec", "notes", "pause_points"],
                Map::new(),
            )
            .expect("valid schema"),
            ActivityTypeSchema::new(
                "worksheet",
                "Printable scaffold",
                ["file_url"],
                ["instructions"],
                Map::new(),
            )
            .expect("valid schema"),
        ]
        .into_iter()
        .collect()
    }

    fn video(name: &str, url: &str, tags: &[&str]) -> ActivityDraft {
        ActivityDraft {
            name: name.to_string(),
            summary: format!("{name} summary"),
            type_name: "video".to_string(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            content: fields(json!({ "url": url })),
            creator: None,
        }
    }

    #[test]
    fn second_upsert_returns_first_admission() {
        let registry = registry();
        let mut catalog = ActivityCatalog::new();

        let first = catalog
            .upsert_activity(&registry, video("Calm Clip", "https://a.example", &["calm"]))
            .expect("first admission");
        assert!(first.is_inserted());

        let second = catalog
            .upsert_activity(&registry, video("Calm Clip", "https://b.example", &["loud"]))
            .expect("second call succeeds");

        assert_eq!(catalog.len(), 1);
        match second {
            Admission::Existing(existing) => {
                assert_eq!(&existing, first.activity());
                assert_eq!(existing.content.url(), Some("https://a.example"));
            }
            other => panic!("expected existing record, got {other:?}"),
        }
    }

    #[test]
    fn names_match_case_sensitively() {
        let registry = registry();
        let mut catalog = ActivityCatalog::new();
        catalog
            .upsert_activity(&registry, video("Calm Clip", "https://a.example", &[]))
            .expect("admitted");
        let other = catalog
            .upsert_activity(&registry, video("calm clip", "https://a.example", &[]))
            .expect("admitted");

        assert!(other.is_inserted());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut catalog = ActivityCatalog::new();
        let mut draft = video("Podcast", "https://a.example", &[]);
        draft.type_name = "podcast".to_string();

        let error = catalog
            .upsert_activity(&registry(), draft)
            .expect_err("unknown type rejected");
        assert_eq!(error, CatalogError::UnknownType("podcast".to_string()));
        assert!(catalog.is_empty());
    }

    #[test]
    fn invalid_content_is_never_admitted() {
        let mut catalog = ActivityCatalog::new();
        let mut draft = video("Broken", "https://a.example", &[]);
        draft.content = fields(json!({ "notes": "no url" }));

        let error = catalog
            .upsert_activity(&registry(), draft)
            .expect_err("invalid content rejected");
        match error {
            CatalogError::InvalidContent(invalid) => assert_eq!(
                invalid.violations,
                vec![ContentViolation::MissingRequiredField("url".to_string())]
            ),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(catalog.get("Broken").is_none());
    }

    #[test]
    fn existing_name_with_invalid_content_still_fails() {
        let registry = registry();
        let mut catalog = ActivityCatalog::new();
        catalog
            .upsert_activity(&registry, video("Clip", "https://a.example", &[]))
            .expect("admitted");

        let mut invalid = video("Clip", "https://a.example", &[]);
        invalid.content = Map::new();
        assert!(catalog.upsert_activity(&registry, invalid).is_err());
    }

    #[test]
    fn marking_default_keeps_a_single_holder() {
        let registry = registry();
        let mut catalog = ActivityCatalog::new();
        for name in ["One", "Two", "Three"] {
            catalog
                .upsert_activity(&registry, video(name, "https://a.example", &[]))
                .expect("admitted");
        }

        for name in ["One", "Three", "Two", "Three"] {
            let designation = catalog.mark_system_default(name);
            assert!(matches!(designation, DefaultDesignation::Marked { .. }));
        }

        let holders: Vec<&str> = catalog
            .tagged(SYSTEM_DEFAULT_TAG)
            .map(|activity| activity.name.as_str())
            .collect();
        assert_eq!(holders, vec!["Three"]);
    }

    #[test]
    fn marking_reports_displaced_and_repeat_calls() {
        let registry = registry();
        let mut catalog = ActivityCatalog::new();
        catalog
            .upsert_activity(&registry, video("One", "https://a.example", &[]))
            .expect("admitted");
        catalog
            .upsert_activity(&registry, video("Two", "https://a.example", &[]))
            .expect("admitted");

        assert!(matches!(
            catalog.mark_system_default("One"),
            DefaultDesignation::Marked { ref displaced, .. } if displaced.is_empty()
        ));
        match catalog.mark_system_default("Two") {
            DefaultDesignation::Marked { displaced, .. } => {
                assert_eq!(displaced.len(), 1);
                assert_eq!(displaced[0].name, "One");
                assert!(!displaced[0].is_system_default());
            }
            other => panic!("unexpected designation {other:?}"),
        }
        assert!(matches!(
            catalog.mark_system_default("Two"),
            DefaultDesignation::AlreadyDefault(_)
        ));
        assert_eq!(
            catalog.mark_system_default("Missing"),
            DefaultDesignation::NotFound
        );
    }

    #[test]
    fn default_tag_on_new_draft_displaces_previous_holder() {
        let registry = registry();
        let mut catalog = ActivityCatalog::new();
        catalog
            .upsert_activity(
                &registry,
                video("Old", "https://a.example", &[SYSTEM_DEFAULT_TAG]),
            )
            .expect("admitted");

        let admission = catalog
            .upsert_activity(
                &registry,
                video("New", "https://a.example", &["calm", SYSTEM_DEFAULT_TAG]),
            )
            .expect("admitted");

        match admission {
            Admission::Inserted {
                activity,
                displaced,
            } => {
                assert!(activity.is_system_default());
                assert!(activity.has_tag("calm"));
                assert_eq!(displaced.len(), 1);
                assert_eq!(displaced[0].name, "Old");
            }
            other => panic!("unexpected admission {other:?}"),
        }
        assert_eq!(
            catalog.system_default().map(|activity| activity.name.as_str()),
            Some("New")
        );
    }

    #[test]
    fn stored_rows_restore_typed_content() {
        let registry = registry();
        let mut catalog = ActivityCatalog::new();
        let admission = catalog
            .upsert_activity(&registry, video("Clip", "https://a.example", &["b", "a"]))
            .expect("admitted");

        let row = serde_json::to_value(admission.activity()).expect("serializes");
        assert_eq!(row["type"], "video");
        assert_eq!(row["content"], json!({ "url": "https://a.example" }));
        assert_eq!(row["tags"], json!(["a", "b"]));

        let restored: Activity = serde_json::from_value(row).expect("deserializes");
        assert_eq!(&restored, admission.activity());
    }
}
