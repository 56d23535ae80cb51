use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::{Entity, EntityKind};

/// Declared content contract for one activity type.
///
/// `required_fields` is the minimum a payload must carry; `optional_fields` documents the
/// other fields authors are expected to use. The two sets never overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTypeSchema {
    pub type_name: String,
    pub description: String,
    pub required_fields: BTreeSet<String>,
    pub optional_fields: BTreeSet<String>,
    /// Reference payload for catalog authors. Never validated at runtime.
    pub example_content: Map<String, Value>,
}

impl ActivityTypeSchema {
    pub fn new<R, O>(
        type_name: impl Into<String>,
        description: impl Into<String>,
        required_fields: R,
        optional_fields: O,
        example_content: Map<String, Value>,
    ) -> Result<Self, SchemaError>
    where
        R: IntoIterator,
        R::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        let type_name = type_name.into();
        if type_name.trim().is_empty() {
            return Err(SchemaError::EmptyTypeName);
        }

        let required_fields: BTreeSet<String> =
            required_fields.into_iter().map(Into::into).collect();
        let optional_fields: BTreeSet<String> =
            optional_fields.into_iter().map(Into::into).collect();

        let overlap: Vec<String> = required_fields
            .intersection(&optional_fields)
            .cloned()
            .collect();
        if !overlap.is_empty() {
            return Err(SchemaError::OverlappingFields {
                type_name,
                fields: overlap,
            });
        }

        Ok(Self {
            type_name,
            description: description.into(),
            required_fields,
            optional_fields,
            example_content,
        })
    }

    /// Whether `field` is named by either field set.
    pub fn declares(&self, field: &str) -> bool {
        self.required_fields.contains(field) || self.optional_fields.contains(field)
    }
}

impl Entity for ActivityTypeSchema {
    const KIND: EntityKind = EntityKind::ActivityType;

    fn key(&self) -> &str {
        &self.type_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("activity type name must not be empty")]
    EmptyTypeName,
    #[error(
        "activity type '{type_name}' lists fields as both required and optional: {}",
        .fields.join(", ")
    )]
    OverlappingFields {
        type_name: String,
        fields: Vec<String>,
    },
}

/// Outcome of registering a schema. `AlreadyExists` is informational, not a failure.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Registered,
    AlreadyExists,
}

/// Append-only set of activity type schemas keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct ActivityTypeRegistry {
    schemas: BTreeMap<String, ActivityTypeSchema>,
}

impl ActivityTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` unless its type name is taken. An existing entry always wins,
    /// even when the new field sets differ.
    pub fn register(&mut self, schema: ActivityTypeSchema) -> Registration {
        if self.schemas.contains_key(&schema.type_name) {
            return Registration::AlreadyExists;
        }
        self.schemas.insert(schema.type_name.clone(), schema);
        Registration::Registered
    }

    pub fn get(&self, type_name: &str) -> Option<&ActivityTypeSchema> {
        self.schemas.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.schemas.contains_key(type_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityTypeSchema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl FromIterator<ActivityTypeSchema> for ActivityTypeRegistry {
    fn from_iter<I: IntoIterator<Item = ActivityTypeSchema>>(iter: I) -> Self {
        let mut registry = Self::new();
        for schema in iter {
            let _ = registry.register(schema);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worksheet(required: &[&str], optional: &[&str]) -> ActivityTypeSchema {
        ActivityTypeSchema::new(
            "worksheet",
            "Printable scaffold",
            required.iter().copied(),
            optional.iter().copied(),
            Map::new(),
        )
        .expect("valid schema")
    }

    #[test]
    fn second_registration_keeps_first_field_sets() {
        let mut registry = ActivityTypeRegistry::new();
        assert_eq!(
            registry.register(worksheet(&["file_url"], &["instructions"])),
            Registration::Registered
        );
        assert_eq!(
            registry.register(worksheet(&["url"], &[])),
            Registration::AlreadyExists
        );

        assert_eq!(registry.len(), 1);
        let stored = registry.get("worksheet").expect("registered");
        assert!(stored.required_fields.contains("file_url"));
        assert!(!stored.required_fields.contains("url"));
        assert!(stored.declares("instructions"));
    }

    #[test]
    fn overlapping_field_sets_are_rejected() {
        let error = ActivityTypeSchema::new(
            "video",
            "Short clip",
            ["url", "notes"],
            ["notes", "duration_sec"],
            Map::new(),
        )
        .expect_err("overlap rejected");

        assert_eq!(
            error,
            SchemaError::OverlappingFields {
                type_name: "video".to_string(),
                fields: vec!["notes".to_string()],
            }
        );
    }

    #[test]
    fn blank_type_name_is_rejected() {
        let error = ActivityTypeSchema::new("", "", ["url"], Vec::<String>::new(), Map::new())
            .expect_err("blank rejected");
        assert_eq!(error, SchemaError::EmptyTypeName);
    }
}
