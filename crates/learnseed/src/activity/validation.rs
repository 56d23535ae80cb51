use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::content::ActivityContent;
use super::schema::ActivityTypeSchema;

/// How fields outside `required_fields ∪ optional_fields` are treated.
///
/// Schemas describe the minimum contract, so the default tolerates unknown fields and
/// passes them through untouched. `Strict` rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFieldPolicy {
    #[default]
    Tolerate,
    Strict,
}

/// A single reason a payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ContentViolation {
    MissingRequiredField(String),
    UnknownField(String),
    Malformed(String),
}

impl fmt::Display for ContentViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentViolation::MissingRequiredField(field) => {
                write!(f, "missing required field '{field}'")
            }
            ContentViolation::UnknownField(field) => write!(f, "unknown field '{field}'"),
            ContentViolation::Malformed(reason) => write!(f, "malformed content ({reason})"),
        }
    }
}

/// Every violation found in one payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("content for '{type_name}' is invalid: {}", summarize(.violations))]
pub struct ContentValidationError {
    pub type_name: String,
    pub violations: Vec<ContentViolation>,
}

impl ContentValidationError {
    pub fn missing_fields(&self) -> Vec<&str> {
        self.violations
            .iter()
            .filter_map(|violation| match violation {
                ContentViolation::MissingRequiredField(field) => Some(field.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn summarize(violations: &[ContentViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check `content` against `schema`, tolerating unknown fields.
pub fn validate_content(
    schema: &ActivityTypeSchema,
    content: Map<String, Value>,
) -> Result<ActivityContent, ContentValidationError> {
    validate_content_with(schema, content, UnknownFieldPolicy::default())
}

/// Check `content` against `schema` and convert it into its typed variant.
///
/// All missing required fields are reported together. On success the payload is carried
/// over unchanged.
pub fn validate_content_with(
    schema: &ActivityTypeSchema,
    content: Map<String, Value>,
    policy: UnknownFieldPolicy,
) -> Result<ActivityContent, ContentValidationError> {
    let mut violations: Vec<ContentViolation> = schema
        .required_fields
        .iter()
        .filter(|field| !content.contains_key(field.as_str()))
        .map(|field| ContentViolation::MissingRequiredField(field.clone()))
        .collect();

    let unknown: Vec<&String> = content
        .keys()
        .filter(|field| !schema.declares(field))
        .collect();
    match policy {
        UnknownFieldPolicy::Tolerate => {
            if !unknown.is_empty() {
                debug!(
                    type_name = %schema.type_name,
                    fields = ?unknown,
                    "passing through undeclared content fields"
                );
            }
        }
        UnknownFieldPolicy::Strict => violations.extend(
            unknown
                .iter()
                .map(|field| ContentViolation::UnknownField((*field).clone())),
        ),
    }

    if !violations.is_empty() {
        return Err(ContentValidationError {
            type_name: schema.type_name.clone(),
            violations,
        });
    }

    ActivityContent::for_registration(&schema.type_name, &schema.required_fields, content)
        .map_err(|err| ContentValidationError {
            type_name: schema.type_name.clone(),
            violations: vec![ContentViolation::Malformed(err.to_string())],
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn worksheet_schema() -> ActivityTypeSchema {
        ActivityTypeSchema::new(
            "worksheet",
            "Printable scaffold",
            ["file_url"],
            ["instructions", "estimated_time_min", "materials_needed"],
            Map::new(),
        )
        .expect("valid schema")
    }

    #[test]
    fn unknown_fields_are_tolerated_and_preserved() {
        let content = validate_content(
            &worksheet_schema(),
            fields(json!({ "file_url": "x.pdf", "extra": "z" })),
        )
        .expect("content accepted");

        assert_eq!(
            serde_json::to_value(&content).expect("serializes"),
            json!({ "file_url": "x.pdf", "extra": "z" })
        );
    }

    #[test]
    fn missing_required_field_is_named() {
        let error = validate_content(&worksheet_schema(), fields(json!({ "extra": "z" })))
            .expect_err("missing field rejected");

        assert_eq!(error.type_name, "worksheet");
        assert_eq!(error.missing_fields(), vec!["file_url"]);
        assert!(error.to_string().contains("file_url"));
    }

    #[test]
    fn every_missing_field_is_reported() {
        let schema = ActivityTypeSchema::new(
            "lab",
            "Hands-on lab",
            ["steps", "safety_notes", "kit"],
            ["duration_min"],
            Map::new(),
        )
        .expect("valid schema");

        let error = validate_content(&schema, fields(json!({ "steps": ["mix"] })))
            .expect_err("missing fields rejected");

        assert_eq!(error.missing_fields(), vec!["kit", "safety_notes"]);
    }

    #[test]
    fn strict_policy_rejects_unknown_fields() {
        let error = validate_content_with(
            &worksheet_schema(),
            fields(json!({ "file_url": "x.pdf", "extra": "z" })),
            UnknownFieldPolicy::Strict,
        )
        .expect_err("unknown field rejected");

        assert_eq!(
            error.violations,
            vec![ContentViolation::UnknownField("extra".to_string())]
        );
    }

    #[test]
    fn wrongly_shaped_builtin_field_is_malformed() {
        let error = validate_content(
            &worksheet_schema(),
            fields(json!({ "file_url": "x.pdf", "estimated_time_min": "eight" })),
        )
        .expect_err("bad shape rejected");

        assert!(matches!(
            error.violations.as_slice(),
            [ContentViolation::Malformed(_)]
        ));
    }

    #[test]
    fn explicit_null_optional_is_returned_unchanged() {
        let raw = fields(json!({ "file_url": "x.pdf", "instructions": null }));
        let content =
            validate_content(&worksheet_schema(), raw.clone()).expect("content accepted");

        assert_eq!(
            serde_json::to_value(&content).expect("serializes"),
            Value::Object(raw)
        );
    }

    #[test]
    fn registered_field_set_is_the_contract_for_builtin_names() {
        let schema =
            ActivityTypeSchema::new("video", "Linked clip", ["link"], ["length"], Map::new())
                .expect("valid schema");

        let content = validate_content(&schema, fields(json!({ "link": "https://a" })))
            .expect("registered contract satisfied");
        assert_eq!(content.type_name(), "video");
        assert_eq!(
            serde_json::to_value(&content).expect("serializes"),
            json!({ "link": "https://a" })
        );

        let error = validate_content(&schema, fields(json!({ "url": "https://a" })))
            .expect_err("registered field missing");
        assert_eq!(error.missing_fields(), vec!["link"]);
    }
}
