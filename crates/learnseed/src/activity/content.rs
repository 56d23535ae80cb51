use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Activity types with a concrete content shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinType {
    InClassTask,
    Worksheet,
    Video,
    Article,
    Music,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 5] = [
        BuiltinType::InClassTask,
        BuiltinType::Worksheet,
        BuiltinType::Video,
        BuiltinType::Article,
        BuiltinType::Music,
    ];

    pub const fn type_name(self) -> &'static str {
        match self {
            BuiltinType::InClassTask => "in-class-task",
            BuiltinType::Worksheet => "worksheet",
            BuiltinType::Video => "video",
            BuiltinType::Article => "article",
            BuiltinType::Music => "music",
        }
    }

    pub fn from_type_name(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|builtin| builtin.type_name() == value)
    }

    /// Fields the typed shape cannot be built without.
    pub const fn required_fields(self) -> &'static [&'static str] {
        match self {
            BuiltinType::InClassTask => &["steps"],
            BuiltinType::Worksheet => &["file_url"],
            BuiltinType::Video | BuiltinType::Article | BuiltinType::Music => &["url"],
        }
    }

    /// Whether every field the typed shape needs is also required by `required`.
    pub fn covered_by(self, required: &BTreeSet<String>) -> bool {
        self.required_fields()
            .iter()
            .all(|field| required.contains(*field))
    }
}

/// Live classroom activity (pair work, role-play, hands-on practice).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InClassTask {
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials_needed: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes_for_teacher: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Printable or digital scaffold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worksheet {
    pub file_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials_needed: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PausePoint {
    pub timestamp_sec: u64,
    pub prompt: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_points: Option<Vec<PausePoint>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_time_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection_questions: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Low-distraction background audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Music {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Content of a registered type that has no built-in shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomContent {
    #[serde(skip)]
    pub type_name: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Activity content tagged by its type. Serializes as the flat field map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActivityContent {
    InClassTask(InClassTask),
    Worksheet(Worksheet),
    Video(Video),
    Article(Article),
    Music(Music),
    Custom(CustomContent),
}

impl ActivityContent {
    /// Interpret stored `fields` of `type_name`. The typed shape is used when the fields
    /// carry everything it needs; anything else stays a field map.
    pub fn from_fields(
        type_name: &str,
        fields: Map<String, Value>,
    ) -> Result<Self, serde_json::Error> {
        let builtin = BuiltinType::from_type_name(type_name).filter(|builtin| {
            builtin
                .required_fields()
                .iter()
                .all(|field| fields.contains_key(*field))
        });
        Self::decode(type_name, builtin, fields)
    }

    /// Interpret `fields` under the registered `required_fields` of `type_name`. A
    /// registration that does not require the typed shape's fields keeps content as a
    /// field map. Only the shape is checked here.
    pub fn for_registration(
        type_name: &str,
        required_fields: &BTreeSet<String>,
        fields: Map<String, Value>,
    ) -> Result<Self, serde_json::Error> {
        let builtin = BuiltinType::from_type_name(type_name)
            .filter(|builtin| builtin.covered_by(required_fields));
        Self::decode(type_name, builtin, fields)
    }

    fn decode(
        type_name: &str,
        builtin: Option<BuiltinType>,
        mut fields: Map<String, Value>,
    ) -> Result<Self, serde_json::Error> {
        let Some(builtin) = builtin else {
            return Ok(ActivityContent::Custom(CustomContent {
                type_name: type_name.to_string(),
                fields,
            }));
        };

        // Explicit nulls ride along in `extra` so they serialize back unchanged.
        let nulls: Vec<String> = fields
            .iter()
            .filter(|(_, value)| value.is_null())
            .map(|(key, _)| key.clone())
            .collect();
        let mut null_fields = Map::new();
        for key in nulls {
            if let Some(value) = fields.remove(&key) {
                null_fields.insert(key, value);
            }
        }

        let value = Value::Object(fields);
        let mut content = match builtin {
            BuiltinType::InClassTask => {
                ActivityContent::InClassTask(serde_json::from_value(value)?)
            }
            BuiltinType::Worksheet => ActivityContent::Worksheet(serde_json::from_value(value)?),
            BuiltinType::Video => ActivityContent::Video(serde_json::from_value(value)?),
            BuiltinType::Article => ActivityContent::Article(serde_json::from_value(value)?),
            BuiltinType::Music => ActivityContent::Music(serde_json::from_value(value)?),
        };
        content.extra_mut().append(&mut null_fields);
        Ok(content)
    }

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        match self {
            ActivityContent::InClassTask(task) => &mut task.extra,
            ActivityContent::Worksheet(worksheet) => &mut worksheet.extra,
            ActivityContent::Video(video) => &mut video.extra,
            ActivityContent::Article(article) => &mut article.extra,
            ActivityContent::Music(music) => &mut music.extra,
            ActivityContent::Custom(custom) => &mut custom.fields,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            ActivityContent::InClassTask(_) => BuiltinType::InClassTask.type_name(),
            ActivityContent::Worksheet(_) => BuiltinType::Worksheet.type_name(),
            ActivityContent::Video(_) => BuiltinType::Video.type_name(),
            ActivityContent::Article(_) => BuiltinType::Article.type_name(),
            ActivityContent::Music(_) => BuiltinType::Music.type_name(),
            ActivityContent::Custom(custom) => &custom.type_name,
        }
    }

    /// Primary link for media-style content.
    pub fn url(&self) -> Option<&str> {
        match self {
            ActivityContent::Worksheet(worksheet) => Some(&worksheet.file_url),
            ActivityContent::Video(video) => Some(&video.url),
            ActivityContent::Article(article) => Some(&article.url),
            ActivityContent::Music(music) => Some(&music.url),
            ActivityContent::InClassTask(_) => None,
            ActivityContent::Custom(custom) => custom.fields.get("url").and_then(Value::as_str),
        }
    }
}
