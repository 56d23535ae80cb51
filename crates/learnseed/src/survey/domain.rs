use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::attribution::Creator;
use crate::store::{Entity, EntityKind};

/// Identifier wrapper for stored survey templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurveyId(pub Uuid);

impl SurveyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurveyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SurveyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Question identifier, unique within its template (e.g. `q1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl QuestionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Category → points table attached to an answer option.
///
/// Entries keep their declaration order because the scoring tie-break depends on the
/// order in which categories are first encountered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreTable(Vec<(String, u32)>);

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points for `category`; categories missing from the table contribute zero.
    pub fn points(&self, category: &str) -> u32 {
        self.0
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, points)| *points)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(name, points)| (name.as_str(), *points))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Set the points for a category, keeping its position when it already exists.
    pub fn set(&mut self, category: impl Into<String>, points: u32) {
        let category = category.into();
        match self.0.iter_mut().find(|(name, _)| *name == category) {
            Some(entry) => entry.1 = points,
            None => self.0.push((category, points)),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for ScoreTable {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        let mut table = ScoreTable::new();
        for (category, points) in iter {
            table.set(category, points);
        }
        table
    }
}

impl Serialize for ScoreTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (category, points) in &self.0 {
            map.serialize_entry(category, points)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ScoreTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoreTableVisitor;

        impl<'de> Visitor<'de> for ScoreTableVisitor {
            type Value = ScoreTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of category names to non-negative integer points")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ScoreTable, A::Error> {
                let mut entries: Vec<(String, u32)> = Vec::new();
                while let Some((category, points)) = access.next_entry::<String, u32>()? {
                    if entries.iter().any(|(name, _)| *name == category) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate score category '{category}'"
                        )));
                    }
                    entries.push((category, points));
                }
                Ok(ScoreTable(entries))
            }
        }

        deserializer.deserialize_map(ScoreTableVisitor)
    }
}

/// One selectable answer together with its score contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub label: String,
    #[serde(default)]
    pub scores: ScoreTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub options: Vec<AnswerOption>,
}

/// Ordered questionnaire used to derive a learner's style profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyTemplate {
    pub id: SurveyId,
    pub title: String,
    pub questions: Vec<Question>,
    pub creator: Creator,
    pub created_at: DateTime<Utc>,
}

impl SurveyTemplate {
    pub fn new(
        title: impl Into<String>,
        questions: Vec<Question>,
        creator: Creator,
    ) -> Result<Self, SurveyError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(SurveyError::EmptyTitle);
        }
        if questions.is_empty() {
            return Err(SurveyError::NoQuestions { title });
        }

        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(&question.id) {
                return Err(SurveyError::DuplicateQuestion(question.id.clone()));
            }
            if question.options.is_empty() {
                return Err(SurveyError::NoOptions(question.id.clone()));
            }
        }

        Ok(Self {
            id: SurveyId::new(),
            title,
            questions,
            creator,
            created_at: Utc::now(),
        })
    }

    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| &question.id == id)
    }

    /// Categories in the order they are first encountered, scanning questions top to
    /// bottom and options left to right.
    pub fn categories(&self) -> Vec<String> {
        let mut ordered: Vec<String> = Vec::new();
        for option in self.questions.iter().flat_map(|question| &question.options) {
            for category in option.scores.categories() {
                if !ordered.iter().any(|existing| existing == category) {
                    ordered.push(category.to_string());
                }
            }
        }
        ordered
    }
}

impl Entity for SurveyTemplate {
    const KIND: EntityKind = EntityKind::SurveyTemplate;

    fn key(&self) -> &str {
        &self.title
    }
}

/// Structural problems detected while building a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurveyError {
    #[error("survey title must not be empty")]
    EmptyTitle,
    #[error("survey '{title}' has no questions")]
    NoQuestions { title: String },
    #[error("question id '{0}' appears more than once")]
    DuplicateQuestion(QuestionId),
    #[error("question '{0}' offers no options")]
    NoOptions(QuestionId),
}
