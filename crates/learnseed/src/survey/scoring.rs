use std::collections::HashSet;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::domain::{QuestionId, SurveyTemplate};

/// A learner's answer to a single question; `option_index` is 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub question_id: QuestionId,
    pub option_index: usize,
}

impl SurveyResponse {
    pub fn new(question_id: impl Into<String>, option_index: usize) -> Self {
        Self {
            question_id: QuestionId(question_id.into()),
            option_index,
        }
    }
}

/// Per-category accumulator, ordered by the template's declared category ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreVector {
    totals: Vec<(String, u64)>,
}

impl ScoreVector {
    /// Zero-initialized vector over `categories`, in the given order.
    pub fn zeroed<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut totals: Vec<(String, u64)> = Vec::new();
        for category in categories {
            let category = category.into();
            if !totals.iter().any(|(name, _)| *name == category) {
                totals.push((category, 0));
            }
        }
        Self { totals }
    }

    pub fn get(&self, category: &str) -> u64 {
        self.totals
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, total)| *total)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.totals.iter().map(|(name, total)| (name.as_str(), *total))
    }

    /// Sum across every category.
    pub fn total(&self) -> u64 {
        self.totals.iter().map(|(_, total)| *total).sum()
    }

    /// Highest scoring category. Ties go to the category declared first.
    pub fn dominant(&self) -> Option<&str> {
        let mut best: Option<(&str, u64)> = None;
        for (name, total) in self.iter() {
            match best {
                Some((_, best_total)) if total <= best_total => {}
                _ => best = Some((name, total)),
            }
        }
        best.map(|(name, _)| name)
    }

    fn add(&mut self, category: &str, points: u32) {
        match self.totals.iter_mut().find(|(name, _)| name == category) {
            Some(entry) => entry.1 += u64::from(points),
            None => self.totals.push((category.to_string(), u64::from(points))),
        }
    }
}

impl Serialize for ScoreVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.totals.len()))?;
        for (category, total) in &self.totals {
            map.serialize_entry(category, total)?;
        }
        map.end()
    }
}

/// Which option a response selected, kept for audit trails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseContribution {
    pub question_id: QuestionId,
    pub option_index: usize,
    pub option_label: String,
}

/// Result of scoring one complete response set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LearningProfile {
    pub scores: ScoreVector,
    pub dominant_category: Option<String>,
    pub total_points: u64,
    pub contributions: Vec<ResponseContribution>,
}

/// Caller-input problems surfaced while scoring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("question '{question_id}' is not part of this survey")]
    UnknownQuestion { question_id: QuestionId },
    #[error(
        "option {option_index} is out of range for question '{question_id}' ({option_count} options)"
    )]
    InvalidOptionIndex {
        question_id: QuestionId,
        option_index: usize,
        option_count: usize,
    },
    #[error("question '{question_id}' was answered more than once")]
    DuplicateResponse { question_id: QuestionId },
}

/// Score a learner's responses against `template`.
///
/// Evaluation is all-or-nothing: the first invalid response aborts scoring and no
/// partial vector is returned. Response order does not affect the result.
pub fn compute_profile(
    template: &SurveyTemplate,
    responses: &[SurveyResponse],
) -> Result<LearningProfile, ScoringError> {
    let mut scores = ScoreVector::zeroed(template.categories());
    let mut answered: HashSet<&QuestionId> = HashSet::new();
    let mut contributions = Vec::with_capacity(responses.len());

    for response in responses {
        let question = template
            .question(&response.question_id)
            .ok_or_else(|| ScoringError::UnknownQuestion {
                question_id: response.question_id.clone(),
            })?;

        if !answered.insert(&question.id) {
            return Err(ScoringError::DuplicateResponse {
                question_id: question.id.clone(),
            });
        }

        let option = question.options.get(response.option_index).ok_or_else(|| {
            ScoringError::InvalidOptionIndex {
                question_id: question.id.clone(),
                option_index: response.option_index,
                option_count: question.options.len(),
            }
        })?;

        for (category, points) in option.scores.iter() {
            scores.add(category, points);
        }

        contributions.push(ResponseContribution {
            question_id: question.id.clone(),
            option_index: response.option_index,
            option_label: option.label.clone(),
        });
    }

    let dominant_category = scores.dominant().map(str::to_string);
    let total_points = scores.total();

    Ok(LearningProfile {
        scores,
        dominant_category,
        total_points,
        contributions,
    })
}
