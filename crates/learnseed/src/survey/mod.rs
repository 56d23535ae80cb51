//! Learning-style survey templates and the scoring engine that turns a learner's answers
//! into a weighted category profile.

pub mod domain;
pub mod responses;
pub mod scoring;

pub use domain::{
    AnswerOption, Question, QuestionId, ScoreTable, SurveyError, SurveyId, SurveyTemplate,
};
pub use responses::{parse_responses, parse_responses_path, LearnerResponses, ResponseImportError};
pub use scoring::{
    compute_profile, LearningProfile, ResponseContribution, ScoreVector, ScoringError,
    SurveyResponse,
};
