use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::activity::{
    Activity, ActivityDraft, ActivityTypeSchema, Admission, DefaultDesignation, UnknownFieldPolicy,
    SYSTEM_DEFAULT_TAG,
};
use crate::attribution::Creator;
use crate::seed::{run_seed, SeedDataset, SeedError, SeedOptions, SeedReport, SeedSession};
use crate::store::{SeedStore, StoreError, TypedStore};
use crate::survey::{
    compute_profile, LearningProfile, ScoringError, SurveyId, SurveyResponse, SurveyTemplate,
};

/// Catalog and scoring operations over a store. Writes are serialized through a single
/// writer lock and each one commits or rolls back its own batch.
pub struct CatalogService<S> {
    store: Arc<S>,
    creator: Creator,
    unknown_fields: UnknownFieldPolicy,
    writer: Mutex<()>,
}

/// Listing entry for a survey template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurveySummary {
    pub id: SurveyId,
    pub title: String,
    pub question_count: usize,
    pub categories: Vec<String>,
}

impl From<&SurveyTemplate> for SurveySummary {
    fn from(template: &SurveyTemplate) -> Self {
        Self {
            id: template.id,
            title: template.title.clone(),
            question_count: template.questions.len(),
            categories: template.categories(),
        }
    }
}

impl<S> CatalogService<S>
where
    S: SeedStore + 'static,
{
    pub fn new(store: Arc<S>, creator: Creator) -> Self {
        Self {
            store,
            creator,
            unknown_fields: UnknownFieldPolicy::default(),
            writer: Mutex::new(()),
        }
    }

    pub fn with_unknown_field_policy(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn surveys(&self) -> Result<Vec<SurveySummary>, ServiceError> {
        let templates = self.store.load_all::<SurveyTemplate>()?;
        Ok(templates.iter().map(SurveySummary::from).collect())
    }

    pub fn survey(&self, id: SurveyId) -> Result<SurveyTemplate, ServiceError> {
        self.store
            .load_all::<SurveyTemplate>()?
            .into_iter()
            .find(|template| template.id == id)
            .ok_or_else(|| ServiceError::SurveyNotFound(id.to_string()))
    }

    /// Look a survey up by exact title, falling back to its id.
    pub fn find_survey(&self, title_or_id: &str) -> Result<SurveyTemplate, ServiceError> {
        if let Some(template) = self.store.find::<SurveyTemplate>(title_or_id)? {
            return Ok(template);
        }
        match Uuid::parse_str(title_or_id.trim()) {
            Ok(uuid) => self.survey(SurveyId(uuid)),
            Err(_) => Err(ServiceError::SurveyNotFound(title_or_id.to_string())),
        }
    }

    pub fn profile(
        &self,
        id: SurveyId,
        responses: &[SurveyResponse],
    ) -> Result<LearningProfile, ServiceError> {
        let template = self.survey(id)?;
        Ok(compute_profile(&template, responses)?)
    }

    pub fn activity_types(&self) -> Result<Vec<ActivityTypeSchema>, ServiceError> {
        Ok(self.store.load_all::<ActivityTypeSchema>()?)
    }

    pub fn activities(&self, tag: Option<&str>) -> Result<Vec<Activity>, ServiceError> {
        let activities = self.store.load_all::<Activity>()?;
        Ok(match tag {
            Some(tag) => activities
                .into_iter()
                .filter(|activity| activity.has_tag(tag))
                .collect(),
            None => activities,
        })
    }

    pub fn system_default(&self) -> Result<Option<Activity>, ServiceError> {
        Ok(self.activities(Some(SYSTEM_DEFAULT_TAG))?.into_iter().next())
    }

    pub fn upsert_activity(&self, draft: ActivityDraft) -> Result<Admission, ServiceError> {
        self.write(|session| session.upsert_activity(draft))
    }

    pub fn mark_system_default(&self, name: &str) -> Result<DefaultDesignation, ServiceError> {
        self.write(|session| session.mark_system_default(name))
    }

    /// Run a full seed under the writer lock. `run_seed` owns commit and rollback.
    pub fn seed(
        &self,
        dataset: &SeedDataset,
        options: &SeedOptions,
    ) -> Result<SeedReport, ServiceError> {
        let _writer = self.lock_writer()?;
        Ok(run_seed(self.store.as_ref(), dataset, options)?)
    }

    fn write<T>(
        &self,
        operation: impl FnOnce(&mut SeedSession<'_, S>) -> Result<T, SeedError>,
    ) -> Result<T, ServiceError> {
        let _writer = self.lock_writer()?;
        let mut session = SeedSession::open(self.store.as_ref(), self.creator.clone())?
            .with_unknown_field_policy(self.unknown_fields);

        match operation(&mut session) {
            Ok(value) => {
                session.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = session.rollback() {
                    error!(error = %rollback_err, "rollback after failed catalog write failed");
                }
                Err(err.into())
            }
        }
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, ()>, ServiceError> {
        self.writer.lock().map_err(|_| {
            ServiceError::Store(StoreError::Unavailable("catalog writer lock poisoned".into()))
        })
    }
}

/// Error raised by the catalog service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("survey '{0}' not found")]
    SurveyNotFound(String),
}

impl ServiceError {
    /// Caller input was rejected; retrying the same request cannot succeed.
    pub fn is_validation(&self) -> bool {
        match self {
            ServiceError::Scoring(_) => true,
            ServiceError::Seed(err) => err.is_entry_error(),
            ServiceError::Store(_) | ServiceError::SurveyNotFound(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::SurveyNotFound(_)
                | ServiceError::Store(StoreError::NotFound { .. })
                | ServiceError::Seed(SeedError::Store(StoreError::NotFound { .. }))
        )
    }
}
