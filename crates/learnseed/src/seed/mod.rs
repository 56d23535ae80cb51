//! Idempotent seeding: surveys, activity types, activities, then the system default,
//! all inside one store batch.

pub mod dataset;
pub mod report;

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use crate::activity::{
    Activity, ActivityCatalog, ActivityDraft, ActivityTypeRegistry, ActivityTypeSchema,
    Admission, CatalogError, DefaultDesignation, Registration, SchemaError, UnknownFieldPolicy,
};
use crate::attribution::Creator;
use crate::store::{SeedStore, StoreError, TypedStore};
use crate::survey::{SurveyError, SurveyTemplate};

pub use dataset::{ActivityTypeSpec, DatasetError, SeedDataset, SurveySpec};
pub use report::{DefaultOutcome, EntryFailure, PhaseReport, SeedReport};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid survey: {0}")]
    Survey(#[from] SurveyError),
    #[error("invalid activity type: {0}")]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

impl SeedError {
    /// Whether the error concerns a single entry rather than the run as a whole.
    pub fn is_entry_error(&self) -> bool {
        matches!(
            self,
            SeedError::Survey(_) | SeedError::Schema(_) | SeedError::Catalog(_)
        )
    }
}

/// What to do when an individual dataset entry fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the run and roll back every write.
    #[default]
    Abort,
    /// Record the entry in the phase report and continue. Store failures still abort.
    SkipInvalid,
}

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub reset: bool,
    pub failure_policy: FailurePolicy,
    pub unknown_fields: UnknownFieldPolicy,
    pub creator: Creator,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            reset: true,
            failure_policy: FailurePolicy::default(),
            unknown_fields: UnknownFieldPolicy::default(),
            creator: Creator::system_seed(),
        }
    }
}

/// Whether a write created a new record or found one already present.
#[derive(Debug, Clone, PartialEq)]
pub enum Seeded<T> {
    Inserted(T),
    Existing(T),
}

impl<T> Seeded<T> {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Seeded::Inserted(_))
    }

    pub fn get(&self) -> &T {
        match self {
            Seeded::Inserted(value) | Seeded::Existing(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Seeded::Inserted(value) | Seeded::Existing(value) => value,
        }
    }
}

/// Indexes of everything visible in the store's current batch, plus the writes made
/// through this session. A session whose write failed must be rolled back.
pub struct SeedSession<'s, S: SeedStore + ?Sized> {
    store: &'s S,
    surveys: BTreeMap<String, SurveyTemplate>,
    registry: ActivityTypeRegistry,
    catalog: ActivityCatalog,
    creator: Creator,
}

impl<'s, S: SeedStore + ?Sized> SeedSession<'s, S> {
    pub fn open(store: &'s S, creator: Creator) -> Result<Self, SeedError> {
        let surveys = store
            .load_all::<SurveyTemplate>()?
            .into_iter()
            .map(|survey| (survey.title.clone(), survey))
            .collect();
        let registry = store
            .load_all::<ActivityTypeSchema>()?
            .into_iter()
            .collect();
        let catalog = store.load_all::<Activity>()?.into_iter().collect();

        Ok(Self {
            store,
            surveys,
            registry,
            catalog,
            creator,
        })
    }

    pub fn with_unknown_field_policy(mut self, policy: UnknownFieldPolicy) -> Self {
        self.catalog = self.catalog.with_unknown_field_policy(policy);
        self
    }

    pub fn surveys(&self) -> impl Iterator<Item = &SurveyTemplate> {
        self.surveys.values()
    }

    pub fn registry(&self) -> &ActivityTypeRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &ActivityCatalog {
        &self.catalog
    }

    pub fn system_default(&self) -> Option<&Activity> {
        self.catalog.system_default()
    }

    /// Insert the survey unless one with the same title exists.
    pub fn seed_survey(&mut self, spec: SurveySpec) -> Result<Seeded<SurveyTemplate>, SeedError> {
        if let Some(existing) = self.surveys.get(&spec.title) {
            info!(title = %spec.title, "survey already present, skipping");
            return Ok(Seeded::Existing(existing.clone()));
        }

        let template = SurveyTemplate::new(spec.title, spec.questions, self.creator.clone())?;
        self.store.insert_entity(&template)?;
        info!(title = %template.title, questions = template.questions.len(), "survey seeded");
        self.surveys.insert(template.title.clone(), template.clone());
        Ok(Seeded::Inserted(template))
    }

    pub fn register_type(&mut self, schema: ActivityTypeSchema) -> Result<Registration, SeedError> {
        if self.registry.contains(&schema.type_name) {
            info!(type_name = %schema.type_name, "activity type already registered, skipping");
            return Ok(Registration::AlreadyExists);
        }

        self.store.insert_entity(&schema)?;
        info!(type_name = %schema.type_name, "activity type registered");
        Ok(self.registry.register(schema))
    }

    pub fn upsert_activity(&mut self, mut draft: ActivityDraft) -> Result<Admission, SeedError> {
        draft.creator.get_or_insert_with(|| self.creator.clone());
        let admission = self.catalog.upsert_activity(&self.registry, draft)?;
        match &admission {
            Admission::Inserted {
                activity,
                displaced,
            } => {
                self.store.insert_entity(activity)?;
                self.persist_displaced(displaced)?;
                info!(
                    name = %activity.name,
                    type_name = %activity.type_name,
                    "activity seeded"
                );
            }
            Admission::Existing(activity) => {
                info!(name = %activity.name, "activity already present, skipping");
            }
        }
        Ok(admission)
    }

    pub fn mark_system_default(&mut self, name: &str) -> Result<DefaultDesignation, SeedError> {
        let designation = self.catalog.mark_system_default(name);
        match &designation {
            DefaultDesignation::Marked {
                activity,
                displaced,
            } => {
                self.store.update_entity(activity)?;
                self.persist_displaced(displaced)?;
                info!(name = %activity.name, displaced = displaced.len(), "system default marked");
            }
            DefaultDesignation::AlreadyDefault(activity) => {
                debug!(name = %activity.name, "system default unchanged");
            }
            DefaultDesignation::NotFound => {
                warn!(name, "system default activity not found");
            }
        }
        Ok(designation)
    }

    pub fn commit(self) -> Result<(), SeedError> {
        self.store.commit()?;
        Ok(())
    }

    pub fn rollback(self) -> Result<(), SeedError> {
        self.store.rollback()?;
        Ok(())
    }

    fn persist_displaced(&self, displaced: &[Activity]) -> Result<(), SeedError> {
        for activity in displaced {
            self.store.update_entity(activity)?;
            debug!(name = %activity.name, "system default tag removed");
        }
        Ok(())
    }
}

/// Seed `dataset` into `store` as one batch. Any error rolls the batch back, including
/// the reset.
pub fn run_seed<S: SeedStore + ?Sized>(
    store: &S,
    dataset: &SeedDataset,
    options: &SeedOptions,
) -> Result<SeedReport, SeedError> {
    info!(
        reset = options.reset,
        policy = ?options.failure_policy,
        surveys = dataset.surveys.len(),
        activity_types = dataset.activity_types.len(),
        activities = dataset.activities.len(),
        "seed run starting"
    );

    let outcome = seed_and_commit(store, dataset, options);
    if let Err(err) = &outcome {
        warn!(error = %err, "seed run failed, rolling back");
        if let Err(rollback_err) = store.rollback() {
            error!(error = %rollback_err, "rollback after failed seed run failed");
        }
    }
    outcome
}

fn seed_and_commit<S: SeedStore + ?Sized>(
    store: &S,
    dataset: &SeedDataset,
    options: &SeedOptions,
) -> Result<SeedReport, SeedError> {
    if options.reset {
        store.reset()?;
        info!("store reset");
    }

    let mut session = SeedSession::open(store, options.creator.clone())?
        .with_unknown_field_policy(options.unknown_fields);
    let mut report = SeedReport {
        reset: options.reset,
        ..SeedReport::default()
    };

    for spec in &dataset.surveys {
        let result = session
            .seed_survey(spec.clone())
            .map(|seeded| seeded.is_inserted());
        tally(&mut report.surveys, &spec.title, result, options.failure_policy)?;
    }

    for spec in &dataset.activity_types {
        let result = spec
            .to_schema()
            .map_err(SeedError::from)
            .and_then(|schema| session.register_type(schema))
            .map(|registration| registration == Registration::Registered);
        tally(
            &mut report.activity_types,
            &spec.type_name,
            result,
            options.failure_policy,
        )?;
    }

    for draft in &dataset.activities {
        let attributed = ActivityDraft {
            creator: Some(options.creator.clone()),
            ..draft.clone()
        };
        let result = session
            .upsert_activity(attributed)
            .map(|admission| admission.is_inserted());
        tally(
            &mut report.activities,
            &draft.name,
            result,
            options.failure_policy,
        )?;
    }

    if let Some(name) = &dataset.system_default {
        report.system_default = match session.mark_system_default(name)? {
            DefaultDesignation::Marked { activity, .. } => DefaultOutcome::Marked(activity.name),
            DefaultDesignation::AlreadyDefault(activity) => {
                DefaultOutcome::AlreadyDefault(activity.name)
            }
            DefaultDesignation::NotFound => DefaultOutcome::NotFound(name.clone()),
        };
    }
    report.default_holder = session.system_default().map(|activity| activity.name.clone());

    session.commit()?;
    info!(
        surveys = %report.surveys,
        activity_types = %report.activity_types,
        activities = %report.activities,
        system_default = %report.system_default,
        "seed run committed"
    );
    Ok(report)
}

fn tally(
    phase: &mut PhaseReport,
    key: &str,
    result: Result<bool, SeedError>,
    policy: FailurePolicy,
) -> Result<(), SeedError> {
    match result {
        Ok(true) => phase.inserted += 1,
        Ok(false) => phase.skipped += 1,
        Err(err) if policy == FailurePolicy::SkipInvalid && err.is_entry_error() => {
            warn!(key, error = %err, "skipping invalid seed entry");
            phase.record_failure(key, err);
        }
        Err(err) => return Err(err),
    }
    Ok(())
}
