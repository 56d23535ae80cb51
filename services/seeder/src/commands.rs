use crate::infra::{load_dataset, open_store, seed_options, SeedOverrides};
use clap::Args;
use learnseed::config::AppConfig;
use learnseed::error::AppError;
use learnseed::seed::{run_seed, PhaseReport, SeedReport};
use learnseed::service::CatalogService;
use learnseed::survey::{
    compute_profile, parse_responses_path, LearningProfile, ScoringError, SurveyTemplate,
};
use learnseed::telemetry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

#[derive(Args, Debug, Default)]
pub(crate) struct SeedArgs {
    /// Snapshot store path (defaults to SEED_STORE_PATH)
    #[arg(long)]
    pub(crate) store: Option<PathBuf>,
    /// Directory with surveys.json, activity_types.json, activities.json (defaults to the
    /// bundled dataset)
    #[arg(long)]
    pub(crate) dataset: Option<PathBuf>,
    /// Keep existing records instead of clearing the store first
    #[arg(long)]
    pub(crate) no_reset: bool,
    /// Record invalid entries in the report instead of aborting the run
    #[arg(long)]
    pub(crate) skip_invalid: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Survey title or id
    #[arg(long)]
    pub(crate) survey: String,
    /// CSV export with learner,question_id,option_index columns
    #[arg(long)]
    pub(crate) responses: PathBuf,
    /// Snapshot store path (defaults to SEED_STORE_PATH)
    #[arg(long)]
    pub(crate) store: Option<PathBuf>,
}

pub(crate) fn run_seed_command(args: SeedArgs) -> Result<(), AppError> {
    let SeedArgs {
        store,
        dataset,
        no_reset,
        skip_invalid,
    } = args;

    let mut config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    SeedOverrides { store, dataset }.apply(&mut config.seed);

    let store = open_store(&config.seed.store_path)?;
    let dataset = load_dataset(config.seed.dataset_dir.as_deref())?;
    let options = seed_options(&config.seed, !no_reset, skip_invalid);

    let report = run_seed(&store, &dataset, &options)?;
    println!("{}", render_seed_report(&report, store.path()));
    Ok(())
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        survey,
        responses,
        store,
    } = args;

    let mut config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    SeedOverrides {
        store,
        dataset: None,
    }
    .apply(&mut config.seed);

    let store = Arc::new(open_store(&config.seed.store_path)?);
    let service = CatalogService::new(store, config.seed.creator.clone());
    let template = service.find_survey(&survey)?;
    let learners = parse_responses_path(&responses)?;

    let results: Vec<(String, Result<LearningProfile, ScoringError>)> = learners
        .into_iter()
        .map(|entry| {
            let profile = compute_profile(&template, &entry.responses);
            if let Err(err) = &profile {
                warn!(learner = %entry.learner, error = %err, "learner responses rejected");
            }
            (entry.learner, profile)
        })
        .collect();

    println!("{}", render_profiles(&template, &results));
    Ok(())
}

pub(crate) fn render_seed_report(report: &SeedReport, store_path: &Path) -> String {
    let mut lines = vec![format!("Seed run committed to {}", store_path.display())];
    if report.reset {
        lines.push("  store reset before seeding".to_string());
    }
    lines.extend(phase_lines("surveys", &report.surveys));
    lines.extend(phase_lines("activity types", &report.activity_types));
    lines.extend(phase_lines("activities", &report.activities));
    lines.push(format!("  system default: {}", report.system_default));
    match &report.default_holder {
        Some(name) => lines.push(format!("  current default holder: {name}")),
        None => lines.push("  current default holder: none".to_string()),
    }
    lines.join("\n")
}

fn phase_lines(label: &str, phase: &PhaseReport) -> Vec<String> {
    let mut lines = vec![format!("  {label}: {phase}")];
    for failure in &phase.failed {
        lines.push(format!("    - {}: {}", failure.key, failure.reason));
    }
    lines
}

pub(crate) fn render_profiles(
    template: &SurveyTemplate,
    results: &[(String, Result<LearningProfile, ScoringError>)],
) -> String {
    let mut lines = vec![format!(
        "Survey: {} ({} questions)",
        template.title,
        template.questions.len()
    )];

    for (learner, result) in results {
        match result {
            Ok(profile) => {
                let dominant = profile.dominant_category.as_deref().unwrap_or("no answers");
                lines.push(format!(
                    "{learner}: {dominant} ({} points)",
                    profile.total_points
                ));
                for (category, points) in profile.scores.iter() {
                    lines.push(format!("    {category}: {points}"));
                }
            }
            Err(err) => lines.push(format!("{learner}: rejected ({err})")),
        }
    }

    if results.is_empty() {
        lines.push("no learner responses found".to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnseed::attribution::Creator;
    use learnseed::seed::{DefaultOutcome, SeedDataset};
    use learnseed::survey::SurveyResponse;

    fn learning_buddy() -> SurveyTemplate {
        let spec = SeedDataset::deploy()
            .expect("bundled dataset")
            .surveys
            .into_iter()
            .find(|survey| survey.title == "Learning Buddy: Style Check")
            .expect("survey bundled");
        SurveyTemplate::new(spec.title, spec.questions, Creator::system_seed())
            .expect("valid survey")
    }

    #[test]
    fn seed_summary_lists_phases_and_failures() {
        let mut report = SeedReport {
            reset: true,
            system_default: DefaultOutcome::NotFound("Calm Reset Routine".to_string()),
            ..SeedReport::default()
        };
        report.surveys.inserted = 2;
        report.activities.inserted = 9;
        report.activities.failed.push(learnseed::seed::EntryFailure {
            key: "Broken".to_string(),
            reason: "missing required field 'url'".to_string(),
        });

        let rendered = render_seed_report(&report, Path::new("data/learnseed.json"));

        assert!(rendered.starts_with("Seed run committed to data/learnseed.json"));
        assert!(rendered.contains("surveys: 2 inserted, 0 already present, 0 failed"));
        assert!(rendered.contains("    - Broken: missing required field 'url'"));
        assert!(rendered.contains("'Calm Reset Routine' not found"));
        assert!(rendered.contains("current default holder: none"));
    }

    #[test]
    fn profile_listing_shows_dominant_and_rejections() {
        let template = learning_buddy();
        let results = vec![
            (
                "ana".to_string(),
                compute_profile(&template, &[SurveyResponse::new("q7", 1)]),
            ),
            (
                "ben".to_string(),
                compute_profile(&template, &[SurveyResponse::new("q42", 0)]),
            ),
        ];

        let rendered = render_profiles(&template, &results);

        assert!(rendered.contains("ana: Passive learner (5 points)"));
        assert!(rendered.contains("    Active learner: 0"));
        assert!(rendered.contains("ben: rejected (question 'q42' is not part of this survey)"));
    }
}
