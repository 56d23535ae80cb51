use std::fmt;

use serde::Serialize;

/// Entry that was rejected under `FailurePolicy::SkipInvalid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFailure {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub inserted: usize,
    pub skipped: usize,
    pub failed: Vec<EntryFailure>,
}

impl PhaseReport {
    pub(crate) fn record_failure(&mut self, key: impl Into<String>, reason: impl fmt::Display) {
        self.failed.push(EntryFailure {
            key: key.into(),
            reason: reason.to_string(),
        });
    }

    pub fn total(&self) -> usize {
        self.inserted + self.skipped + self.failed.len()
    }
}

impl fmt::Display for PhaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} already present, {} failed",
            self.inserted,
            self.skipped,
            self.failed.len()
        )
    }
}

/// What happened to the configured system-default activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "activity", rename_all = "snake_case")]
pub enum DefaultOutcome {
    #[default]
    NotRequested,
    Marked(String),
    AlreadyDefault(String),
    NotFound(String),
}

impl fmt::Display for DefaultOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultOutcome::NotRequested => f.write_str("no system default requested"),
            DefaultOutcome::Marked(name) => write!(f, "marked '{name}'"),
            DefaultOutcome::AlreadyDefault(name) => write!(f, "'{name}' already default"),
            DefaultOutcome::NotFound(name) => write!(f, "'{name}' not found, nothing marked"),
        }
    }
}

/// Summary of one `run_seed` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub reset: bool,
    pub surveys: PhaseReport,
    pub activity_types: PhaseReport,
    pub activities: PhaseReport,
    pub system_default: DefaultOutcome,
    /// Name of the activity holding the system-default tag once the run committed.
    pub default_holder: Option<String>,
}

impl SeedReport {
    pub fn inserted(&self) -> usize {
        self.surveys.inserted + self.activity_types.inserted + self.activities.inserted
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntryFailure> {
        self.surveys
            .failed
            .iter()
            .chain(&self.activity_types.failed)
            .chain(&self.activities.failed)
    }
}
