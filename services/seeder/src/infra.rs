use learnseed::config::SeedConfig;
use learnseed::error::AppError;
use learnseed::seed::{FailurePolicy, SeedDataset, SeedOptions};
use learnseed::store::JsonFileStore;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Command-line overrides layered over `SeedConfig`.
#[derive(Debug, Default, Clone)]
pub(crate) struct SeedOverrides {
    pub(crate) store: Option<PathBuf>,
    pub(crate) dataset: Option<PathBuf>,
}

impl SeedOverrides {
    pub(crate) fn apply(self, config: &mut SeedConfig) {
        if let Some(store) = self.store {
            config.store_path = store;
        }
        if let Some(dataset) = self.dataset {
            config.dataset_dir = Some(dataset);
        }
    }
}

pub(crate) fn open_store(path: &Path) -> Result<JsonFileStore, AppError> {
    let store = JsonFileStore::open(path)?;
    info!(path = %store.path().display(), "store opened");
    Ok(store)
}

pub(crate) fn load_dataset(dir: Option<&Path>) -> Result<SeedDataset, AppError> {
    let dataset = match dir {
        Some(dir) => {
            info!(dir = %dir.display(), "loading seed dataset");
            SeedDataset::from_dir(dir)?
        }
        None => SeedDataset::deploy()?,
    };
    Ok(dataset)
}

pub(crate) fn seed_options(config: &SeedConfig, reset: bool, skip_invalid: bool) -> SeedOptions {
    SeedOptions {
        reset,
        failure_policy: if skip_invalid {
            FailurePolicy::SkipInvalid
        } else {
            FailurePolicy::Abort
        },
        creator: config.creator.clone(),
        ..SeedOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnseed::attribution::Creator;

    fn config() -> SeedConfig {
        SeedConfig {
            store_path: PathBuf::from(SeedConfig::DEFAULT_STORE_PATH),
            dataset_dir: None,
            creator: Creator::new("Curriculum Team", "team@school.example"),
        }
    }

    #[test]
    fn overrides_replace_configured_paths() {
        let mut config = config();
        SeedOverrides {
            store: Some(PathBuf::from("/tmp/other.json")),
            dataset: Some(PathBuf::from("pilot")),
        }
        .apply(&mut config);

        assert_eq!(config.store_path, PathBuf::from("/tmp/other.json"));
        assert_eq!(config.dataset_dir, Some(PathBuf::from("pilot")));
    }

    #[test]
    fn options_carry_creator_and_policy() {
        let options = seed_options(&config(), false, true);
        assert!(!options.reset);
        assert_eq!(options.failure_policy, FailurePolicy::SkipInvalid);
        assert_eq!(options.creator.name, "Curriculum Team");
    }
}
