use crate::config::ConfigError;
use crate::seed::{DatasetError, SeedError};
use crate::service::ServiceError;
use crate::store::StoreError;
use crate::survey::ResponseImportError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Store(StoreError),
    Dataset(DatasetError),
    Seed(SeedError),
    Service(ServiceError),
    Responses(ResponseImportError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Dataset(err) => write!(f, "dataset error: {}", err),
            AppError::Seed(err) => write!(f, "seed error: {}", err),
            AppError::Service(err) => write!(f, "catalog error: {}", err),
            AppError::Responses(err) => write!(f, "response import error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Dataset(err) => Some(err),
            AppError::Seed(err) => Some(err),
            AppError::Service(err) => Some(err),
            AppError::Responses(err) => Some(err),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Service(err) if err.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Service(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            AppError::Seed(err) if err.is_entry_error() => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Responses(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<DatasetError> for AppError {
    fn from(value: DatasetError) -> Self {
        Self::Dataset(value)
    }
}

impl From<SeedError> for AppError {
    fn from(value: SeedError) -> Self {
        Self::Seed(value)
    }
}

impl From<ServiceError> for AppError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<ResponseImportError> for AppError {
    fn from(value: ResponseImportError) -> Self {
        Self::Responses(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::CatalogError;
    use crate::survey::ScoringError;

    #[test]
    fn validation_failures_map_to_unprocessable() {
        let error = AppError::from(ServiceError::Scoring(ScoringError::UnknownQuestion {
            question_id: "q42".into(),
        }));
        assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let error = AppError::from(SeedError::Catalog(CatalogError::UnknownType(
            "podcast".to_string(),
        )));
        assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn missing_survey_maps_to_not_found() {
        let error = AppError::from(ServiceError::SurveyNotFound("Quiz".to_string()));
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.to_string(), "catalog error: survey 'Quiz' not found");
    }

    #[test]
    fn store_outage_is_internal() {
        let error = AppError::from(StoreError::Unavailable("disk full".to_string()));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
