use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::activity::{Activity, ActivityDraft, Admission, DefaultDesignation};
use crate::service::{CatalogService, ServiceError};
use crate::store::SeedStore;
use crate::survey::{SurveyId, SurveyResponse};

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub responses: Vec<SurveyResponse>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DefaultRequest {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStatus {
    Inserted,
    Existing,
    Marked,
    AlreadyDefault,
}

/// Response body for catalog writes.
#[derive(Debug, Serialize)]
pub struct CatalogWriteView {
    pub status: AdmissionStatus,
    pub activity: Activity,
    /// Activities that lost the system-default tag as a result of this write.
    pub displaced_defaults: Vec<String>,
}

impl CatalogWriteView {
    fn new(status: AdmissionStatus, activity: Activity, displaced: Vec<Activity>) -> Self {
        Self {
            status,
            activity,
            displaced_defaults: displaced.into_iter().map(|activity| activity.name).collect(),
        }
    }
}

pub fn catalog_router<S>(service: Arc<CatalogService<S>>) -> Router
where
    S: SeedStore + 'static,
{
    Router::new()
        .route("/api/v1/surveys", get(list_surveys_handler::<S>))
        .route("/api/v1/surveys/:survey_id", get(survey_handler::<S>))
        .route(
            "/api/v1/surveys/:survey_id/profile",
            post(profile_handler::<S>),
        )
        .route("/api/v1/activity-types", get(activity_types_handler::<S>))
        .route(
            "/api/v1/activities",
            get(list_activities_handler::<S>).post(upsert_activity_handler::<S>),
        )
        .route(
            "/api/v1/activities/system-default",
            get(system_default_handler::<S>).put(mark_default_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn list_surveys_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
) -> Response
where
    S: SeedStore + 'static,
{
    match service.surveys() {
        Ok(surveys) => (StatusCode::OK, Json(surveys)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn survey_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    Path(survey_id): Path<Uuid>,
) -> Response
where
    S: SeedStore + 'static,
{
    match service.survey(SurveyId(survey_id)) {
        Ok(template) => (StatusCode::OK, Json(template)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn profile_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    Path(survey_id): Path<Uuid>,
    Json(request): Json<ProfileRequest>,
) -> Response
where
    S: SeedStore + 'static,
{
    match service.profile(SurveyId(survey_id), &request.responses) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn activity_types_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
) -> Response
where
    S: SeedStore + 'static,
{
    match service.activity_types() {
        Ok(types) => (StatusCode::OK, Json(types)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_activities_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    Query(query): Query<ActivityQuery>,
) -> Response
where
    S: SeedStore + 'static,
{
    match service.activities(query.tag.as_deref()) {
        Ok(activities) => (StatusCode::OK, Json(activities)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn upsert_activity_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    Json(draft): Json<ActivityDraft>,
) -> Response
where
    S: SeedStore + 'static,
{
    match service.upsert_activity(draft) {
        Ok(Admission::Inserted {
            activity,
            displaced,
        }) => {
            let view = CatalogWriteView::new(AdmissionStatus::Inserted, activity, displaced);
            (StatusCode::CREATED, Json(view)).into_response()
        }
        Ok(Admission::Existing(activity)) => {
            let view = CatalogWriteView::new(AdmissionStatus::Existing, activity, Vec::new());
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn system_default_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
) -> Response
where
    S: SeedStore + 'static,
{
    match service.system_default() {
        Ok(Some(activity)) => (StatusCode::OK, Json(activity)).into_response(),
        Ok(None) => {
            let payload = json!({ "error": "no system default activity is set" });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn mark_default_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    Json(request): Json<DefaultRequest>,
) -> Response
where
    S: SeedStore + 'static,
{
    match service.mark_system_default(&request.name) {
        Ok(DefaultDesignation::Marked {
            activity,
            displaced,
        }) => {
            let view = CatalogWriteView::new(AdmissionStatus::Marked, activity, displaced);
            (StatusCode::OK, Json(view)).into_response()
        }
        Ok(DefaultDesignation::AlreadyDefault(activity)) => {
            let view =
                CatalogWriteView::new(AdmissionStatus::AlreadyDefault, activity, Vec::new());
            (StatusCode::OK, Json(view)).into_response()
        }
        Ok(DefaultDesignation::NotFound) => {
            let payload = json!({
                "error": format!("activity '{}' not found", request.name),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn error_response(error: ServiceError) -> Response {
    let status = if error.is_validation() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else if error.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
