use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use learnseed::attribution::Creator;
use learnseed::router::catalog_router;
use learnseed::seed::{SeedDataset, SeedOptions};
use learnseed::service::CatalogService;
use learnseed::store::InMemorySeedStore;
use serde_json::{json, Value};
use tower::ServiceExt;

fn seeded_router() -> axum::Router {
    let service = CatalogService::new(
        Arc::new(InMemorySeedStore::new()),
        Creator::system_seed(),
    );
    service
        .seed(
            &SeedDataset::deploy().expect("bundled dataset"),
            &SeedOptions::default(),
        )
        .expect("seed run");
    catalog_router(Arc::new(service))
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("encode body")))
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn breathing_clip(url: &str) -> Value {
    json!({
        "name": "Box Breathing",
        "summary": "Two-minute guided breathing.",
        "type_name": "video",
        "tags": ["calm", "wellbeing"],
        "content": { "url": url, "duration_sec": 120, "captions": "en" }
    })
}

#[tokio::test]
async fn survey_profile_is_scored_over_http() {
    let router = seeded_router();

    let response = router
        .clone()
        .oneshot(get("/api/v1/surveys"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let surveys = read_json_body(response).await;
    let critter = surveys
        .as_array()
        .expect("survey list")
        .iter()
        .find(|survey| survey["title"] == "Critter Quest: Learning Adventure")
        .expect("critter quest listed");
    assert_eq!(critter["question_count"], 9);
    let survey_id = critter["id"].as_str().expect("id string").to_string();

    let body = json!({
        "responses": [
            { "question_id": "q4", "option_index": 4 },
            { "question_id": "q5", "option_index": 1 },
            { "question_id": "q6", "option_index": 2 }
        ]
    });
    let response = router
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/surveys/{survey_id}/profile"),
            &body,
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let profile = read_json_body(response).await;
    assert_eq!(profile["dominant_category"], "Buddy/Social learner");
    assert_eq!(profile["scores"]["Buddy/Social learner"], 15);
    assert_eq!(profile["scores"]["Passive learner"], 0);
    assert_eq!(profile["total_points"], 15);
}

#[tokio::test]
async fn duplicate_answer_is_unprocessable() {
    let router = seeded_router();
    let response = router
        .clone()
        .oneshot(get("/api/v1/surveys"))
        .await
        .expect("route executes");
    let surveys = read_json_body(response).await;
    let survey_id = surveys[0]["id"].as_str().expect("id string").to_string();

    let body = json!({
        "responses": [
            { "question_id": "q1", "option_index": 0 },
            { "question_id": "q1", "option_index": 1 }
        ]
    });
    let response = router
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/surveys/{survey_id}/profile"),
            &body,
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .expect("error message")
        .contains("q1"));
}

#[tokio::test]
async fn activity_upsert_is_created_then_existing() {
    let router = seeded_router();

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/activities",
            &breathing_clip("https://a.example/breathe"),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json_body(response).await;
    assert_eq!(created["status"], "inserted");
    assert_eq!(created["activity"]["content"]["captions"], "en");

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/activities",
            &breathing_clip("https://b.example/other"),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let existing = read_json_body(response).await;
    assert_eq!(existing["status"], "existing");
    assert_eq!(existing["activity"]["id"], created["activity"]["id"]);
    assert_eq!(
        existing["activity"]["content"]["url"],
        "https://a.example/breathe"
    );

    let response = router
        .oneshot(get("/api/v1/activities?tag=calm"))
        .await
        .expect("route executes");
    let calm = read_json_body(response).await;
    assert_eq!(calm.as_array().expect("activity list").len(), 3);
}

#[tokio::test]
async fn invalid_activity_content_is_unprocessable() {
    let router = seeded_router();
    let body = json!({
        "name": "Unlinked Worksheet",
        "type_name": "worksheet",
        "content": { "instructions": "Fill in the blanks." }
    });

    let response = router
        .clone()
        .oneshot(json_request(Method::POST, "/api/v1/activities", &body))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .expect("error message")
        .contains("file_url"));

    let response = router
        .oneshot(get("/api/v1/activities"))
        .await
        .expect("route executes");
    let activities = read_json_body(response).await;
    assert_eq!(activities.as_array().expect("activity list").len(), 10);
}

#[tokio::test]
async fn system_default_moves_between_activities() {
    let router = seeded_router();

    let response = router
        .clone()
        .oneshot(get("/api/v1/activities/system-default"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let current = read_json_body(response).await;
    assert_eq!(
        current["name"],
        "Wellbeing For Children: Confidence And Self-Esteem"
    );

    let response = router
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/api/v1/activities/system-default",
            &json!({ "name": "Music Track #2" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let marked = read_json_body(response).await;
    assert_eq!(marked["status"], "marked");
    assert_eq!(
        marked["displaced_defaults"],
        json!(["Wellbeing For Children: Confidence And Self-Esteem"])
    );

    let response = router
        .oneshot(get("/api/v1/activities?tag=__system_default__"))
        .await
        .expect("route executes");
    let holders = read_json_body(response).await;
    let names: Vec<&str> = holders
        .as_array()
        .expect("activity list")
        .iter()
        .filter_map(|activity| activity["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Music Track #2"]);
}

#[tokio::test]
async fn activity_types_are_listed() {
    let router = seeded_router();
    let response = router
        .oneshot(get("/api/v1/activity-types"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let types = read_json_body(response).await;
    let names: Vec<&str> = types
        .as_array()
        .expect("type list")
        .iter()
        .filter_map(|schema| schema["type_name"].as_str())
        .collect();
    assert_eq!(
        names,
        vec!["article", "in-class-task", "music", "video", "worksheet"]
    );
}
