use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use questionnaire_hub::clock::FixedClock;
use questionnaire_hub::domain::UserId;
use questionnaire_hub::identity::{AuthError, Principal, Role, TokenVerifier};
use questionnaire_hub::repository::Repositories;
use questionnaire_hub::Hub;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Maps opaque test tokens straight to principals.
struct StaticTokens {
    principals: HashMap<&'static str, Principal>,
}

#[async_trait]
impl TokenVerifier for StaticTokens {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.principals
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::Rejected("unknown test token".to_string()))
    }
}

fn principal(subject: &str, roles: &[Role]) -> Principal {
    Principal::new(UserId::parse(subject).unwrap(), roles.iter().copied())
}

fn app() -> Router {
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 2, 10, 9, 0, 0).unwrap()));
    let hub = Hub::new(Repositories::in_memory(), clock);
    let verifier = StaticTokens {
        principals: HashMap::from([
            ("admin-token", principal("root-admin", &[Role::SuperAdmin])),
            ("lead-token", principal("lead-1", &[Role::Supervisor, Role::Employee])),
            ("emp-token", principal("emp-1", &[Role::Employee])),
            ("rival-token", principal("rival-lead", &[Role::Supervisor])),
        ]),
    };
    hub.router(Arc::new(verifier))
}

async fn call(app: &Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn id_of(body: &Value) -> String {
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let app = app();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/my-assignments")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "GET", "/api/v1/my-assignments", "forged", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn questionnaire_travels_from_catalog_to_completion_report() {
    let app = app();

    let (status, company) = call(&app, "POST", "/api/v1/companies", "admin-token", Some(json!({"name": "Acme Corp"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let company_id = id_of(&company);
    let (_, rival) = call(&app, "POST", "/api/v1/companies", "admin-token", Some(json!({"name": "Globex Inc"}))).await;
    let rival_id = id_of(&rival);

    let (status, questionnaire) = call(
        &app,
        "POST",
        "/api/v1/questionnaires",
        "admin-token",
        Some(json!({"title": "Quarterly engagement", "description": "Q1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let questionnaire_id = id_of(&questionnaire);

    let (status, question) = call(
        &app,
        "POST",
        &format!("/api/v1/questionnaires/{questionnaire_id}/questions"),
        "admin-token",
        Some(json!({
            "question_text": "Which office do you use?",
            "question_type": "multiple_choice",
            "options": {"kind": "choices", "choices": ["North", "South"]},
            "order_index": 0,
            "is_required": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let question_id = question["data"]["question_id"].as_str().unwrap().to_string();

    let (status, binding) = call(
        &app,
        "POST",
        &format!("/api/v1/companies/{company_id}/questionnaires"),
        "admin-token",
        Some(json!({
            "questionnaire_id": questionnaire_id,
            "period_start": "2025-01-01",
            "period_end": "2025-03-31"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let binding_id = id_of(&binding);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/v1/companies/{company_id}/questionnaires"),
        "admin-token",
        Some(json!({
            "questionnaire_id": questionnaire_id,
            "period_start": "2025-03-15",
            "period_end": "2025-06-30"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    for (user, company, supervisor) in [
        ("lead-1", &company_id, None),
        ("emp-1", &company_id, Some("lead-1")),
        ("rival-lead", &rival_id, None),
    ] {
        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/users/metadata",
            "admin-token",
            Some(json!({"user_id": user, "company_id": company, "supervisor_id": supervisor})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let assignments_uri = format!("/api/v1/company-questionnaires/{binding_id}/assignments");
    let (status, _) = call(&app, "POST", &assignments_uri, "rival-token", Some(json!({"user_ids": ["emp-1"]}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, batch) = call(&app, "POST", &assignments_uri, "lead-token", Some(json!({"user_ids": ["emp-1"]}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(batch["data"]["total_created"], 1);
    let assignment_id = batch["data"]["assignments"][0]["id"].as_str().unwrap().to_string();

    let (status, mine) = call(&app, "GET", "/api/v1/my-assignments", "emp-token", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["data"][0]["status"], "pending");

    let (status, saved) = call(
        &app,
        "POST",
        &format!("/api/v1/assignments/{assignment_id}/responses"),
        "emp-token",
        Some(json!({
            "question_id": question_id,
            "response_value": {"type": "choice", "value": "North"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["data"]["status"], "in_progress");

    let (status, submitted) = call(
        &app,
        "POST",
        &format!("/api/v1/assignments/{assignment_id}/submit"),
        "emp-token",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["data"]["status"], "completed");

    let report_uri = format!("/api/v1/reports/company-questionnaire/{binding_id}/completion");
    let (status, _) = call(&app, "GET", &report_uri, "emp-token", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, "GET", &report_uri, "rival-token", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, report) = call(&app, "GET", &report_uri, "lead-token", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["data"]["assigned"], 1);
    assert_eq!(report["data"]["completed"], 1);
    assert_eq!(report["data"]["completion_percentage"], 100.0);
    assert_eq!(report["data"]["period_end"], "2025-03-31");

    let (status, overview) = call(
        &app,
        "GET",
        &format!("/api/v1/reports/company/{company_id}/overview"),
        "lead-token",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["data"]["total_employees"], 2);
    assert_eq!(overview["data"]["overall_completion_percentage"], 100.0);
}
