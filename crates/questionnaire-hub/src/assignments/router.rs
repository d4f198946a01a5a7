use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Router};
use serde::Deserialize;

use super::service::{AssignmentService, NewAssignments, ResponseInput};
use crate::access::require_tier;
use crate::domain::{AssignmentId, AssignmentStatus, CompanyQuestionnaireId};
use crate::error::ServiceError;
use crate::http::envelope::{created, message, ok};
use crate::http::JsonBody;
use crate::identity::{Principal, Role};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StatusQuery {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseBatch {
    responses: Vec<ResponseInput>,
}

pub fn assignment_router(service: Arc<AssignmentService>) -> Router {
    Router::new()
        .route(
            "/api/v1/company-questionnaires/:cq_id/assignments",
            post(assign_handler).get(binding_assignments_handler),
        )
        .route(
            "/api/v1/my-company/questionnaires",
            get(my_company_questionnaires_handler),
        )
        .route("/api/v1/my-team/assignments", get(team_assignments_handler))
        .route("/api/v1/my-assignments", get(my_assignments_handler))
        .route(
            "/api/v1/assignments/:id",
            get(get_handler).delete(delete_handler),
        )
        .route("/api/v1/assignments/:id/progress", get(progress_handler))
        .route("/api/v1/assignments/:id/start", post(start_handler))
        .route(
            "/api/v1/assignments/:id/responses",
            post(save_response_handler).put(save_responses_handler),
        )
        .route("/api/v1/assignments/:id/submit", post(submit_handler))
        .with_state(service)
}

pub(crate) async fn assign_handler(
    State(service): State<Arc<AssignmentService>>,
    Extension(caller): Extension<Principal>,
    Path(cq_id): Path<String>,
    JsonBody(request): JsonBody<NewAssignments>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::Supervisor)?;
    let batch =
        service.assign_to_users(&caller, &CompanyQuestionnaireId::parse(&cq_id)?, request)?;
    Ok(created(batch, "users assigned"))
}

pub(crate) async fn binding_assignments_handler(
    State(service): State<Arc<AssignmentService>>,
    Extension(caller): Extension<Principal>,
    Path(cq_id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::Supervisor)?;
    let assignments =
        service.binding_assignments(&caller, &CompanyQuestionnaireId::parse(&cq_id)?)?;
    Ok(ok(assignments))
}

pub(crate) async fn my_company_questionnaires_handler(
    State(service): State<Arc<AssignmentService>>,
    Extension(caller): Extension<Principal>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::Supervisor)?;
    Ok(ok(service.my_company_questionnaires(&caller)?))
}

pub(crate) async fn team_assignments_handler(
    State(service): State<Arc<AssignmentService>>,
    Extension(caller): Extension<Principal>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::Supervisor)?;
    Ok(ok(service.team_assignments(&caller)?))
}

pub(crate) async fn my_assignments_handler(
    State(service): State<Arc<AssignmentService>>,
    Extension(caller): Extension<Principal>,
    Query(query): Query<StatusQuery>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::Employee)?;
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(AssignmentStatus::parse(raw)?),
    };
    Ok(ok(service.my_assignments(&caller, status)?))
}

pub(crate) async fn get_handler(
    State(service): State<Arc<AssignmentService>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::Employee)?;
    Ok(ok(service.get(&caller, &AssignmentId::parse(&id)?)?))
}

pub(crate) async fn delete_handler(
    State(service): State<Arc<AssignmentService>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::CompanyAdmin)?;
    service.delete(&caller, &AssignmentId::parse(&id)?)?;
    Ok(message("assignment deleted"))
}

pub(crate) async fn progress_handler(
    State(service): State<Arc<AssignmentService>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::Employee)?;
    Ok(ok(service.progress(&caller, &AssignmentId::parse(&id)?)?))
}

pub(crate) async fn start_handler(
    State(service): State<Arc<AssignmentService>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::Employee)?;
    Ok(ok(service.start(&caller, &AssignmentId::parse(&id)?)?))
}

pub(crate) async fn save_response_handler(
    State(service): State<Arc<AssignmentService>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<ResponseInput>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::Employee)?;
    Ok(ok(service.save_response(&caller, &AssignmentId::parse(&id)?, input)?))
}

pub(crate) async fn save_responses_handler(
    State(service): State<Arc<AssignmentService>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
    JsonBody(batch): JsonBody<ResponseBatch>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::Employee)?;
    let assignment =
        service.save_responses(&caller, &AssignmentId::parse(&id)?, batch.responses)?;
    Ok(ok(assignment))
}

pub(crate) async fn submit_handler(
    State(service): State<Arc<AssignmentService>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::Employee)?;
    Ok(ok(service.submit(&caller, &AssignmentId::parse(&id)?)?))
}
