use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use serde::Deserialize;

use super::service::{NewQuestionnaire, QuestionnaireChanges, QuestionnaireService};
use crate::access::require_tier;
use crate::domain::{QuestionDraft, QuestionId, QuestionnaireId};
use crate::error::ServiceError;
use crate::http::envelope::{created, message, ok};
use crate::http::JsonBody;
use crate::identity::{Principal, Role};
use crate::repository::PageRequest;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    page_size: Option<i64>,
    #[serde(default)]
    active_only: bool,
}

/// Catalog endpoints. Every route is reserved for super admins.
pub fn questionnaire_router(service: Arc<QuestionnaireService>) -> Router {
    Router::new()
        .route(
            "/api/v1/questionnaires",
            post(create_handler).get(list_handler),
        )
        .route("/api/v1/questionnaires/stats", get(stats_handler))
        .route(
            "/api/v1/questionnaires/:id",
            get(get_handler).put(update_handler).delete(deactivate_handler),
        )
        .route(
            "/api/v1/questionnaires/:id/questions",
            post(add_question_handler),
        )
        .route(
            "/api/v1/questionnaires/:id/questions/:question_id",
            put(update_question_handler).delete(remove_question_handler),
        )
        .with_state(service)
}

pub(crate) async fn create_handler(
    State(service): State<Arc<QuestionnaireService>>,
    Extension(caller): Extension<Principal>,
    JsonBody(request): JsonBody<NewQuestionnaire>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    let questionnaire = service.create(&caller, request)?;
    Ok(created(questionnaire, "questionnaire created"))
}

pub(crate) async fn list_handler(
    State(service): State<Arc<QuestionnaireService>>,
    Extension(caller): Extension<Principal>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    let page = PageRequest::normalized(query.page, query.page_size);
    let page = service.list(page, query.active_only)?;
    Ok(ok(page))
}

pub(crate) async fn stats_handler(
    State(service): State<Arc<QuestionnaireService>>,
    Extension(caller): Extension<Principal>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    Ok(ok(service.stats()?))
}

pub(crate) async fn get_handler(
    State(service): State<Arc<QuestionnaireService>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    let questionnaire = service.get(&QuestionnaireId::parse(&id)?)?;
    Ok(ok(questionnaire))
}

pub(crate) async fn update_handler(
    State(service): State<Arc<QuestionnaireService>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
    JsonBody(changes): JsonBody<QuestionnaireChanges>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    let questionnaire = service.update(&QuestionnaireId::parse(&id)?, changes)?;
    Ok(ok(questionnaire))
}

pub(crate) async fn deactivate_handler(
    State(service): State<Arc<QuestionnaireService>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    service.deactivate(&QuestionnaireId::parse(&id)?)?;
    Ok(message("questionnaire deactivated"))
}

pub(crate) async fn add_question_handler(
    State(service): State<Arc<QuestionnaireService>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
    JsonBody(draft): JsonBody<QuestionDraft>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    let question = service.add_question(&QuestionnaireId::parse(&id)?, draft)?;
    Ok(created(question, "question added"))
}

pub(crate) async fn update_question_handler(
    State(service): State<Arc<QuestionnaireService>>,
    Extension(caller): Extension<Principal>,
    Path((id, question_id)): Path<(String, String)>,
    JsonBody(draft): JsonBody<QuestionDraft>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    let question = service.update_question(
        &QuestionnaireId::parse(&id)?,
        &QuestionId::parse(&question_id)?,
        draft,
    )?;
    Ok(ok(question))
}

pub(crate) async fn remove_question_handler(
    State(service): State<Arc<QuestionnaireService>>,
    Extension(caller): Extension<Principal>,
    Path((id, question_id)): Path<(String, String)>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    service.remove_question(&QuestionnaireId::parse(&id)?, &QuestionId::parse(&question_id)?)?;
    Ok(message("question removed"))
}
