use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Router};
use serde::Deserialize;

use super::service::{BindingChanges, CompanyService, NewBinding};
use crate::access::require_tier;
use crate::domain::{CompanyId, CompanyQuestionnaireId};
use crate::error::ServiceError;
use crate::http::envelope::{created, message, ok};
use crate::http::JsonBody;
use crate::http::params::ActiveQuery;
use crate::identity::{Principal, Role};
use crate::repository::PageRequest;

#[derive(Debug, Deserialize)]
pub(crate) struct CompanyName {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CompanyListQuery {
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    page_size: Option<i64>,
    #[serde(default)]
    name: Option<String>,
}

pub fn company_router(service: Arc<CompanyService>) -> Router {
    Router::new()
        .route("/api/v1/companies", post(create_handler).get(list_handler))
        .route(
            "/api/v1/companies/:company_id",
            get(get_handler).put(rename_handler).delete(delete_handler),
        )
        .route(
            "/api/v1/companies/:company_id/questionnaires",
            post(bind_handler).get(list_bindings_handler),
        )
        .route(
            "/api/v1/companies/:company_id/questionnaires/active",
            get(open_bindings_handler),
        )
        .route(
            "/api/v1/company-questionnaires/:cq_id",
            get(get_binding_handler)
                .put(update_binding_handler)
                .delete(deactivate_binding_handler),
        )
        .with_state(service)
}

pub(crate) async fn create_handler(
    State(service): State<Arc<CompanyService>>,
    Extension(caller): Extension<Principal>,
    JsonBody(request): JsonBody<CompanyName>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    let company = service.create_company(&request.name)?;
    Ok(created(company, "company created"))
}

pub(crate) async fn list_handler(
    State(service): State<Arc<CompanyService>>,
    Extension(caller): Extension<Principal>,
    Query(query): Query<CompanyListQuery>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    match query.name.as_deref() {
        Some(needle) => Ok(ok(service.search_companies(needle)?)),
        None => {
            let page = PageRequest::normalized(query.page, query.page_size);
            Ok(ok(service.list_companies(page)?))
        }
    }
}

pub(crate) async fn get_handler(
    State(service): State<Arc<CompanyService>>,
    Extension(caller): Extension<Principal>,
    Path(company_id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    Ok(ok(service.get_company(&CompanyId::parse(&company_id)?)?))
}

pub(crate) async fn rename_handler(
    State(service): State<Arc<CompanyService>>,
    Extension(caller): Extension<Principal>,
    Path(company_id): Path<String>,
    JsonBody(request): JsonBody<CompanyName>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    let company = service.rename_company(&CompanyId::parse(&company_id)?, &request.name)?;
    Ok(ok(company))
}

pub(crate) async fn delete_handler(
    State(service): State<Arc<CompanyService>>,
    Extension(caller): Extension<Principal>,
    Path(company_id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    service.delete_company(&CompanyId::parse(&company_id)?)?;
    Ok(message("company deleted"))
}

pub(crate) async fn bind_handler(
    State(service): State<Arc<CompanyService>>,
    Extension(caller): Extension<Principal>,
    Path(company_id): Path<String>,
    JsonBody(request): JsonBody<NewBinding>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    let binding =
        service.assign_questionnaire(&caller, &CompanyId::parse(&company_id)?, request)?;
    Ok(created(binding, "questionnaire assigned to company"))
}

pub(crate) async fn list_bindings_handler(
    State(service): State<Arc<CompanyService>>,
    Extension(caller): Extension<Principal>,
    Path(company_id): Path<String>,
    Query(query): Query<ActiveQuery>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::CompanyAdmin)?;
    let bindings =
        service.list_bindings(&caller, &CompanyId::parse(&company_id)?, query.active_only)?;
    Ok(ok(bindings))
}

pub(crate) async fn open_bindings_handler(
    State(service): State<Arc<CompanyService>>,
    Extension(caller): Extension<Principal>,
    Path(company_id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::CompanyAdmin)?;
    Ok(ok(service.open_bindings(&caller, &CompanyId::parse(&company_id)?)?))
}

pub(crate) async fn get_binding_handler(
    State(service): State<Arc<CompanyService>>,
    Extension(caller): Extension<Principal>,
    Path(cq_id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::CompanyAdmin)?;
    Ok(ok(service.get_binding(&caller, &CompanyQuestionnaireId::parse(&cq_id)?)?))
}

pub(crate) async fn update_binding_handler(
    State(service): State<Arc<CompanyService>>,
    Extension(caller): Extension<Principal>,
    Path(cq_id): Path<String>,
    JsonBody(changes): JsonBody<BindingChanges>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::CompanyAdmin)?;
    let binding =
        service.update_binding(&caller, &CompanyQuestionnaireId::parse(&cq_id)?, changes)?;
    Ok(ok(binding))
}

pub(crate) async fn deactivate_binding_handler(
    State(service): State<Arc<CompanyService>>,
    Extension(caller): Extension<Principal>,
    Path(cq_id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::CompanyAdmin)?;
    service.deactivate_binding(&caller, &CompanyQuestionnaireId::parse(&cq_id)?)?;
    Ok(message("company questionnaire deactivated"))
}
