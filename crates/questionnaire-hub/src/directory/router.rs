use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use serde::Deserialize;

use super::service::{DirectoryService, MetadataChanges, NewUserMetadata};
use crate::access::require_tier;
use crate::domain::{CompanyId, UserId};
use crate::error::ServiceError;
use crate::http::envelope::{created, message, ok};
use crate::http::JsonBody;
use crate::identity::{Principal, Role};
use crate::repository::PageRequest;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CompanyUsersQuery {
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    page_size: Option<i64>,
    #[serde(default)]
    department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SupervisorRequest {
    #[serde(default)]
    supervisor_id: Option<String>,
}

pub fn directory_router(service: Arc<DirectoryService>) -> Router {
    Router::new()
        .route("/api/v1/users/metadata", post(create_handler))
        .route(
            "/api/v1/users/metadata/:user_id",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
        .route(
            "/api/v1/users/metadata/:user_id/supervisor",
            put(assign_supervisor_handler),
        )
        .route("/api/v1/companies/:company_id/users", get(company_users_handler))
        .route(
            "/api/v1/companies/:company_id/departments",
            get(departments_handler),
        )
        .with_state(service)
}

pub(crate) async fn create_handler(
    State(service): State<Arc<DirectoryService>>,
    Extension(caller): Extension<Principal>,
    JsonBody(request): JsonBody<NewUserMetadata>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    let metadata = service.create(request)?;
    Ok(created(metadata, "user metadata created"))
}

pub(crate) async fn get_handler(
    State(service): State<Arc<DirectoryService>>,
    Extension(caller): Extension<Principal>,
    Path(user_id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    Ok(ok(service.get(&UserId::parse(&user_id)?)?))
}

pub(crate) async fn update_handler(
    State(service): State<Arc<DirectoryService>>,
    Extension(caller): Extension<Principal>,
    Path(user_id): Path<String>,
    JsonBody(changes): JsonBody<MetadataChanges>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    Ok(ok(service.update(&UserId::parse(&user_id)?, changes)?))
}

pub(crate) async fn delete_handler(
    State(service): State<Arc<DirectoryService>>,
    Extension(caller): Extension<Principal>,
    Path(user_id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    service.delete(&UserId::parse(&user_id)?)?;
    Ok(message("user metadata deleted"))
}

pub(crate) async fn assign_supervisor_handler(
    State(service): State<Arc<DirectoryService>>,
    Extension(caller): Extension<Principal>,
    Path(user_id): Path<String>,
    JsonBody(request): JsonBody<SupervisorRequest>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::SuperAdmin)?;
    let supervisor = match request.supervisor_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(UserId::parse(raw)?),
    };
    let metadata = service.assign_supervisor(&UserId::parse(&user_id)?, supervisor)?;
    Ok(ok(metadata))
}

pub(crate) async fn company_users_handler(
    State(service): State<Arc<DirectoryService>>,
    Extension(caller): Extension<Principal>,
    Path(company_id): Path<String>,
    Query(query): Query<CompanyUsersQuery>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::CompanyAdmin)?;
    let company_id = CompanyId::parse(&company_id)?;
    match query.department.as_deref() {
        Some(department) => Ok(ok(service.users_in_department(
            &caller,
            &company_id,
            department,
        )?)),
        None => {
            let page = PageRequest::normalized(query.page, query.page_size);
            Ok(ok(service.list_by_company(&caller, &company_id, page)?))
        }
    }
}

pub(crate) async fn departments_handler(
    State(service): State<Arc<DirectoryService>>,
    Extension(caller): Extension<Principal>,
    Path(company_id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::CompanyAdmin)?;
    Ok(ok(service.departments(&caller, &CompanyId::parse(&company_id)?)?))
}
