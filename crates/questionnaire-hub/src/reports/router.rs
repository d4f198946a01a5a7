use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Router};

use super::service::ReportService;
use crate::access::require_tier;
use crate::domain::{CompanyId, CompanyQuestionnaireId};
use crate::error::ServiceError;
use crate::http::envelope::ok;
use crate::identity::{Principal, Role};

pub fn report_router(service: Arc<ReportService>) -> Router {
    Router::new()
        .route(
            "/api/v1/reports/company-questionnaire/:cq_id/completion",
            get(completion_handler),
        )
        .route(
            "/api/v1/reports/company/:company_id/overview",
            get(overview_handler),
        )
        .route(
            "/api/v1/reports/company/:company_id/employees-progress",
            get(employee_progress_handler),
        )
        .with_state(service)
}

pub(crate) async fn completion_handler(
    State(service): State<Arc<ReportService>>,
    Extension(caller): Extension<Principal>,
    Path(cq_id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::Supervisor)?;
    let metrics = service.completion_metrics(&caller, &CompanyQuestionnaireId::parse(&cq_id)?)?;
    Ok(ok(metrics))
}

pub(crate) async fn overview_handler(
    State(service): State<Arc<ReportService>>,
    Extension(caller): Extension<Principal>,
    Path(company_id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::Supervisor)?;
    Ok(ok(service.company_overview(&caller, &CompanyId::parse(&company_id)?)?))
}

pub(crate) async fn employee_progress_handler(
    State(service): State<Arc<ReportService>>,
    Extension(caller): Extension<Principal>,
    Path(company_id): Path<String>,
) -> Result<Response, ServiceError> {
    require_tier(&caller, Role::Supervisor)?;
    Ok(ok(service.employee_progress(&caller, &CompanyId::parse(&company_id)?)?))
}
