//! Wiring of repositories, services, and routers into one authenticated API surface.

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::Router;

use crate::assignments::{assignment_router, AssignmentService};
use crate::clock::Clock;
use crate::companies::{company_router, CompanyService};
use crate::directory::{directory_router, DirectoryService};
use crate::http::auth::authenticate;
use crate::identity::TokenVerifier;
use crate::questionnaires::{questionnaire_router, QuestionnaireService};
use crate::reports::{report_router, ReportService};
use crate::repository::Repositories;

#[derive(Clone)]
pub struct Hub {
    pub questionnaires: Arc<QuestionnaireService>,
    pub companies: Arc<CompanyService>,
    pub directory: Arc<DirectoryService>,
    pub assignments: Arc<AssignmentService>,
    pub reports: Arc<ReportService>,
}

impl Hub {
    pub fn new(repositories: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            questionnaires: Arc::new(QuestionnaireService::new(
                repositories.questionnaires.clone(),
                clock.clone(),
            )),
            companies: Arc::new(CompanyService::new(&repositories, clock.clone())),
            directory: Arc::new(DirectoryService::new(&repositories, clock.clone())),
            assignments: Arc::new(AssignmentService::new(&repositories, clock)),
            reports: Arc::new(ReportService::new(&repositories)),
        }
    }

    /// Every `/api/v1` route, behind bearer-token authentication.
    pub fn router(&self, verifier: Arc<dyn TokenVerifier>) -> Router {
        Router::new()
            .merge(questionnaire_router(self.questionnaires.clone()))
            .merge(company_router(self.companies.clone()))
            .merge(directory_router(self.directory.clone()))
            .merge(assignment_router(self.assignments.clone()))
            .merge(report_router(self.reports.clone()))
            .route_layer(from_fn_with_state(verifier, authenticate))
    }
}
