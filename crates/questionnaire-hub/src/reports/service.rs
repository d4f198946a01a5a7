use std::sync::Arc;

use tracing::{debug, warn};

use super::views::{
    average_minutes_to_complete, completion_by_department, employee_progress, BindingBreakdown,
    CompanyOverview, CompletionMetrics, EmployeeProgress, StatusBreakdown,
};
use crate::access::TenantGuard;
use crate::assignments::service::percentage;
use crate::domain::{Company, CompanyId, CompanyQuestionnaireId, UserId};
use crate::error::ServiceError;
use crate::identity::Principal;
use crate::repository::{
    AssignmentRepository, CompanyQuestionnaireRepository, CompanyRepository,
    QuestionnaireRepository, Repositories, UserMetadataRepository,
};

const REPORT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Derived completion views. Every report authorizes the caller against the owning company
/// first; missing data produces zero-valued aggregates.
pub struct ReportService {
    companies: Arc<dyn CompanyRepository>,
    questionnaires: Arc<dyn QuestionnaireRepository>,
    bindings: Arc<dyn CompanyQuestionnaireRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    users: Arc<dyn UserMetadataRepository>,
    guard: TenantGuard,
}

impl ReportService {
    pub fn new(repositories: &Repositories) -> Self {
        Self {
            companies: repositories.companies.clone(),
            questionnaires: repositories.questionnaires.clone(),
            bindings: repositories.bindings.clone(),
            assignments: repositories.assignments.clone(),
            users: repositories.users.clone(),
            guard: TenantGuard::new(repositories.users.clone()),
        }
    }

    pub fn completion_metrics(
        &self,
        caller: &Principal,
        binding_id: &CompanyQuestionnaireId,
    ) -> Result<CompletionMetrics, ServiceError> {
        let binding = self
            .bindings
            .fetch(binding_id)?
            .ok_or_else(|| ServiceError::not_found("company questionnaire"))?;
        self.guard.authorize(caller, &binding.company_id)?;

        let company = self.load_company(&binding.company_id)?;
        let questionnaire = self
            .questionnaires
            .fetch(&binding.questionnaire_id)?
            .ok_or_else(|| ServiceError::not_found("questionnaire"))?;
        let members = self.users.list_by_company(&binding.company_id)?;
        let assignments = self.assignments.list_by_binding(binding_id)?;

        let counts = StatusBreakdown::tally(&assignments);
        debug!(binding = %binding_id, assigned = counts.total, "completion metrics computed");
        Ok(CompletionMetrics {
            company_questionnaire_id: binding.id.clone(),
            questionnaire_title: questionnaire.title,
            company_name: company.name,
            period_start: binding.period.start().format(REPORT_DATE_FORMAT).to_string(),
            period_end: binding.period.end().format(REPORT_DATE_FORMAT).to_string(),
            total_employees: members.len(),
            assigned: counts.total,
            pending: counts.pending,
            in_progress: counts.in_progress,
            completed: counts.completed,
            not_started: counts.pending,
            completion_percentage: counts.completion_percentage(),
            average_time_to_complete_minutes: average_minutes_to_complete(&assignments),
            completion_by_department: completion_by_department(&assignments, &members),
        })
    }

    /// Rolls up every binding the company ever received, active or not.
    pub fn company_overview(
        &self,
        caller: &Principal,
        company_id: &CompanyId,
    ) -> Result<CompanyOverview, ServiceError> {
        self.guard.authorize(caller, company_id)?;
        let company = self.load_company(company_id)?;
        let total_employees = self.users.list_by_company(company_id)?.len();
        let bindings = self.bindings.list_by_company(company_id, false)?;

        let mut breakdown = Vec::with_capacity(bindings.len());
        for binding in &bindings {
            let Some(questionnaire) = self.questionnaires.fetch(&binding.questionnaire_id)? else {
                warn!(
                    binding = %binding.id,
                    questionnaire = %binding.questionnaire_id,
                    "binding references a missing questionnaire, skipping"
                );
                continue;
            };
            let counts = StatusBreakdown::tally(&self.assignments.list_by_binding(&binding.id)?);
            breakdown.push(BindingBreakdown {
                company_questionnaire_id: binding.id.clone(),
                questionnaire_id: binding.questionnaire_id.clone(),
                questionnaire_title: questionnaire.title,
                is_active: binding.is_active,
                assigned: counts.total,
                completed: counts.completed,
                completion_percentage: counts.completion_percentage(),
            });
        }

        let total_assignments: usize = breakdown.iter().map(|entry| entry.assigned).sum();
        let completed_assignments: usize = breakdown.iter().map(|entry| entry.completed).sum();
        Ok(CompanyOverview {
            company_id: company.id,
            company_name: company.name,
            total_employees,
            total_questionnaires: bindings.len(),
            active_questionnaires: bindings.iter().filter(|binding| binding.is_active).count(),
            total_assignments,
            completed_assignments,
            overall_completion_percentage: percentage(completed_assignments, total_assignments),
            questionnaire_breakdown: breakdown,
        })
    }

    /// One row per member of the company, ordered by user id.
    pub fn employee_progress(
        &self,
        caller: &Principal,
        company_id: &CompanyId,
    ) -> Result<Vec<EmployeeProgress>, ServiceError> {
        self.guard.authorize(caller, company_id)?;
        self.load_company(company_id)?;
        let members = self.users.list_by_company(company_id)?;
        let ids: Vec<UserId> = members.iter().map(|member| member.user_id.clone()).collect();
        let assignments = if ids.is_empty() {
            Vec::new()
        } else {
            self.assignments.list_by_users(&ids)?
        };
        Ok(employee_progress(&members, &assignments))
    }

    fn load_company(&self, id: &CompanyId) -> Result<Company, ServiceError> {
        self.companies
            .fetch(id)?
            .ok_or_else(|| ServiceError::not_found("company"))
    }
}
