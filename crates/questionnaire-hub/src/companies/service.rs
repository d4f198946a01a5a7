use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::access::TenantGuard;
use crate::clock::Clock;
use crate::domain::{
    Company, CompanyId, CompanyQuestionnaire, CompanyQuestionnaireId, Period, QuestionnaireId,
    ValidationError,
};
use crate::error::ServiceError;
use crate::http::params::{
    deserialize_optional_period_end, deserialize_optional_period_start, deserialize_period_end,
    deserialize_period_start,
};
use crate::identity::Principal;
use crate::questionnaires::service::load_assignable;
use crate::repository::{
    CompanyQuestionnaireRepository, CompanyRepository, Page, PageRequest,
    QuestionnaireRepository, RepositoryError, Repositories, UserMetadataRepository,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewBinding {
    pub questionnaire_id: String,
    #[serde(deserialize_with = "deserialize_period_start")]
    pub period_start: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_period_end")]
    pub period_end: DateTime<Utc>,
}

/// Partial binding update. A missing bound keeps its current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BindingChanges {
    #[serde(default, deserialize_with = "deserialize_optional_period_start")]
    pub period_start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_period_end")]
    pub period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

pub struct CompanyService {
    companies: Arc<dyn CompanyRepository>,
    questionnaires: Arc<dyn QuestionnaireRepository>,
    bindings: Arc<dyn CompanyQuestionnaireRepository>,
    users: Arc<dyn UserMetadataRepository>,
    guard: TenantGuard,
    clock: Arc<dyn Clock>,
}

impl CompanyService {
    pub fn new(repositories: &Repositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            companies: repositories.companies.clone(),
            questionnaires: repositories.questionnaires.clone(),
            bindings: repositories.bindings.clone(),
            users: repositories.users.clone(),
            guard: TenantGuard::new(repositories.users.clone()),
            clock,
        }
    }

    pub fn create_company(&self, name: &str) -> Result<Company, ServiceError> {
        let company = Company::new(name, self.clock.now())?;
        let stored = self.companies.insert(company)?;
        info!(company = %stored.id, "company created");
        Ok(stored)
    }

    pub fn get_company(&self, id: &CompanyId) -> Result<Company, ServiceError> {
        self.companies
            .fetch(id)?
            .ok_or_else(|| ServiceError::not_found("company"))
    }

    pub fn list_companies(&self, page: PageRequest) -> Result<Page<Company>, ServiceError> {
        Ok(page.slice(self.companies.list()?))
    }

    /// Case-insensitive substring match on the company name.
    pub fn search_companies(&self, needle: &str) -> Result<Vec<Company>, ServiceError> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return Err(ValidationError::MissingField { field: "name" }.into());
        }
        Ok(self
            .companies
            .list()?
            .into_iter()
            .filter(|company| company.name.to_lowercase().contains(&needle))
            .collect())
    }

    pub fn rename_company(&self, id: &CompanyId, name: &str) -> Result<Company, ServiceError> {
        let mut company = self.get_company(id)?;
        company.rename(name, self.clock.now())?;
        self.companies.update(company.clone())?;
        info!(company = %id, "company renamed");
        Ok(company)
    }

    /// Refused while users or bindings still reference the company.
    pub fn delete_company(&self, id: &CompanyId) -> Result<(), ServiceError> {
        self.get_company(id)?;
        if !self.users.list_by_company(id)?.is_empty() {
            return Err(ServiceError::invalid_state("company still has users"));
        }
        if !self.bindings.list_by_company(id, false)?.is_empty() {
            return Err(ServiceError::invalid_state(
                "company still has questionnaire bindings",
            ));
        }
        if !self.companies.delete(id)? {
            return Err(ServiceError::not_found("company"));
        }
        info!(company = %id, "company deleted");
        Ok(())
    }

    /// Binds a questionnaire to a company for a period.
    pub fn assign_questionnaire(
        &self,
        caller: &Principal,
        company_id: &CompanyId,
        request: NewBinding,
    ) -> Result<CompanyQuestionnaire, ServiceError> {
        let questionnaire_id = QuestionnaireId::parse(&request.questionnaire_id)?;
        let period = Period::new(request.period_start, request.period_end)?;

        self.get_company(company_id)?;
        load_assignable(self.questionnaires.as_ref(), &questionnaire_id)?;

        let binding = CompanyQuestionnaire::new(
            company_id.clone(),
            questionnaire_id,
            caller.subject.clone(),
            period,
            self.clock.now(),
        );
        let stored = self.bindings.insert(binding).map_err(overlap_conflict)?;
        info!(
            binding = %stored.id,
            company = %stored.company_id,
            questionnaire = %stored.questionnaire_id,
            "questionnaire bound to company"
        );
        Ok(stored)
    }

    pub fn get_binding(
        &self,
        caller: &Principal,
        id: &CompanyQuestionnaireId,
    ) -> Result<CompanyQuestionnaire, ServiceError> {
        let binding = self.load_binding(id)?;
        self.guard.authorize(caller, &binding.company_id)?;
        Ok(binding)
    }

    pub fn list_bindings(
        &self,
        caller: &Principal,
        company_id: &CompanyId,
        active_only: bool,
    ) -> Result<Vec<CompanyQuestionnaire>, ServiceError> {
        self.guard.authorize(caller, company_id)?;
        Ok(self.bindings.list_by_company(company_id, active_only)?)
    }

    /// Active bindings whose period contains the current instant.
    pub fn open_bindings(
        &self,
        caller: &Principal,
        company_id: &CompanyId,
    ) -> Result<Vec<CompanyQuestionnaire>, ServiceError> {
        self.guard.authorize(caller, company_id)?;
        let now = self.clock.now();
        Ok(self
            .bindings
            .list_by_company(company_id, true)?
            .into_iter()
            .filter(|binding| binding.is_open_at(now))
            .collect())
    }

    pub fn update_binding(
        &self,
        caller: &Principal,
        id: &CompanyQuestionnaireId,
        changes: BindingChanges,
    ) -> Result<CompanyQuestionnaire, ServiceError> {
        let mut binding = self.get_binding(caller, id)?;
        if changes.period_start.is_some() || changes.period_end.is_some() {
            binding.period = Period::new(
                changes.period_start.unwrap_or(binding.period.start()),
                changes.period_end.unwrap_or(binding.period.end()),
            )?;
        }
        if let Some(is_active) = changes.is_active {
            binding.is_active = is_active;
        }
        self.bindings
            .update(binding.clone())
            .map_err(overlap_conflict)?;
        info!(binding = %id, active = binding.is_active, "binding updated");
        Ok(binding)
    }

    pub fn deactivate_binding(
        &self,
        caller: &Principal,
        id: &CompanyQuestionnaireId,
    ) -> Result<(), ServiceError> {
        let mut binding = self.get_binding(caller, id)?;
        binding.is_active = false;
        self.bindings.update(binding)?;
        info!(binding = %id, "binding deactivated");
        Ok(())
    }

    fn load_binding(
        &self,
        id: &CompanyQuestionnaireId,
    ) -> Result<CompanyQuestionnaire, ServiceError> {
        self.bindings
            .fetch(id)?
            .ok_or_else(|| ServiceError::not_found("company questionnaire"))
    }
}

fn overlap_conflict(err: RepositoryError) -> ServiceError {
    match err {
        RepositoryError::Conflict => ServiceError::conflict(
            "questionnaire is already assigned to this company for an overlapping period",
        ),
        RepositoryError::NotFound => ServiceError::not_found("company questionnaire"),
        other => other.into(),
    }
}
