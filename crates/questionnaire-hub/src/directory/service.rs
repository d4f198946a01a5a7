use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::access::TenantGuard;
use crate::clock::Clock;
use crate::domain::user::ensure_not_self;
use crate::domain::{CompanyId, UserId, UserMetadata, ValidationError};
use crate::error::ServiceError;
use crate::identity::Principal;
use crate::repository::{
    CompanyRepository, Page, PageRequest, RepositoryError, Repositories, UserMetadataRepository,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewUserMetadata {
    pub user_id: String,
    pub company_id: String,
    #[serde(default)]
    pub supervisor_id: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

/// Partial metadata update. `supervisor_id: ""` clears the supervisor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataChanges {
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub supervisor_id: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

pub struct DirectoryService {
    users: Arc<dyn UserMetadataRepository>,
    companies: Arc<dyn CompanyRepository>,
    guard: TenantGuard,
    clock: Arc<dyn Clock>,
}

impl DirectoryService {
    pub fn new(repositories: &Repositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            users: repositories.users.clone(),
            companies: repositories.companies.clone(),
            guard: TenantGuard::new(repositories.users.clone()),
            clock,
        }
    }

    pub fn create(&self, request: NewUserMetadata) -> Result<UserMetadata, ServiceError> {
        let user_id = UserId::parse(&request.user_id)?;
        let company_id = CompanyId::parse(&request.company_id)?;
        let supervisor_id = optional_user(request.supervisor_id.as_deref())?;
        ensure_not_self(&user_id, supervisor_id.as_ref())?;

        if self.users.fetch(&user_id)?.is_some() {
            return Err(ServiceError::conflict(format!(
                "metadata for user {user_id} already exists"
            )));
        }
        self.ensure_company(&company_id)?;
        if let Some(supervisor) = &supervisor_id {
            self.ensure_supervisor_in(supervisor, &company_id)?;
        }

        let metadata = UserMetadata::new(
            user_id,
            company_id,
            supervisor_id,
            request.department.as_deref(),
            self.clock.now(),
        )?;
        let stored = self.users.insert(metadata).map_err(|err| match err {
            RepositoryError::Conflict => {
                ServiceError::conflict("metadata for this user already exists")
            }
            other => other.into(),
        })?;
        info!(user = %stored.user_id, company = %stored.company_id, "user metadata created");
        Ok(stored)
    }

    pub fn get(&self, user_id: &UserId) -> Result<UserMetadata, ServiceError> {
        self.users
            .fetch(user_id)?
            .ok_or_else(|| ServiceError::not_found("user metadata"))
    }

    pub fn list_by_company(
        &self,
        caller: &Principal,
        company_id: &CompanyId,
        page: PageRequest,
    ) -> Result<Page<UserMetadata>, ServiceError> {
        self.guard.authorize(caller, company_id)?;
        Ok(page.slice(self.users.list_by_company(company_id)?))
    }

    pub fn list_by_supervisor(&self, supervisor: &UserId) -> Result<Vec<UserMetadata>, ServiceError> {
        Ok(self.users.list_by_supervisor(supervisor)?)
    }

    /// Distinct non-empty departments, sorted.
    pub fn departments(
        &self,
        caller: &Principal,
        company_id: &CompanyId,
    ) -> Result<Vec<String>, ServiceError> {
        self.guard.authorize(caller, company_id)?;
        let departments: BTreeSet<String> = self
            .users
            .list_by_company(company_id)?
            .into_iter()
            .filter_map(|metadata| metadata.department)
            .collect();
        Ok(departments.into_iter().collect())
    }

    pub fn users_in_department(
        &self,
        caller: &Principal,
        company_id: &CompanyId,
        department: &str,
    ) -> Result<Vec<UserMetadata>, ServiceError> {
        let department = department.trim();
        if department.is_empty() {
            return Err(ValidationError::MissingField {
                field: "department",
            }
            .into());
        }
        self.guard.authorize(caller, company_id)?;
        Ok(self
            .users
            .list_by_company(company_id)?
            .into_iter()
            .filter(|metadata| metadata.department.as_deref() == Some(department))
            .collect())
    }

    pub fn update(
        &self,
        user_id: &UserId,
        changes: MetadataChanges,
    ) -> Result<UserMetadata, ServiceError> {
        let company_id = changes
            .company_id
            .as_deref()
            .map(CompanyId::parse)
            .transpose()?;
        let supervisor_change = changes
            .supervisor_id
            .as_deref()
            .map(|raw| optional_user(Some(raw)))
            .transpose()?;
        if let Some(supervisor) = &supervisor_change {
            ensure_not_self(user_id, supervisor.as_ref())?;
        }

        let mut metadata = self.get(user_id)?;
        let now = self.clock.now();
        if let Some(company_id) = company_id {
            if company_id != metadata.company_id {
                self.ensure_company(&company_id)?;
                if !self.users.list_by_supervisor(user_id)?.is_empty() {
                    return Err(ServiceError::invalid_state(
                        "user still supervises users in their current company",
                    ));
                }
                metadata.company_id = company_id;
            }
        }
        if let Some(supervisor) = supervisor_change {
            metadata.set_supervisor(supervisor, now)?;
        }
        if let Some(supervisor) = &metadata.supervisor_id {
            self.ensure_supervisor_in(supervisor, &metadata.company_id)?;
        }
        if let Some(department) = changes.department.as_deref() {
            metadata.set_department(Some(department), now);
        }
        metadata.updated_at = now;

        self.users.update(metadata.clone())?;
        info!(user = %user_id, "user metadata updated");
        Ok(metadata)
    }

    /// Sets or clears a supervisor. Self-supervision is rejected before any lookup.
    pub fn assign_supervisor(
        &self,
        user_id: &UserId,
        supervisor: Option<UserId>,
    ) -> Result<UserMetadata, ServiceError> {
        ensure_not_self(user_id, supervisor.as_ref())?;
        let mut metadata = self.get(user_id)?;
        if let Some(supervisor) = &supervisor {
            self.ensure_supervisor_in(supervisor, &metadata.company_id)?;
        }
        metadata.set_supervisor(supervisor, self.clock.now())?;
        self.users.update(metadata.clone())?;
        info!(user = %user_id, supervisor = ?metadata.supervisor_id, "supervisor assigned");
        Ok(metadata)
    }

    /// Refused while anyone still names this user as their supervisor.
    pub fn delete(&self, user_id: &UserId) -> Result<(), ServiceError> {
        self.get(user_id)?;
        if !self.users.list_by_supervisor(user_id)?.is_empty() {
            return Err(ServiceError::invalid_state(
                "user still supervises other users",
            ));
        }
        if !self.users.delete(user_id)? {
            return Err(ServiceError::not_found("user metadata"));
        }
        info!(user = %user_id, "user metadata deleted");
        Ok(())
    }

    fn ensure_company(&self, company_id: &CompanyId) -> Result<(), ServiceError> {
        match self.companies.fetch(company_id)? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("company")),
        }
    }

    /// The supervisor must exist and belong to `company`.
    fn ensure_supervisor_in(
        &self,
        supervisor: &UserId,
        company: &CompanyId,
    ) -> Result<(), ServiceError> {
        let metadata = self
            .users
            .fetch(supervisor)?
            .ok_or_else(|| ServiceError::not_found("supervisor"))?;
        if &metadata.company_id != company {
            return Err(ValidationError::ForeignSupervisor {
                supervisor: supervisor.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Blank strings mean "no user".
fn optional_user(raw: Option<&str>) -> Result<Option<UserId>, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => UserId::parse(value).map(Some),
    }
}
