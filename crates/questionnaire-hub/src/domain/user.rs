use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CompanyId, UserId};
use super::ValidationError;

/// Bucket used when a user has no department.
pub const UNASSIGNED_DEPARTMENT: &str = "Unassigned";

/// Links an identity-provider subject to its company, supervisor, and department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    pub user_id: UserId,
    pub company_id: CompanyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserMetadata {
    pub fn new(
        user_id: UserId,
        company_id: CompanyId,
        supervisor_id: Option<UserId>,
        department: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        ensure_not_self(&user_id, supervisor_id.as_ref())?;
        Ok(Self {
            user_id,
            company_id,
            supervisor_id,
            department: normalize_department(department),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn set_supervisor(
        &mut self,
        supervisor_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        ensure_not_self(&self.user_id, supervisor_id.as_ref())?;
        self.supervisor_id = supervisor_id;
        self.updated_at = now;
        Ok(())
    }

    pub fn set_department(&mut self, department: Option<&str>, now: DateTime<Utc>) {
        self.department = normalize_department(department);
        self.updated_at = now;
    }

    pub fn department_label(&self) -> &str {
        self.department.as_deref().unwrap_or(UNASSIGNED_DEPARTMENT)
    }
}

pub fn ensure_not_self(user_id: &UserId, supervisor_id: Option<&UserId>) -> Result<(), ValidationError> {
    match supervisor_id {
        Some(supervisor) if supervisor == user_id => Err(ValidationError::SelfSupervision),
        _ => Ok(()),
    }
}

fn normalize_department(department: Option<&str>) -> Option<String> {
    department
        .map(str::trim)
        .filter(|department| !department.is_empty())
        .map(str::to_string)
}
