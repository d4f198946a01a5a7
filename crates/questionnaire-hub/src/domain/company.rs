use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CompanyId, CompanyQuestionnaireId, QuestionnaireId, UserId};
use super::period::Period;
use super::{bounded_text, ValidationError};

pub const COMPANY_NAME_MIN: usize = 3;
pub const COMPANY_NAME_MAX: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn new(name: &str, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: CompanyId::generate(),
            name: validate_company_name(name)?,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rename(&mut self, name: &str, now: DateTime<Utc>) -> Result<(), ValidationError> {
        self.name = validate_company_name(name)?;
        self.updated_at = now;
        Ok(())
    }
}

pub fn validate_company_name(name: &str) -> Result<String, ValidationError> {
    bounded_text("name", name, COMPANY_NAME_MIN, Some(COMPANY_NAME_MAX))
}

/// A questionnaire made available to one company for a bounded period.
///
/// Holds references only; later edits to the questionnaire do not invalidate the binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyQuestionnaire {
    pub id: CompanyQuestionnaireId,
    pub company_id: CompanyId,
    pub questionnaire_id: QuestionnaireId,
    pub assigned_by: UserId,
    pub assigned_at: DateTime<Utc>,
    #[serde(flatten)]
    pub period: Period,
    pub is_active: bool,
}

impl CompanyQuestionnaire {
    pub fn new(
        company_id: CompanyId,
        questionnaire_id: QuestionnaireId,
        assigned_by: UserId,
        period: Period,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CompanyQuestionnaireId::generate(),
            company_id,
            questionnaire_id,
            assigned_by,
            assigned_at: now,
            period,
            is_active: true,
        }
    }

    pub fn is_open_at(&self, instant: DateTime<Utc>) -> bool {
        self.period.contains(instant)
    }

    /// True when both bindings are active, target the same pair, and their windows overlap.
    pub fn collides_with(&self, other: &CompanyQuestionnaire) -> bool {
        self.id != other.id
            && self.is_active
            && other.is_active
            && self.company_id == other.company_id
            && self.questionnaire_id == other.questionnaire_id
            && self.period.overlaps(&other.period)
    }
}
