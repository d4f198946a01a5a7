use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AssignmentId, CompanyQuestionnaireId, QuestionId, UserId};
use super::questionnaire::Questionnaire;
use super::ValidationError;

/// Lifecycle of one employee's attempt. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    InProgress,
    Completed,
}

impl AssignmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(ValidationError::InvalidValue {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Answer payload, tagged on the wire as `{"type": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResponseValue {
    Text(String),
    Numeric(f64),
    Boolean(bool),
    Choice(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub question_id: QuestionId,
    pub response_value: ResponseValue,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("assignment is already completed")]
    AlreadyCompleted,
}

/// Required-question coverage of an assignment's responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub answered: usize,
    pub required: usize,
}

impl Coverage {
    pub fn is_satisfied(&self) -> bool {
        self.answered >= self.required
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserQuestionnaireAssignment {
    pub id: AssignmentId,
    pub company_questionnaire_id: CompanyQuestionnaireId,
    pub user_id: UserId,
    pub assigned_by: UserId,
    pub assigned_at: DateTime<Utc>,
    pub status: AssignmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub responses: Vec<Response>,
    /// Bumped by the store on every write; an update carrying an older revision is refused.
    #[serde(default)]
    pub revision: u64,
}

impl UserQuestionnaireAssignment {
    pub fn new(
        company_questionnaire_id: CompanyQuestionnaireId,
        user_id: UserId,
        assigned_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AssignmentId::generate(),
            company_questionnaire_id,
            user_id,
            assigned_by,
            assigned_at: now,
            status: AssignmentStatus::Pending,
            started_at: None,
            completed_at: None,
            responses: Vec::new(),
            revision: 0,
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    pub fn is_completed(&self) -> bool {
        self.status == AssignmentStatus::Completed
    }

    /// Moves `pending` to `in_progress`. Returns whether a transition happened.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<bool, TransitionError> {
        match self.status {
            AssignmentStatus::Completed => Err(TransitionError::AlreadyCompleted),
            AssignmentStatus::InProgress => Ok(false),
            AssignmentStatus::Pending => {
                self.status = AssignmentStatus::InProgress;
                self.started_at.get_or_insert(now);
                Ok(true)
            }
        }
    }

    /// Upserts by question id; the first write on a pending assignment starts it.
    pub fn record_response(
        &mut self,
        question_id: QuestionId,
        value: ResponseValue,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.is_completed() {
            return Err(TransitionError::AlreadyCompleted);
        }

        match self
            .responses
            .iter_mut()
            .find(|response| response.question_id == question_id)
        {
            Some(existing) => {
                existing.response_value = value;
                existing.answered_at = now;
            }
            None => self.responses.push(Response {
                question_id,
                response_value: value,
                answered_at: now,
            }),
        }

        self.start(now)?;
        Ok(())
    }

    /// Marks the attempt completed. A pending attempt completes without gaining `started_at`.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.is_completed() {
            return Err(TransitionError::AlreadyCompleted);
        }
        self.status = AssignmentStatus::Completed;
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn response(&self, question_id: &QuestionId) -> Option<&Response> {
        self.responses
            .iter()
            .find(|response| &response.question_id == question_id)
    }

    /// Counts required questions that have a response. Responses to unknown or optional
    /// questions do not count.
    pub fn coverage(&self, questionnaire: &Questionnaire) -> Coverage {
        let required = questionnaire.required_question_ids();
        let answered = required
            .iter()
            .filter(|question_id| self.response(question_id).is_some())
            .count();
        Coverage {
            answered,
            required: required.len(),
        }
    }

    pub fn time_to_complete(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => Some(completed - started),
            _ => None,
        }
    }
}
