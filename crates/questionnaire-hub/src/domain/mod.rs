//! Entities owned by the questionnaire hub and the invariant-preserving mutators on them.

pub mod assignment;
pub mod company;
pub mod ids;
pub mod period;
pub mod questionnaire;
pub mod user;

pub use assignment::{
    AssignmentStatus, Coverage, Response, ResponseValue, TransitionError,
    UserQuestionnaireAssignment,
};
pub use company::{Company, CompanyQuestionnaire};
pub use ids::{
    AssignmentId, CompanyId, CompanyQuestionnaireId, QuestionId, QuestionnaireId, UserId,
};
pub use period::Period;
pub use questionnaire::{Question, QuestionDraft, QuestionOptions, QuestionType, Questionnaire};
pub use user::{UserMetadata, UNASSIGNED_DEPARTMENT};

/// Malformed input rejected before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid {kind} id '{value}'")]
    InvalidId { kind: &'static str, value: String },
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("period_start must be before period_end")]
    InvalidPeriod,
    #[error("a user cannot be their own supervisor")]
    SelfSupervision,
    #[error("supervisor {supervisor} belongs to a different company")]
    ForeignSupervisor { supervisor: String },
    #[error("invalid {field} '{value}'")]
    InvalidValue { field: &'static str, value: String },
    #[error("malformed request body: {reason}")]
    MalformedBody { reason: String },
    #[error("invalid options for {question_type} question: {detail}")]
    InvalidOptions {
        question_type: &'static str,
        detail: &'static str,
    },
}

/// Trims `value` and checks its character count against the given bounds.
pub(crate) fn bounded_text(
    field: &'static str,
    value: &str,
    min: usize,
    max: Option<usize>,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let length = trimmed.chars().count();
    if length == 0 && min > 0 {
        return Err(ValidationError::MissingField { field });
    }
    if length < min {
        return Err(ValidationError::TooShort { field, min });
    }
    if let Some(max) = max {
        if length > max {
            return Err(ValidationError::TooLong { field, max });
        }
    }
    Ok(trimmed.to_string())
}
