use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

macro_rules! generated_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Accepts only canonical UUID text.
            pub fn parse(raw: &str) -> Result<Self, ValidationError> {
                let trimmed = raw.trim();
                Uuid::parse_str(trimmed)
                    .map(|id| Self(id.hyphenated().to_string()))
                    .map_err(|_| ValidationError::InvalidId {
                        kind: $kind,
                        value: raw.to_string(),
                    })
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

generated_id!(
    /// Identifier of a tenant company.
    CompanyId,
    "company"
);
generated_id!(QuestionnaireId, "questionnaire");
generated_id!(
    /// Stable token for a question, assigned once when the question is added.
    QuestionId,
    "question"
);
generated_id!(
    /// Identifier of a questionnaire-to-company binding.
    CompanyQuestionnaireId,
    "company questionnaire"
);
generated_id!(AssignmentId, "assignment");

/// Subject issued by the external identity provider. Opaque apart from being non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField { field: "user_id" });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
