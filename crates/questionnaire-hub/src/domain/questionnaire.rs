use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{QuestionId, QuestionnaireId, UserId};
use super::{bounded_text, ValidationError};

pub const TITLE_MIN: usize = 5;
pub const QUESTION_TEXT_MIN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    LikertScale,
    FreeText,
    YesNo,
}

impl QuestionType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::LikertScale => "likert_scale",
            Self::FreeText => "free_text",
            Self::YesNo => "yes_no",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim() {
            "multiple_choice" => Ok(Self::MultipleChoice),
            "likert_scale" => Ok(Self::LikertScale),
            "free_text" => Ok(Self::FreeText),
            "yes_no" => Ok(Self::YesNo),
            other => Err(ValidationError::InvalidValue {
                field: "question_type",
                value: other.to_string(),
            }),
        }
    }
}

/// Type-specific answer constraints attached to a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionOptions {
    Choices {
        choices: Vec<String>,
    },
    Scale {
        min: i32,
        max: i32,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        labels: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: QuestionId,
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<QuestionOptions>,
    pub order_index: i32,
    pub is_required: bool,
}

/// Caller-supplied question content, validated before it reaches a questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Option<QuestionOptions>,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default)]
    pub is_required: bool,
}

impl QuestionDraft {
    fn validated(self) -> Result<Self, ValidationError> {
        let question_text = bounded_text("question_text", &self.question_text, QUESTION_TEXT_MIN, None)?;
        let kind = self.question_type.label();
        match (self.question_type, &self.options) {
            (QuestionType::MultipleChoice, Some(QuestionOptions::Choices { choices })) => {
                if choices.len() < 2 {
                    return Err(ValidationError::InvalidOptions {
                        question_type: kind,
                        detail: "at least two choices are required",
                    });
                }
                if choices.iter().any(|choice| choice.trim().is_empty()) {
                    return Err(ValidationError::InvalidOptions {
                        question_type: kind,
                        detail: "choices must not be blank",
                    });
                }
            }
            (QuestionType::MultipleChoice, _) => {
                return Err(ValidationError::InvalidOptions {
                    question_type: kind,
                    detail: "a choice list is required",
                });
            }
            (QuestionType::LikertScale, Some(QuestionOptions::Scale { min, max, .. })) => {
                if min >= max {
                    return Err(ValidationError::InvalidOptions {
                        question_type: kind,
                        detail: "scale minimum must be below its maximum",
                    });
                }
            }
            (QuestionType::LikertScale, _) => {
                return Err(ValidationError::InvalidOptions {
                    question_type: kind,
                    detail: "a scale is required",
                });
            }
            (QuestionType::FreeText | QuestionType::YesNo, Some(_)) => {
                return Err(ValidationError::InvalidOptions {
                    question_type: kind,
                    detail: "options are not supported",
                });
            }
            (QuestionType::FreeText | QuestionType::YesNo, None) => {}
        }

        Ok(Self {
            question_text,
            ..self
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub id: QuestionnaireId,
    pub title: String,
    pub description: String,
    pub created_by: UserId,
    pub is_active: bool,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Questionnaire {
    pub fn new(
        title: &str,
        description: &str,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: QuestionnaireId::generate(),
            title: bounded_text("title", title, TITLE_MIN, None)?,
            description: description.trim().to_string(),
            created_by,
            is_active: true,
            questions: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Active and holding at least one question.
    pub fn is_assignable(&self) -> bool {
        self.is_active && !self.questions.is_empty()
    }

    pub fn apply_changes(
        &mut self,
        title: Option<&str>,
        description: Option<&str>,
        is_active: Option<bool>,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        let title = title
            .map(|title| bounded_text("title", title, TITLE_MIN, None))
            .transpose()?;
        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description.trim().to_string();
        }
        if let Some(is_active) = is_active {
            self.is_active = is_active;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }

    pub fn add_question(
        &mut self,
        draft: QuestionDraft,
        now: DateTime<Utc>,
    ) -> Result<Question, ValidationError> {
        let draft = draft.validated()?;
        let question = Question {
            question_id: QuestionId::generate(),
            question_text: draft.question_text,
            question_type: draft.question_type,
            options: draft.options,
            order_index: draft.order_index,
            is_required: draft.is_required,
        };
        self.questions.push(question.clone());
        self.updated_at = now;
        Ok(question)
    }

    /// Replaces a question's content in place, keeping its id. `None` when the id is unknown.
    pub fn replace_question(
        &mut self,
        question_id: &QuestionId,
        draft: QuestionDraft,
        now: DateTime<Utc>,
    ) -> Result<Option<Question>, ValidationError> {
        let draft = draft.validated()?;
        let Some(question) = self
            .questions
            .iter_mut()
            .find(|question| &question.question_id == question_id)
        else {
            return Ok(None);
        };

        question.question_text = draft.question_text;
        question.question_type = draft.question_type;
        question.options = draft.options;
        question.order_index = draft.order_index;
        question.is_required = draft.is_required;
        let updated = question.clone();
        self.updated_at = now;
        Ok(Some(updated))
    }

    pub fn remove_question(
        &mut self,
        question_id: &QuestionId,
        now: DateTime<Utc>,
    ) -> Option<Question> {
        let position = self
            .questions
            .iter()
            .position(|question| &question.question_id == question_id)?;
        self.updated_at = now;
        Some(self.questions.remove(position))
    }

    pub fn question(&self, question_id: &QuestionId) -> Option<&Question> {
        self.questions
            .iter()
            .find(|question| &question.question_id == question_id)
    }

    pub fn required_question_ids(&self) -> BTreeSet<&QuestionId> {
        self.questions
            .iter()
            .filter(|question| question.is_required)
            .map(|question| &question.question_id)
            .collect()
    }

    /// Display order by `order_index`; equal indexes keep insertion order.
    pub fn ordered_questions(&self) -> Vec<&Question> {
        let mut ordered: Vec<&Question> = self.questions.iter().collect();
        ordered.sort_by_key(|question| question.order_index);
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap()
    }

    fn free_text(text: &str, order_index: i32, is_required: bool) -> QuestionDraft {
        QuestionDraft {
            question_text: text.to_string(),
            question_type: QuestionType::FreeText,
            options: None,
            order_index,
            is_required,
        }
    }

    fn questionnaire() -> Questionnaire {
        Questionnaire::new(
            "Quarterly pulse",
            "How is the team doing?",
            UserId::parse("root").unwrap(),
            now(),
        )
        .unwrap()
    }

    #[test]
    fn new_questionnaires_are_active_but_not_assignable() {
        let questionnaire = questionnaire();
        assert!(questionnaire.is_active);
        assert!(!questionnaire.is_assignable());
    }

    #[test]
    fn short_titles_are_rejected() {
        let result = Questionnaire::new("Pulse", "", UserId::parse("root").unwrap(), now());
        assert!(result.is_ok());
        let result = Questionnaire::new("Poll", "", UserId::parse("root").unwrap(), now());
        assert_eq!(
            result.err(),
            Some(ValidationError::TooShort {
                field: "title",
                min: TITLE_MIN
            })
        );
    }

    #[test]
    fn question_ids_survive_edits() {
        let mut questionnaire = questionnaire();
        let added = questionnaire
            .add_question(free_text("What went well?", 1, true), now())
            .unwrap();

        let replaced = questionnaire
            .replace_question(&added.question_id, free_text("What went really well?", 4, false), now())
            .unwrap()
            .expect("question exists");

        assert_eq!(replaced.question_id, added.question_id);
        assert_eq!(replaced.order_index, 4);
        assert!(!replaced.is_required);
        assert_eq!(questionnaire.questions.len(), 1);
    }

    #[test]
    fn ordering_follows_order_index_and_keeps_ties_stable() {
        let mut questionnaire = questionnaire();
        let late = questionnaire.add_question(free_text("Third question", 3, false), now()).unwrap();
        let first_tie = questionnaire.add_question(free_text("First tie question", 1, false), now()).unwrap();
        let second_tie = questionnaire.add_question(free_text("Second tie question", 1, false), now()).unwrap();

        let ordered: Vec<_> = questionnaire
            .ordered_questions()
            .into_iter()
            .map(|question| question.question_id.clone())
            .collect();
        assert_eq!(ordered, vec![first_tie.question_id, second_tie.question_id, late.question_id]);
    }

    #[test]
    fn options_must_match_question_type() {
        let mut questionnaire = questionnaire();
        let missing_choices = QuestionDraft {
            question_text: "Pick a colour".to_string(),
            question_type: QuestionType::MultipleChoice,
            options: None,
            order_index: 0,
            is_required: false,
        };
        assert!(matches!(
            questionnaire.add_question(missing_choices, now()),
            Err(ValidationError::InvalidOptions { .. })
        ));

        let inverted_scale = QuestionDraft {
            question_text: "Rate your week".to_string(),
            question_type: QuestionType::LikertScale,
            options: Some(QuestionOptions::Scale {
                min: 5,
                max: 1,
                labels: Vec::new(),
            }),
            order_index: 0,
            is_required: false,
        };
        assert!(questionnaire.add_question(inverted_scale, now()).is_err());
        assert!(questionnaire.questions.is_empty());
    }

    #[test]
    fn removing_unknown_question_is_none() {
        let mut questionnaire = questionnaire();
        assert!(questionnaire
            .remove_question(&QuestionId::generate(), now())
            .is_none());
    }

    #[test]
    fn question_type_parses_wire_names() {
        assert_eq!(QuestionType::parse("yes_no"), Ok(QuestionType::YesNo));
        assert!(QuestionType::parse("essay").is_err());
    }
}
