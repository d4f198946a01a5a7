use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clock::Clock;
use crate::domain::{Question, QuestionDraft, QuestionId, Questionnaire, QuestionnaireId, UserId};
use crate::error::ServiceError;
use crate::identity::Principal;
use crate::repository::{Page, PageRequest, QuestionnaireRepository};

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuestionnaire {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionnaireChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuestionnaireStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

pub struct QuestionnaireService {
    questionnaires: Arc<dyn QuestionnaireRepository>,
    clock: Arc<dyn Clock>,
}

impl QuestionnaireService {
    pub fn new(questionnaires: Arc<dyn QuestionnaireRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            questionnaires,
            clock,
        }
    }

    pub fn create(
        &self,
        caller: &Principal,
        request: NewQuestionnaire,
    ) -> Result<Questionnaire, ServiceError> {
        let questionnaire = Questionnaire::new(
            &request.title,
            &request.description,
            caller.subject.clone(),
            self.clock.now(),
        )?;
        let stored = self.questionnaires.insert(questionnaire)?;
        info!(questionnaire = %stored.id, "questionnaire created");
        Ok(stored)
    }

    pub fn get(&self, id: &QuestionnaireId) -> Result<Questionnaire, ServiceError> {
        self.questionnaires
            .fetch(id)?
            .ok_or_else(|| ServiceError::not_found("questionnaire"))
    }

    pub fn list(
        &self,
        page: PageRequest,
        active_only: bool,
    ) -> Result<Page<Questionnaire>, ServiceError> {
        Ok(page.slice(self.questionnaires.list(active_only)?))
    }

    pub fn list_by_creator(&self, creator: &UserId) -> Result<Vec<Questionnaire>, ServiceError> {
        Ok(self.questionnaires.list_by_creator(creator)?)
    }

    pub fn update(
        &self,
        id: &QuestionnaireId,
        changes: QuestionnaireChanges,
    ) -> Result<Questionnaire, ServiceError> {
        let mut questionnaire = self.get(id)?;
        questionnaire.apply_changes(
            changes.title.as_deref(),
            changes.description.as_deref(),
            changes.is_active,
            self.clock.now(),
        )?;
        self.questionnaires.update(questionnaire.clone())?;
        info!(questionnaire = %id, "questionnaire updated");
        Ok(questionnaire)
    }

    /// Soft delete. Existing bindings keep referencing the questionnaire.
    pub fn deactivate(&self, id: &QuestionnaireId) -> Result<(), ServiceError> {
        let mut questionnaire = self.get(id)?;
        questionnaire.deactivate(self.clock.now());
        self.questionnaires.update(questionnaire)?;
        info!(questionnaire = %id, "questionnaire deactivated");
        Ok(())
    }

    pub fn add_question(
        &self,
        id: &QuestionnaireId,
        draft: QuestionDraft,
    ) -> Result<Question, ServiceError> {
        let mut questionnaire = self.get(id)?;
        let question = questionnaire.add_question(draft, self.clock.now())?;
        self.questionnaires.update(questionnaire)?;
        info!(questionnaire = %id, question = %question.question_id, "question added");
        Ok(question)
    }

    pub fn update_question(
        &self,
        id: &QuestionnaireId,
        question_id: &QuestionId,
        draft: QuestionDraft,
    ) -> Result<Question, ServiceError> {
        let mut questionnaire = self.get(id)?;
        let question = questionnaire
            .replace_question(question_id, draft, self.clock.now())?
            .ok_or_else(|| ServiceError::not_found("question"))?;
        self.questionnaires.update(questionnaire)?;
        info!(questionnaire = %id, question = %question_id, "question updated");
        Ok(question)
    }

    pub fn remove_question(
        &self,
        id: &QuestionnaireId,
        question_id: &QuestionId,
    ) -> Result<(), ServiceError> {
        let mut questionnaire = self.get(id)?;
        questionnaire
            .remove_question(question_id, self.clock.now())
            .ok_or_else(|| ServiceError::not_found("question"))?;
        self.questionnaires.update(questionnaire)?;
        info!(questionnaire = %id, question = %question_id, "question removed");
        Ok(())
    }

    pub fn stats(&self) -> Result<QuestionnaireStats, ServiceError> {
        let total = self.questionnaires.count(false)?;
        let active = self.questionnaires.count(true)?;
        Ok(QuestionnaireStats {
            total,
            active,
            inactive: total.saturating_sub(active),
        })
    }

    /// Loads a questionnaire that can back a new binding: active with at least one question.
    pub fn assignable(&self, id: &QuestionnaireId) -> Result<Questionnaire, ServiceError> {
        load_assignable(self.questionnaires.as_ref(), id)
    }
}

pub(crate) fn load_assignable(
    questionnaires: &dyn QuestionnaireRepository,
    id: &QuestionnaireId,
) -> Result<Questionnaire, ServiceError> {
    let questionnaire = questionnaires
        .fetch(id)?
        .ok_or_else(|| ServiceError::not_found("questionnaire"))?;
    if !questionnaire.is_active {
        return Err(ServiceError::invalid_state("questionnaire is not active"));
    }
    if questionnaire.questions.is_empty() {
        return Err(ServiceError::invalid_state("questionnaire has no questions"));
    }
    Ok(questionnaire)
}
