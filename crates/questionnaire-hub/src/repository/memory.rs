use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{
    AssignmentRepository, CompanyQuestionnaireRepository, CompanyRepository,
    QuestionnaireRepository, RepositoryError, UserMetadataRepository,
};
use crate::domain::{
    AssignmentId, AssignmentStatus, Company, CompanyId, CompanyQuestionnaire,
    CompanyQuestionnaireId, Questionnaire, QuestionnaireId, UserId, UserMetadata,
    UserQuestionnaireAssignment,
};

#[derive(Default, Clone)]
pub struct InMemoryCompanyRepository {
    records: Arc<Mutex<HashMap<CompanyId, Company>>>,
}

impl CompanyRepository for InMemoryCompanyRepository {
    fn insert(&self, company: Company) -> Result<Company, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&company.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(company.id.clone(), company.clone());
        Ok(company)
    }

    fn update(&self, company: Company) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get_mut(&company.id) {
            Some(existing) => {
                *existing = company;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Company>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut companies: Vec<Company> = guard.values().cloned().collect();
        companies.sort_by_key(|company| Reverse(company.created_at));
        Ok(companies)
    }

    fn delete(&self, id: &CompanyId) -> Result<bool, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.remove(id).is_some())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryQuestionnaireRepository {
    records: Arc<Mutex<HashMap<QuestionnaireId, Questionnaire>>>,
}

impl InMemoryQuestionnaireRepository {
    fn collect<F>(&self, keep: F) -> Vec<Questionnaire>
    where
        F: Fn(&Questionnaire) -> bool,
    {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut questionnaires: Vec<Questionnaire> =
            guard.values().filter(|questionnaire| keep(*questionnaire)).cloned().collect();
        questionnaires.sort_by_key(|questionnaire| Reverse(questionnaire.created_at));
        questionnaires
    }
}

impl QuestionnaireRepository for InMemoryQuestionnaireRepository {
    fn insert(&self, questionnaire: Questionnaire) -> Result<Questionnaire, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&questionnaire.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(questionnaire.id.clone(), questionnaire.clone());
        Ok(questionnaire)
    }

    fn update(&self, questionnaire: Questionnaire) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get_mut(&questionnaire.id) {
            Some(existing) => {
                *existing = questionnaire;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &QuestionnaireId) -> Result<Option<Questionnaire>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self, active_only: bool) -> Result<Vec<Questionnaire>, RepositoryError> {
        Ok(self.collect(|questionnaire| !active_only || questionnaire.is_active))
    }

    fn list_by_creator(&self, creator: &UserId) -> Result<Vec<Questionnaire>, RepositoryError> {
        Ok(self.collect(|questionnaire| &questionnaire.created_by == creator))
    }

    fn count(&self, active_only: bool) -> Result<usize, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|questionnaire| !active_only || questionnaire.is_active)
            .count())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCompanyQuestionnaireRepository {
    records: Arc<Mutex<HashMap<CompanyQuestionnaireId, CompanyQuestionnaire>>>,
}

impl CompanyQuestionnaireRepository for InMemoryCompanyQuestionnaireRepository {
    fn insert(
        &self,
        binding: CompanyQuestionnaire,
    ) -> Result<CompanyQuestionnaire, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&binding.id)
            || guard.values().any(|existing| existing.collides_with(&binding))
        {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(binding.id.clone(), binding.clone());
        Ok(binding)
    }

    fn update(&self, binding: CompanyQuestionnaire) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&binding.id) {
            return Err(RepositoryError::NotFound);
        }
        if guard.values().any(|existing| existing.collides_with(&binding)) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(binding.id.clone(), binding);
        Ok(())
    }

    fn fetch(
        &self,
        id: &CompanyQuestionnaireId,
    ) -> Result<Option<CompanyQuestionnaire>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_by_company(
        &self,
        company: &CompanyId,
        active_only: bool,
    ) -> Result<Vec<CompanyQuestionnaire>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut bindings: Vec<CompanyQuestionnaire> = guard
            .values()
            .filter(|binding| &binding.company_id == company)
            .filter(|binding| !active_only || binding.is_active)
            .cloned()
            .collect();
        bindings.sort_by_key(|binding| Reverse(binding.assigned_at));
        Ok(bindings)
    }
}

#[derive(Default)]
struct AssignmentTable {
    records: HashMap<AssignmentId, UserQuestionnaireAssignment>,
    by_user_and_binding: HashMap<(UserId, CompanyQuestionnaireId), AssignmentId>,
}

impl AssignmentTable {
    fn matching<F>(&self, keep: F) -> Vec<UserQuestionnaireAssignment>
    where
        F: Fn(&UserQuestionnaireAssignment) -> bool,
    {
        let mut assignments: Vec<UserQuestionnaireAssignment> =
            self.records.values().filter(|assignment| keep(*assignment)).cloned().collect();
        assignments.sort_by_key(|assignment| Reverse(assignment.assigned_at));
        assignments
    }
}

/// Keeps a unique index on `(user_id, company_questionnaire_id)`.
#[derive(Default, Clone)]
pub struct InMemoryAssignmentRepository {
    table: Arc<Mutex<AssignmentTable>>,
}

impl AssignmentRepository for InMemoryAssignmentRepository {
    fn insert(
        &self,
        assignment: UserQuestionnaireAssignment,
    ) -> Result<UserQuestionnaireAssignment, RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        let key = (
            assignment.user_id.clone(),
            assignment.company_questionnaire_id.clone(),
        );
        if guard.records.contains_key(&assignment.id)
            || guard.by_user_and_binding.contains_key(&key)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.by_user_and_binding.insert(key, assignment.id.clone());
        guard
            .records
            .insert(assignment.id.clone(), assignment.clone());
        Ok(assignment)
    }

    fn update(
        &self,
        mut assignment: UserQuestionnaireAssignment,
    ) -> Result<UserQuestionnaireAssignment, RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        let existing = guard
            .records
            .get_mut(&assignment.id)
            .ok_or(RepositoryError::NotFound)?;
        if existing.user_id != assignment.user_id
            || existing.company_questionnaire_id != assignment.company_questionnaire_id
        {
            return Err(RepositoryError::Conflict);
        }
        if existing.revision != assignment.revision {
            return Err(RepositoryError::Stale);
        }
        assignment.revision += 1;
        *existing = assignment.clone();
        Ok(assignment)
    }

    fn fetch(
        &self,
        id: &AssignmentId,
    ) -> Result<Option<UserQuestionnaireAssignment>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard.records.get(id).cloned())
    }

    fn find_for_user(
        &self,
        user: &UserId,
        binding: &CompanyQuestionnaireId,
    ) -> Result<Option<UserQuestionnaireAssignment>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard
            .by_user_and_binding
            .get(&(user.clone(), binding.clone()))
            .and_then(|id| guard.records.get(id))
            .cloned())
    }

    fn list_by_user(
        &self,
        user: &UserId,
        status: Option<AssignmentStatus>,
    ) -> Result<Vec<UserQuestionnaireAssignment>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard.matching(|assignment| {
            &assignment.user_id == user && status.map_or(true, |status| assignment.status == status)
        }))
    }

    fn list_by_binding(
        &self,
        binding: &CompanyQuestionnaireId,
    ) -> Result<Vec<UserQuestionnaireAssignment>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard.matching(|assignment| &assignment.company_questionnaire_id == binding))
    }

    fn list_by_users(
        &self,
        users: &[UserId],
    ) -> Result<Vec<UserQuestionnaireAssignment>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard.matching(|assignment| users.contains(&assignment.user_id)))
    }

    fn delete(&self, id: &AssignmentId) -> Result<bool, RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        match guard.records.remove(id) {
            Some(removed) => {
                guard
                    .by_user_and_binding
                    .remove(&(removed.user_id, removed.company_questionnaire_id));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default, Clone)]
pub struct InMemoryUserMetadataRepository {
    records: Arc<Mutex<HashMap<UserId, UserMetadata>>>,
}

impl InMemoryUserMetadataRepository {
    fn collect<F>(&self, keep: F) -> Vec<UserMetadata>
    where
        F: Fn(&UserMetadata) -> bool,
    {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut users: Vec<UserMetadata> = guard.values().filter(|metadata| keep(*metadata)).cloned().collect();
        users.sort_by(|left, right| left.user_id.cmp(&right.user_id));
        users
    }
}

impl UserMetadataRepository for InMemoryUserMetadataRepository {
    fn insert(&self, metadata: UserMetadata) -> Result<UserMetadata, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&metadata.user_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(metadata.user_id.clone(), metadata.clone());
        Ok(metadata)
    }

    fn update(&self, metadata: UserMetadata) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get_mut(&metadata.user_id) {
            Some(existing) => {
                *existing = metadata;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, user: &UserId) -> Result<Option<UserMetadata>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(user).cloned())
    }

    fn list_by_company(&self, company: &CompanyId) -> Result<Vec<UserMetadata>, RepositoryError> {
        Ok(self.collect(|metadata| &metadata.company_id == company))
    }

    fn list_by_supervisor(
        &self,
        supervisor: &UserId,
    ) -> Result<Vec<UserMetadata>, RepositoryError> {
        Ok(self.collect(|metadata| metadata.supervisor_id.as_ref() == Some(supervisor)))
    }

    fn delete(&self, user: &UserId) -> Result<bool, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.remove(user).is_some())
    }
}
