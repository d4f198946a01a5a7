//! Storage contracts consumed by the services, plus the in-memory adapter.
//!
//! The two uniqueness rules (one assignment per user and binding, no overlapping active
//! bindings for a company/questionnaire pair) are storage constraints: implementations must
//! check and write under one critical section and answer [`RepositoryError::Conflict`].

mod memory;

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{
    AssignmentId, AssignmentStatus, Company, CompanyId, CompanyQuestionnaire,
    CompanyQuestionnaireId, Questionnaire, QuestionnaireId, UserId, UserMetadata,
    UserQuestionnaireAssignment,
};

pub use memory::{
    InMemoryAssignmentRepository, InMemoryCompanyQuestionnaireRepository,
    InMemoryCompanyRepository, InMemoryQuestionnaireRepository, InMemoryUserMetadataRepository,
};

pub trait CompanyRepository: Send + Sync {
    fn insert(&self, company: Company) -> Result<Company, RepositoryError>;
    fn update(&self, company: Company) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError>;
    /// Newest first.
    fn list(&self) -> Result<Vec<Company>, RepositoryError>;
    fn delete(&self, id: &CompanyId) -> Result<bool, RepositoryError>;
}

pub trait QuestionnaireRepository: Send + Sync {
    fn insert(&self, questionnaire: Questionnaire) -> Result<Questionnaire, RepositoryError>;
    fn update(&self, questionnaire: Questionnaire) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &QuestionnaireId) -> Result<Option<Questionnaire>, RepositoryError>;
    /// Newest first, optionally restricted to active questionnaires.
    fn list(&self, active_only: bool) -> Result<Vec<Questionnaire>, RepositoryError>;
    fn list_by_creator(&self, creator: &UserId) -> Result<Vec<Questionnaire>, RepositoryError>;
    fn count(&self, active_only: bool) -> Result<usize, RepositoryError>;
}

pub trait CompanyQuestionnaireRepository: Send + Sync {
    /// Fails with `Conflict` when an active binding for the same pair overlaps the period.
    fn insert(
        &self,
        binding: CompanyQuestionnaire,
    ) -> Result<CompanyQuestionnaire, RepositoryError>;
    /// Same overlap rule as `insert`, ignoring the binding being replaced.
    fn update(&self, binding: CompanyQuestionnaire) -> Result<(), RepositoryError>;
    fn fetch(
        &self,
        id: &CompanyQuestionnaireId,
    ) -> Result<Option<CompanyQuestionnaire>, RepositoryError>;
    /// Most recently assigned first.
    fn list_by_company(
        &self,
        company: &CompanyId,
        active_only: bool,
    ) -> Result<Vec<CompanyQuestionnaire>, RepositoryError>;
}

pub trait AssignmentRepository: Send + Sync {
    /// Fails with `Conflict` when the user already holds an assignment for the binding.
    fn insert(
        &self,
        assignment: UserQuestionnaireAssignment,
    ) -> Result<UserQuestionnaireAssignment, RepositoryError>;
    /// Compare-and-swap on `revision`: fails with `Stale` when another write landed since
    /// `assignment` was fetched. Returns the stored copy with its new revision.
    fn update(
        &self,
        assignment: UserQuestionnaireAssignment,
    ) -> Result<UserQuestionnaireAssignment, RepositoryError>;
    fn fetch(
        &self,
        id: &AssignmentId,
    ) -> Result<Option<UserQuestionnaireAssignment>, RepositoryError>;
    fn find_for_user(
        &self,
        user: &UserId,
        binding: &CompanyQuestionnaireId,
    ) -> Result<Option<UserQuestionnaireAssignment>, RepositoryError>;
    /// Most recently assigned first.
    fn list_by_user(
        &self,
        user: &UserId,
        status: Option<AssignmentStatus>,
    ) -> Result<Vec<UserQuestionnaireAssignment>, RepositoryError>;
    fn list_by_binding(
        &self,
        binding: &CompanyQuestionnaireId,
    ) -> Result<Vec<UserQuestionnaireAssignment>, RepositoryError>;
    fn list_by_users(
        &self,
        users: &[UserId],
    ) -> Result<Vec<UserQuestionnaireAssignment>, RepositoryError>;
    fn delete(&self, id: &AssignmentId) -> Result<bool, RepositoryError>;
}

pub trait UserMetadataRepository: Send + Sync {
    fn insert(&self, metadata: UserMetadata) -> Result<UserMetadata, RepositoryError>;
    fn update(&self, metadata: UserMetadata) -> Result<(), RepositoryError>;
    fn fetch(&self, user: &UserId) -> Result<Option<UserMetadata>, RepositoryError>;
    /// Ordered by user id.
    fn list_by_company(&self, company: &CompanyId) -> Result<Vec<UserMetadata>, RepositoryError>;
    fn list_by_supervisor(&self, supervisor: &UserId)
        -> Result<Vec<UserMetadata>, RepositoryError>;
    fn delete(&self, user: &UserId) -> Result<bool, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record was modified concurrently")]
    Stale,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// The full set of stores a deployment wires into the services.
#[derive(Clone)]
pub struct Repositories {
    pub companies: Arc<dyn CompanyRepository>,
    pub questionnaires: Arc<dyn QuestionnaireRepository>,
    pub bindings: Arc<dyn CompanyQuestionnaireRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub users: Arc<dyn UserMetadataRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            companies: Arc::new(InMemoryCompanyRepository::default()),
            questionnaires: Arc::new(InMemoryQuestionnaireRepository::default()),
            bindings: Arc::new(InMemoryCompanyQuestionnaireRepository::default()),
            assignments: Arc::new(InMemoryAssignmentRepository::default()),
            users: Arc::new(InMemoryUserMetadataRepository::default()),
        }
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One-based page request. Out-of-range values are clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn normalized(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = match page {
            Some(page) if page > 0 => page.min(u32::MAX as i64) as u32,
            _ => 1,
        };
        let page_size = match page_size {
            Some(size) if size > MAX_PAGE_SIZE as i64 => MAX_PAGE_SIZE,
            Some(size) if size > 0 => size as u32,
            _ => DEFAULT_PAGE_SIZE,
        };
        Self { page, page_size }
    }

    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let skip = (self.page as usize - 1).saturating_mul(self.page_size as usize);
        let items = items
            .into_iter()
            .skip(skip)
            .take(self.page_size as usize)
            .collect();
        Page {
            items,
            total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::normalized(None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_requests_are_clamped() {
        assert_eq!(
            PageRequest::normalized(Some(0), Some(0)),
            PageRequest {
                page: 1,
                page_size: DEFAULT_PAGE_SIZE
            }
        );
        assert_eq!(
            PageRequest::normalized(Some(-3), Some(500)),
            PageRequest {
                page: 1,
                page_size: MAX_PAGE_SIZE
            }
        );
        assert_eq!(
            PageRequest::normalized(Some(2), Some(25)),
            PageRequest {
                page: 2,
                page_size: 25
            }
        );
    }

    #[test]
    fn slicing_reports_the_unpaged_total() {
        let page = PageRequest::normalized(Some(2), Some(3)).slice((1..=8).collect::<Vec<_>>());
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 8);
        assert_eq!(page.total_pages(), 3);

        let past_end = PageRequest::normalized(Some(9), Some(3)).slice(vec![1, 2]);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 2);
    }
}
