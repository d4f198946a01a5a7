use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::assignments::{AssignmentService, NewAssignments, ResponseInput};
use crate::clock::FixedClock;
use crate::companies::{CompanyService, NewBinding};
use crate::directory::{DirectoryService, NewUserMetadata};
use crate::domain::{
    AssignmentId, AssignmentStatus, CompanyId, CompanyQuestionnaire, CompanyQuestionnaireId,
    QuestionDraft, QuestionId, QuestionOptions, QuestionType, ResponseValue, UserId,
    UserQuestionnaireAssignment,
};
use crate::identity::{Principal, Role};
use crate::questionnaires::{NewQuestionnaire, QuestionnaireService};
use crate::repository::{AssignmentRepository, Repositories, RepositoryError};

pub(super) struct Tenant {
    pub repositories: Repositories,
    pub clock: Arc<FixedClock>,
    pub service: Arc<AssignmentService>,
    pub acme: CompanyId,
    pub globex: CompanyId,
    pub binding: CompanyQuestionnaire,
    pub globex_binding: CompanyQuestionnaire,
    pub required: Vec<QuestionId>,
    pub optional: QuestionId,
}

pub(super) fn user(raw: &str) -> UserId {
    UserId::parse(raw).unwrap()
}

pub(super) fn admin() -> Principal {
    Principal::new(user("root-admin"), [Role::SuperAdmin])
}

pub(super) fn employee(raw: &str) -> Principal {
    Principal::new(user(raw), [Role::Employee])
}

pub(super) fn supervisor(raw: &str) -> Principal {
    Principal::new(user(raw), [Role::Supervisor, Role::Employee])
}

pub(super) fn mid_period() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 10, 14, 0, 0).unwrap()
}

/// Acme (lead-1 supervising emp-1 and emp-2) and Globex (emp-9), each bound to the same
/// questionnaire for Q1 2025. The questionnaire has two required questions and one optional.
pub(super) fn tenant() -> Tenant {
    let repositories = Repositories::in_memory();
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap()));
    let companies = CompanyService::new(&repositories, clock.clone());
    let questionnaires =
        QuestionnaireService::new(repositories.questionnaires.clone(), clock.clone());
    let directory = DirectoryService::new(&repositories, clock.clone());

    let acme = companies.create_company("Acme Corp").unwrap().id;
    let globex = companies.create_company("Globex Inc").unwrap().id;

    let questionnaire = questionnaires
        .create(
            &admin(),
            NewQuestionnaire {
                title: "Quarterly engagement".to_string(),
                description: "Q1 pulse".to_string(),
            },
        )
        .unwrap();
    let mood = questionnaires
        .add_question(
            &questionnaire.id,
            QuestionDraft {
                question_text: "How satisfied are you?".to_string(),
                question_type: QuestionType::LikertScale,
                options: Some(QuestionOptions::Scale {
                    min: 1,
                    max: 5,
                    labels: Vec::new(),
                }),
                order_index: 0,
                is_required: true,
            },
        )
        .unwrap();
    let recommend = questionnaires
        .add_question(
            &questionnaire.id,
            QuestionDraft {
                question_text: "Would you recommend Acme?".to_string(),
                question_type: QuestionType::YesNo,
                options: None,
                order_index: 1,
                is_required: true,
            },
        )
        .unwrap();
    let comments = questionnaires
        .add_question(
            &questionnaire.id,
            QuestionDraft {
                question_text: "Anything else to share?".to_string(),
                question_type: QuestionType::FreeText,
                options: None,
                order_index: 2,
                is_required: false,
            },
        )
        .unwrap();

    let bind = |company: &CompanyId| {
        companies
            .assign_questionnaire(
                &admin(),
                company,
                NewBinding {
                    questionnaire_id: questionnaire.id.to_string(),
                    period_start: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                    period_end: Utc.with_ymd_and_hms(2025, 3, 31, 23, 59, 59).unwrap(),
                },
            )
            .unwrap()
    };
    let binding = bind(&acme);
    let globex_binding = bind(&globex);

    for (user_id, company, lead, department) in [
        ("lead-1", &acme, None, Some("Sales")),
        ("emp-1", &acme, Some("lead-1"), Some("Sales")),
        ("emp-2", &acme, Some("lead-1"), None),
        ("emp-9", &globex, None, None),
    ] {
        directory
            .create(NewUserMetadata {
                user_id: user_id.to_string(),
                company_id: company.to_string(),
                supervisor_id: lead.map(str::to_string),
                department: department.map(str::to_string),
            })
            .unwrap();
    }

    clock.set(mid_period());
    let service = Arc::new(AssignmentService::new(&repositories, clock.clone()));
    Tenant {
        repositories,
        clock,
        service,
        acme,
        globex,
        binding,
        globex_binding,
        required: vec![mood.question_id, recommend.question_id],
        optional: comments.question_id,
    }
}

impl Tenant {
    pub(super) fn assign(&self, users: &[&str]) -> Vec<UserQuestionnaireAssignment> {
        self.service
            .assign_to_users(&supervisor("lead-1"), &self.binding.id, targets(users))
            .unwrap()
            .assignments
    }

    pub(super) fn assigned_to(&self, raw: &str) -> AssignmentId {
        self.assign(&[raw]).remove(0).id
    }

    pub(super) fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// A second service over the same stores whose first assignment write is preceded by
    /// `concurrent`, as if another request finished between its load and its store.
    pub(super) fn service_overtaken_by<F>(&self, concurrent: F) -> AssignmentService
    where
        F: FnOnce() + Send + 'static,
    {
        let repositories = Repositories {
            assignments: Arc::new(OvertakenStore {
                inner: self.repositories.assignments.clone(),
                concurrent: Mutex::new(Some(Box::new(concurrent))),
            }),
            ..self.repositories.clone()
        };
        AssignmentService::new(&repositories, self.clock.clone())
    }
}

type ConcurrentWrite = Box<dyn FnOnce() + Send>;

struct OvertakenStore {
    inner: Arc<dyn AssignmentRepository>,
    concurrent: Mutex<Option<ConcurrentWrite>>,
}

impl AssignmentRepository for OvertakenStore {
    fn insert(
        &self,
        assignment: UserQuestionnaireAssignment,
    ) -> Result<UserQuestionnaireAssignment, RepositoryError> {
        self.inner.insert(assignment)
    }

    fn update(
        &self,
        assignment: UserQuestionnaireAssignment,
    ) -> Result<UserQuestionnaireAssignment, RepositoryError> {
        let concurrent = self.concurrent.lock().unwrap().take();
        if let Some(write) = concurrent {
            write();
        }
        self.inner.update(assignment)
    }

    fn fetch(
        &self,
        id: &AssignmentId,
    ) -> Result<Option<UserQuestionnaireAssignment>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn find_for_user(
        &self,
        user: &UserId,
        binding: &CompanyQuestionnaireId,
    ) -> Result<Option<UserQuestionnaireAssignment>, RepositoryError> {
        self.inner.find_for_user(user, binding)
    }

    fn list_by_user(
        &self,
        user: &UserId,
        status: Option<AssignmentStatus>,
    ) -> Result<Vec<UserQuestionnaireAssignment>, RepositoryError> {
        self.inner.list_by_user(user, status)
    }

    fn list_by_binding(
        &self,
        binding: &CompanyQuestionnaireId,
    ) -> Result<Vec<UserQuestionnaireAssignment>, RepositoryError> {
        self.inner.list_by_binding(binding)
    }

    fn list_by_users(
        &self,
        users: &[UserId],
    ) -> Result<Vec<UserQuestionnaireAssignment>, RepositoryError> {
        self.inner.list_by_users(users)
    }

    fn delete(&self, id: &AssignmentId) -> Result<bool, RepositoryError> {
        self.inner.delete(id)
    }
}

pub(super) fn targets(users: &[&str]) -> NewAssignments {
    NewAssignments {
        user_ids: users.iter().map(|user| user.to_string()).collect(),
    }
}

pub(super) fn answer(question_id: &QuestionId, value: ResponseValue) -> ResponseInput {
    ResponseInput {
        question_id: question_id.to_string(),
        response_value: value,
    }
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub(super) fn json_request(method: &str, uri: &str, body: Value) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

pub(super) fn empty_request(method: &str, uri: &str) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
