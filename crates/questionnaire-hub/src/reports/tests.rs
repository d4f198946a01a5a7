use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::service::ReportService;
use crate::assignments::{AssignmentService, NewAssignments, ResponseInput};
use crate::clock::FixedClock;
use crate::companies::{CompanyService, NewBinding};
use crate::directory::{DirectoryService, NewUserMetadata};
use crate::domain::{
    AssignmentId, CompanyId, CompanyQuestionnaire, QuestionDraft, QuestionId, QuestionType,
    QuestionnaireId, ResponseValue, UserId, UNASSIGNED_DEPARTMENT,
};
use crate::error::ServiceError;
use crate::identity::{Principal, Role};
use crate::questionnaires::{NewQuestionnaire, QuestionnaireService};
use crate::repository::Repositories;

struct Scenario {
    clock: Arc<FixedClock>,
    companies: CompanyService,
    assignments: AssignmentService,
    reports: ReportService,
    questionnaire: QuestionnaireId,
    question: QuestionId,
    acme: CompanyId,
    globex: CompanyId,
}

fn admin() -> Principal {
    Principal::new(UserId::parse("root-admin").unwrap(), [Role::SuperAdmin])
}

fn employee(raw: &str) -> Principal {
    Principal::new(UserId::parse(raw).unwrap(), [Role::Employee])
}

fn q1_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn scenario() -> Scenario {
    let repositories = Repositories::in_memory();
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 12, 20, 9, 0, 0).unwrap()));
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
                description: String::new(),
            },
        )
        .unwrap()
        .id;
    let question = questionnaires
        .add_question(
            &questionnaire,
            QuestionDraft {
                question_text: "Would you recommend Acme?".to_string(),
                question_type: QuestionType::YesNo,
                options: None,
                order_index: 0,
                is_required: true,
            },
        )
        .unwrap()
        .question_id;

    directory
        .create(NewUserMetadata {
            user_id: "acme-lead".to_string(),
            company_id: acme.to_string(),
            supervisor_id: None,
            department: Some("Sales".to_string()),
        })
        .unwrap();
    for index in 0..10 {
        let department = match index % 3 {
            0 => Some("Sales".to_string()),
            1 => Some("Engineering".to_string()),
            _ => None,
        };
        directory
            .create(NewUserMetadata {
                user_id: format!("emp-{index}"),
                company_id: acme.to_string(),
                supervisor_id: Some("acme-lead".to_string()),
                department,
            })
            .unwrap();
    }
    directory
        .create(NewUserMetadata {
            user_id: "globex-lead".to_string(),
            company_id: globex.to_string(),
            supervisor_id: None,
            department: None,
        })
        .unwrap();

    Scenario {
        assignments: AssignmentService::new(&repositories, clock.clone()),
        reports: ReportService::new(&repositories),
        clock,
        companies,
        questionnaire,
        question,
        acme,
        globex,
    }
}

impl Scenario {
    fn bind(&self, company: &CompanyId, start: DateTime<Utc>) -> CompanyQuestionnaire {
        self.companies
            .assign_questionnaire(
                &admin(),
                company,
                NewBinding {
                    questionnaire_id: self.questionnaire.to_string(),
                    period_start: start,
                    period_end: start + Duration::days(89),
                },
            )
            .unwrap()
    }

    fn assign(&self, binding: &CompanyQuestionnaire, users: &[String]) -> Vec<AssignmentId> {
        self.assignments
            .assign_to_users(
                &admin(),
                &binding.id,
                NewAssignments {
                    user_ids: users.to_vec(),
                },
            )
            .unwrap()
            .assignments
            .into_iter()
            .map(|assignment| assignment.id)
            .collect()
    }

    fn answer(&self, user: &str, id: &AssignmentId) {
        self.assignments
            .save_response(
                &employee(user),
                id,
                ResponseInput {
                    question_id: self.question.to_string(),
                    response_value: ResponseValue::Boolean(true),
                },
            )
            .unwrap();
    }

    fn complete(&self, user: &str, id: &AssignmentId, minutes: i64) {
        self.answer(user, id);
        self.clock.advance(Duration::minutes(minutes));
        self.assignments.submit(&employee(user), id).unwrap();
    }
}

fn staff(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|index| format!("emp-{index}")).collect()
}

#[test]
fn completion_metrics_follow_the_status_breakdown() {
    let scenario = scenario();
    let binding = scenario.bind(&scenario.acme, q1_start());
    scenario.clock.set(q1_start() + Duration::days(10));
    let ids = scenario.assign(&binding, &staff(0..10));

    for (index, id) in ids.iter().enumerate().take(4) {
        scenario.complete(&format!("emp-{index}"), id, 10 * (index as i64 + 1));
    }
    for (index, id) in ids.iter().enumerate().skip(4).take(3) {
        scenario.answer(&format!("emp-{index}"), id);
    }

    let metrics = scenario
        .reports
        .completion_metrics(&admin(), &binding.id)
        .unwrap();

    assert_eq!(metrics.company_name, "Acme Corp");
    assert_eq!(metrics.questionnaire_title, "Quarterly engagement");
    assert_eq!(metrics.period_start, "2025-01-01");
    assert_eq!(metrics.period_end, "2025-03-31");
    assert_eq!(metrics.total_employees, 11);
    assert_eq!(metrics.assigned, 10);
    assert_eq!(metrics.completed, 4);
    assert_eq!(metrics.in_progress, 3);
    assert_eq!(metrics.pending, 3);
    assert_eq!(metrics.not_started, 3);
    assert_eq!(metrics.completion_percentage, 40.0);
    assert_eq!(metrics.average_time_to_complete_minutes, 25.0);

    let departments: Vec<(&str, usize, usize)> = metrics
        .completion_by_department
        .iter()
        .map(|entry| (entry.department.as_str(), entry.completed, entry.total))
        .collect();
    assert_eq!(
        departments,
        vec![
            ("Engineering", 1, 3),
            ("Sales", 2, 4),
            (UNASSIGNED_DEPARTMENT, 1, 3),
        ]
    );
}

#[test]
fn empty_bindings_report_zeroes() {
    let scenario = scenario();
    let binding = scenario.bind(&scenario.globex, q1_start());

    let metrics = scenario
        .reports
        .completion_metrics(&admin(), &binding.id)
        .unwrap();
    assert_eq!(metrics.assigned, 0);
    assert_eq!(metrics.completion_percentage, 0.0);
    assert_eq!(metrics.average_time_to_complete_minutes, 0.0);
    assert!(metrics.completion_by_department.is_empty());
}

#[test]
fn overview_weights_bindings_by_assignment_count() {
    let scenario = scenario();
    let first = scenario.bind(&scenario.acme, q1_start());
    let second = scenario.bind(&scenario.acme, q1_start() + Duration::days(90));
    scenario.clock.set(q1_start() + Duration::days(5));

    let first_ids = scenario.assign(&first, &staff(0..8));
    for (index, id) in first_ids.iter().enumerate().take(2) {
        scenario.complete(&format!("emp-{index}"), id, 5);
    }
    let second_ids = scenario.assign(&second, &staff(0..2));
    scenario.clock.set(q1_start() + Duration::days(95));
    for (index, id) in second_ids.iter().enumerate() {
        scenario.complete(&format!("emp-{index}"), id, 5);
    }
    scenario
        .companies
        .deactivate_binding(&admin(), &first.id)
        .unwrap();

    let overview = scenario
        .reports
        .company_overview(&admin(), &scenario.acme)
        .unwrap();
    assert_eq!(overview.total_questionnaires, 2);
    assert_eq!(overview.active_questionnaires, 1);
    assert_eq!(overview.total_assignments, 10);
    assert_eq!(overview.completed_assignments, 4);
    assert_eq!(overview.overall_completion_percentage, 40.0);
    assert_eq!(overview.questionnaire_breakdown.len(), 2);
}

#[test]
fn employee_progress_covers_every_member() {
    let scenario = scenario();
    let binding = scenario.bind(&scenario.acme, q1_start());
    scenario.clock.set(q1_start() + Duration::days(1));
    let ids = scenario.assign(&binding, &staff(0..2));
    scenario.complete("emp-0", &ids[0], 3);

    let rows = scenario
        .reports
        .employee_progress(&admin(), &scenario.acme)
        .unwrap();
    assert_eq!(rows.len(), 11);

    let first = rows.iter().find(|row| row.user_id.as_str() == "emp-0").unwrap();
    assert_eq!((first.total_assigned, first.completed), (1, 1));
    assert_eq!(first.completion_rate, 100.0);

    let second = rows.iter().find(|row| row.user_id.as_str() == "emp-1").unwrap();
    assert_eq!((second.total_assigned, second.pending), (1, 1));
    assert_eq!(second.completion_rate, 0.0);

    let lead = rows.iter().find(|row| row.user_id.as_str() == "acme-lead").unwrap();
    assert_eq!(lead.total_assigned, 0);
    assert_eq!(lead.completion_rate, 0.0);
}

#[test]
fn reports_are_tenant_isolated() {
    let scenario = scenario();
    let binding = scenario.bind(&scenario.acme, q1_start());
    let outsider = Principal::new(UserId::parse("globex-lead").unwrap(), [Role::Supervisor]);

    assert!(matches!(
        scenario.reports.completion_metrics(&outsider, &binding.id),
        Err(ServiceError::Unauthorized { .. })
    ));
    assert!(matches!(
        scenario.reports.company_overview(&outsider, &scenario.acme),
        Err(ServiceError::Unauthorized { .. })
    ));
    assert!(matches!(
        scenario.reports.employee_progress(&outsider, &scenario.acme),
        Err(ServiceError::Unauthorized { .. })
    ));

    let insider = Principal::new(UserId::parse("acme-lead").unwrap(), [Role::Supervisor]);
    assert!(scenario.reports.company_overview(&insider, &scenario.acme).is_ok());
}

#[test]
fn unknown_targets_are_not_found() {
    let scenario = scenario();
    assert!(matches!(
        scenario
            .reports
            .company_overview(&admin(), &CompanyId::generate()),
        Err(ServiceError::NotFound { entity: "company" })
    ));
    assert!(matches!(
        scenario
            .reports
            .completion_metrics(&admin(), &crate::domain::CompanyQuestionnaireId::generate()),
        Err(ServiceError::NotFound { .. })
    ));
}
