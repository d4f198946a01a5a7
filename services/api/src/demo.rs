use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use clap::Args;
use questionnaire_hub::assignments::{NewAssignments, ResponseInput};
use questionnaire_hub::clock::FixedClock;
use questionnaire_hub::companies::NewBinding;
use questionnaire_hub::directory::NewUserMetadata;
use questionnaire_hub::domain::{
    CompanyId, CompanyQuestionnaireId, QuestionDraft, QuestionId, QuestionOptions, QuestionType,
    ResponseValue, UserId, ValidationError, UNASSIGNED_DEPARTMENT,
};
use questionnaire_hub::error::{AppError, ServiceError};
use questionnaire_hub::identity::{Principal, Role};
use questionnaire_hub::questionnaires::NewQuestionnaire;
use questionnaire_hub::repository::Repositories;
use questionnaire_hub::Hub;

const DEPARTMENTS: [Option<&str>; 4] = [Some("Engineering"), Some("Sales"), Some("Support"), None];

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of employees reporting to the demo supervisor
    #[arg(long, default_value_t = 8)]
    pub(crate) employees: usize,
    /// How many of them submit before the report is drawn (capped at --employees)
    #[arg(long, default_value_t = 3)]
    pub(crate) completed: usize,
}

pub(crate) struct SeededTenant {
    pub(crate) hub: Hub,
    pub(crate) company: CompanyId,
    pub(crate) binding: CompanyQuestionnaireId,
    pub(crate) lead: Principal,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Questionnaire hub demo");
    let tenant = seed_tenant(&args)?;
    let SeededTenant {
        hub,
        company,
        binding,
        lead,
    } = &tenant;

    let metrics = hub.reports.completion_metrics(lead, binding)?;
    println!(
        "\n{} at {} ({} to {})",
        metrics.questionnaire_title, metrics.company_name, metrics.period_start, metrics.period_end
    );
    println!(
        "- {} employees | {} assigned | {} not started",
        metrics.total_employees, metrics.assigned, metrics.not_started
    );
    println!(
        "- {} pending | {} in progress | {} completed ({:.1}%)",
        metrics.pending, metrics.in_progress, metrics.completed, metrics.completion_percentage
    );
    println!(
        "- {:.1} min average time to complete",
        metrics.average_time_to_complete_minutes
    );
    println!("Completion by department:");
    for department in &metrics.completion_by_department {
        println!(
            "  - {}: {}/{} ({:.1}%)",
            department.department, department.completed, department.total, department.percentage
        );
    }

    let overview = hub.reports.company_overview(lead, company)?;
    println!(
        "\nCompany overview: {} active of {} questionnaires | {}/{} assignments completed ({:.1}%)",
        overview.active_questionnaires,
        overview.total_questionnaires,
        overview.completed_assignments,
        overview.total_assignments,
        overview.overall_completion_percentage
    );

    println!("\nEmployee progress");
    for row in hub.reports.employee_progress(lead, company)? {
        println!(
            "  - {} [{}]: {}/{} completed, {} in progress ({:.0}%)",
            row.user_id,
            row.department.as_deref().unwrap_or(UNASSIGNED_DEPARTMENT),
            row.completed,
            row.total_assigned,
            row.in_progress,
            row.completion_rate
        );
    }

    Ok(())
}

/// Builds one company with a Q1 engagement survey, a supervisor, and their team, then plays
/// the requested number of submissions through the lifecycle service.
pub(crate) fn seed_tenant(args: &DemoArgs) -> Result<SeededTenant, ServiceError> {
    let employees = args.employees.max(1);
    let completed = args.completed.min(employees);

    let clock = Arc::new(FixedClock::new(instant("2025-01-02T09:00:00Z")?));
    let hub = Hub::new(Repositories::in_memory(), clock.clone());
    let admin = Principal::new(UserId::parse("demo-admin")?, [Role::SuperAdmin]);
    let lead_id = UserId::parse("lead-1")?;
    let lead = Principal::new(lead_id.clone(), [Role::Supervisor, Role::Employee]);

    let company = hub.companies.create_company("Acme Corp")?.id;
    let questionnaire = hub.questionnaires.create(
        &admin,
        NewQuestionnaire {
            title: "Quarterly engagement".to_string(),
            description: "How the team is feeling this quarter".to_string(),
        },
    )?;
    let drafts = [
        QuestionDraft {
            question_text: "How satisfied are you with your work?".to_string(),
            question_type: QuestionType::LikertScale,
            options: Some(QuestionOptions::Scale {
                min: 1,
                max: 5,
                labels: vec!["Very unhappy".to_string(), "Very happy".to_string()],
            }),
            order_index: 0,
            is_required: true,
        },
        QuestionDraft {
            question_text: "Would you recommend the team to a friend?".to_string(),
            question_type: QuestionType::YesNo,
            options: None,
            order_index: 1,
            is_required: true,
        },
        QuestionDraft {
            question_text: "Anything else to share?".to_string(),
            question_type: QuestionType::FreeText,
            options: None,
            order_index: 2,
            is_required: false,
        },
    ];
    let mut questions: Vec<QuestionId> = Vec::with_capacity(drafts.len());
    for draft in drafts {
        questions.push(hub.questionnaires.add_question(&questionnaire.id, draft)?.question_id);
    }

    let binding = hub.companies.assign_questionnaire(
        &admin,
        &company,
        NewBinding {
            questionnaire_id: questionnaire.id.to_string(),
            period_start: instant("2025-01-01T00:00:00Z")?,
            period_end: instant("2025-03-31T23:59:59Z")?,
        },
    )?;

    hub.directory.create(NewUserMetadata {
        user_id: lead_id.to_string(),
        company_id: company.to_string(),
        supervisor_id: None,
        department: Some("Engineering".to_string()),
    })?;
    let team: Vec<String> = (1..=employees).map(|n| format!("emp-{n}")).collect();
    for (index, user_id) in team.iter().enumerate() {
        hub.directory.create(NewUserMetadata {
            user_id: user_id.clone(),
            company_id: company.to_string(),
            supervisor_id: Some(lead_id.to_string()),
            department: DEPARTMENTS[index % DEPARTMENTS.len()].map(str::to_string),
        })?;
    }

    clock.set(instant("2025-02-10T09:00:00Z")?);
    let batch = hub.assignments.assign_to_users(
        &lead,
        &binding.id,
        NewAssignments {
            user_ids: team.clone(),
        },
    )?;

    let answers = [
        ResponseValue::Numeric(4.0),
        ResponseValue::Boolean(true),
        ResponseValue::Text("More pairing sessions, please".to_string()),
    ];
    for (index, assignment) in batch.assignments.iter().enumerate() {
        let respondent = Principal::new(assignment.user_id.clone(), [Role::Employee]);
        if index < completed {
            hub.assignments.start(&respondent, &assignment.id)?;
            clock.advance(Duration::minutes(10 + 5 * index as i64));
            let inputs = questions
                .iter()
                .zip(answers.iter())
                .map(|(question_id, value)| ResponseInput {
                    question_id: question_id.to_string(),
                    response_value: value.clone(),
                })
                .collect();
            hub.assignments.save_responses(&respondent, &assignment.id, inputs)?;
            hub.assignments.submit(&respondent, &assignment.id)?;
        } else if index == completed {
            hub.assignments.save_response(
                &respondent,
                &assignment.id,
                ResponseInput {
                    question_id: questions[0].to_string(),
                    response_value: answers[0].clone(),
                },
            )?;
        }
    }

    Ok(SeededTenant {
        hub,
        company,
        binding: binding.id,
        lead,
    })
}

fn instant(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    raw.parse().map_err(|_| ValidationError::InvalidValue {
        field: "timestamp",
        value: raw.to_string(),
    })
}
