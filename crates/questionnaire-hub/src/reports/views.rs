use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::assignments::service::percentage;
use crate::domain::{
    AssignmentStatus, CompanyId, CompanyQuestionnaireId, QuestionnaireId, UserId, UserMetadata,
    UserQuestionnaireAssignment, UNASSIGNED_DEPARTMENT,
};

/// Assignment counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl StatusBreakdown {
    pub fn tally<'a, I>(assignments: I) -> Self
    where
        I: IntoIterator<Item = &'a UserQuestionnaireAssignment>,
    {
        assignments
            .into_iter()
            .fold(Self::default(), |mut counts, assignment| {
                counts.total += 1;
                match assignment.status {
                    AssignmentStatus::Pending => counts.pending += 1,
                    AssignmentStatus::InProgress => counts.in_progress += 1,
                    AssignmentStatus::Completed => counts.completed += 1,
                }
                counts
            })
    }

    pub fn completion_percentage(&self) -> f64 {
        percentage(self.completed, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentCompletion {
    pub department: String,
    pub completed: usize,
    pub total: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionMetrics {
    pub company_questionnaire_id: CompanyQuestionnaireId,
    pub questionnaire_title: String,
    pub company_name: String,
    pub period_start: String,
    pub period_end: String,
    pub total_employees: usize,
    pub assigned: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    /// Same count as `pending`: assigned but not yet answered.
    pub not_started: usize,
    pub completion_percentage: f64,
    pub average_time_to_complete_minutes: f64,
    pub completion_by_department: Vec<DepartmentCompletion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingBreakdown {
    pub company_questionnaire_id: CompanyQuestionnaireId,
    pub questionnaire_id: QuestionnaireId,
    pub questionnaire_title: String,
    pub is_active: bool,
    pub assigned: usize,
    pub completed: usize,
    pub completion_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyOverview {
    pub company_id: CompanyId,
    pub company_name: String,
    pub total_employees: usize,
    pub total_questionnaires: usize,
    pub active_questionnaires: usize,
    pub total_assignments: usize,
    pub completed_assignments: usize,
    /// Completed over assigned across every binding, not a mean of per-binding percentages.
    pub overall_completion_percentage: f64,
    pub questionnaire_breakdown: Vec<BindingBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeProgress {
    pub user_id: UserId,
    pub department: Option<String>,
    pub total_assigned: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub completion_rate: f64,
}

/// Mean `completed_at - started_at` in minutes over completed assignments carrying both
/// timestamps; zero when none qualify.
pub fn average_minutes_to_complete(assignments: &[UserQuestionnaireAssignment]) -> f64 {
    let durations: Vec<f64> = assignments
        .iter()
        .filter(|assignment| assignment.status == AssignmentStatus::Completed)
        .filter_map(UserQuestionnaireAssignment::time_to_complete)
        .map(|duration| duration.num_milliseconds() as f64 / 60_000.0)
        .collect();
    if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<f64>() / durations.len() as f64
    }
}

/// Groups assignments by their holder's department, sorted by department name. Holders
/// without metadata or without a department land in the unassigned bucket.
pub fn completion_by_department(
    assignments: &[UserQuestionnaireAssignment],
    members: &[UserMetadata],
) -> Vec<DepartmentCompletion> {
    let departments: HashMap<&UserId, &str> = members
        .iter()
        .map(|member| (&member.user_id, member.department_label()))
        .collect();

    let mut buckets: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for assignment in assignments {
        let department = departments
            .get(&assignment.user_id)
            .copied()
            .unwrap_or(UNASSIGNED_DEPARTMENT);
        let (completed, total) = buckets.entry(department).or_default();
        *total += 1;
        if assignment.status == AssignmentStatus::Completed {
            *completed += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(department, (completed, total))| DepartmentCompletion {
            department: department.to_string(),
            completed,
            total,
            percentage: percentage(completed, total),
        })
        .collect()
}

pub fn employee_progress(
    members: &[UserMetadata],
    assignments: &[UserQuestionnaireAssignment],
) -> Vec<EmployeeProgress> {
    let mut by_user: HashMap<&UserId, Vec<&UserQuestionnaireAssignment>> = HashMap::new();
    for assignment in assignments {
        by_user.entry(&assignment.user_id).or_default().push(assignment);
    }

    members
        .iter()
        .map(|member| {
            let held = by_user.get(&member.user_id).map(Vec::as_slice).unwrap_or(&[]);
            let counts = StatusBreakdown::tally(held.iter().copied());
            EmployeeProgress {
                user_id: member.user_id.clone(),
                department: member.department.clone(),
                total_assigned: counts.total,
                completed: counts.completed,
                in_progress: counts.in_progress,
                pending: counts.pending,
                completion_rate: counts.completion_percentage(),
            }
        })
        .collect()
}
