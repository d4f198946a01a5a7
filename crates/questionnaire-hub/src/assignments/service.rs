use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::access::TenantGuard;
use crate::clock::Clock;
use crate::domain::{
    AssignmentId, AssignmentStatus, CompanyQuestionnaire, CompanyQuestionnaireId, Coverage,
    QuestionId, Questionnaire, ResponseValue, UserId, UserQuestionnaireAssignment,
    ValidationError,
};
use crate::error::ServiceError;
use crate::identity::Principal;
use crate::repository::{
    AssignmentRepository, CompanyQuestionnaireRepository, QuestionnaireRepository,
    RepositoryError, Repositories, UserMetadataRepository,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewAssignments {
    pub user_ids: Vec<String>,
}

/// Outcome of an assign-to-users request. Users who already held an assignment are counted
/// in `total_requested` only.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentBatch {
    pub assignments: Vec<UserQuestionnaireAssignment>,
    pub total_requested: usize,
    pub total_created: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseInput {
    pub question_id: String,
    pub response_value: ResponseValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentProgress {
    pub assignment_id: AssignmentId,
    pub status: AssignmentStatus,
    pub total_questions: usize,
    pub answered_questions: usize,
    pub progress_percentage: f64,
    pub required: Coverage,
}

/// Load-modify-store attempts before a contended write gives up.
const WRITE_ATTEMPTS: usize = 3;

enum Change {
    Write(UserQuestionnaireAssignment),
    Unchanged(UserQuestionnaireAssignment),
}

pub struct AssignmentService {
    assignments: Arc<dyn AssignmentRepository>,
    bindings: Arc<dyn CompanyQuestionnaireRepository>,
    questionnaires: Arc<dyn QuestionnaireRepository>,
    users: Arc<dyn UserMetadataRepository>,
    guard: TenantGuard,
    clock: Arc<dyn Clock>,
}

impl AssignmentService {
    pub fn new(repositories: &Repositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            assignments: repositories.assignments.clone(),
            bindings: repositories.bindings.clone(),
            questionnaires: repositories.questionnaires.clone(),
            users: repositories.users.clone(),
            guard: TenantGuard::new(repositories.users.clone()),
            clock,
        }
    }

    /// Creates one pending assignment per target user.
    ///
    /// Each user is handled independently. Users who already hold an assignment for the
    /// binding are skipped, including those that lose an insert race to a concurrent request.
    /// Fails with `NothingToAssign` when every target was skipped.
    pub fn assign_to_users(
        &self,
        caller: &Principal,
        binding_id: &CompanyQuestionnaireId,
        request: NewAssignments,
    ) -> Result<AssignmentBatch, ServiceError> {
        if request.user_ids.is_empty() {
            return Err(ValidationError::MissingField { field: "user_ids" }.into());
        }
        let targets = request
            .user_ids
            .iter()
            .map(|raw| UserId::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let binding = self.load_binding(binding_id)?;
        if !binding.is_active {
            return Err(ServiceError::invalid_state(
                "company questionnaire is not active",
            ));
        }
        let questionnaire = self.load_questionnaire(&binding)?;
        if questionnaire.questions.is_empty() {
            return Err(ServiceError::invalid_state("questionnaire has no questions"));
        }
        self.guard
            .authorize_members(caller, &binding.company_id, &targets)?;

        let now = self.clock.now();
        let mut created = Vec::with_capacity(targets.len());
        for user_id in &targets {
            if self.assignments.find_for_user(user_id, binding_id)?.is_some() {
                debug!(user = %user_id, binding = %binding_id, "already assigned, skipping");
                continue;
            }
            let assignment = UserQuestionnaireAssignment::new(
                binding_id.clone(),
                user_id.clone(),
                caller.subject.clone(),
                now,
            );
            match self.assignments.insert(assignment) {
                Ok(stored) => created.push(stored),
                Err(RepositoryError::Conflict) => {
                    debug!(user = %user_id, binding = %binding_id, "concurrent assignment won, skipping");
                }
                Err(err) => return Err(err.into()),
            }
        }

        if created.is_empty() {
            return Err(ServiceError::NothingToAssign {
                requested: targets.len(),
            });
        }
        info!(
            binding = %binding_id,
            requested = targets.len(),
            created = created.len(),
            "questionnaire assigned to users"
        );
        Ok(AssignmentBatch {
            total_requested: targets.len(),
            total_created: created.len(),
            assignments: created,
        })
    }

    pub fn save_response(
        &self,
        caller: &Principal,
        id: &AssignmentId,
        input: ResponseInput,
    ) -> Result<UserQuestionnaireAssignment, ServiceError> {
        self.save_responses(caller, id, vec![input])
    }

    /// Applies every upsert in memory and writes the assignment once; a failing batch leaves
    /// nothing behind.
    pub fn save_responses(
        &self,
        caller: &Principal,
        id: &AssignmentId,
        inputs: Vec<ResponseInput>,
    ) -> Result<UserQuestionnaireAssignment, ServiceError> {
        if inputs.is_empty() {
            return Err(ValidationError::MissingField { field: "responses" }.into());
        }
        let answers = inputs
            .into_iter()
            .map(|input| -> Result<_, ValidationError> {
                Ok((QuestionId::parse(&input.question_id)?, input.response_value))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let assignment = self.write_fresh(id, || {
            let mut assignment = self.writable(caller, id)?;
            let now = self.clock.now();
            for (question_id, value) in &answers {
                assignment.record_response(question_id.clone(), value.clone(), now)?;
            }
            Ok(Change::Write(assignment))
        })?;
        debug!(assignment = %id, responses = assignment.responses.len(), "responses saved");
        Ok(assignment)
    }

    /// Explicit `pending` to `in_progress`; a no-op when already in progress.
    pub fn start(
        &self,
        caller: &Principal,
        id: &AssignmentId,
    ) -> Result<UserQuestionnaireAssignment, ServiceError> {
        let mut started = false;
        let assignment = self.write_fresh(id, || {
            let mut assignment = self.writable(caller, id)?;
            started = assignment.start(self.clock.now())?;
            Ok(if started {
                Change::Write(assignment)
            } else {
                Change::Unchanged(assignment)
            })
        })?;
        if started {
            info!(assignment = %id, "assignment started");
        }
        Ok(assignment)
    }

    pub fn submit(
        &self,
        caller: &Principal,
        id: &AssignmentId,
    ) -> Result<UserQuestionnaireAssignment, ServiceError> {
        let assignment = self.write_fresh(id, || {
            let mut assignment = self.owned(caller, id)?;
            if assignment.is_completed() {
                return Err(ServiceError::invalid_state("assignment already completed"));
            }
            let binding = self.load_binding(&assignment.company_questionnaire_id)?;
            let questionnaire = self.load_questionnaire(&binding)?;

            let coverage = assignment.coverage(&questionnaire);
            if !coverage.is_satisfied() {
                return Err(ServiceError::Incomplete {
                    answered: coverage.answered,
                    required: coverage.required,
                });
            }
            assignment.complete(self.clock.now())?;
            Ok(Change::Write(assignment))
        })?;
        info!(assignment = %id, user = %assignment.user_id, "assignment submitted");
        Ok(assignment)
    }

    /// Readable by its owner and by super admins.
    pub fn get(
        &self,
        caller: &Principal,
        id: &AssignmentId,
    ) -> Result<UserQuestionnaireAssignment, ServiceError> {
        let assignment = self.load(id)?;
        if !caller.is_super_admin() && !assignment.is_owned_by(&caller.subject) {
            return Err(ServiceError::unauthorized(
                "assignment does not belong to caller",
            ));
        }
        Ok(assignment)
    }

    pub fn my_assignments(
        &self,
        caller: &Principal,
        status: Option<AssignmentStatus>,
    ) -> Result<Vec<UserQuestionnaireAssignment>, ServiceError> {
        Ok(self.assignments.list_by_user(&caller.subject, status)?)
    }

    pub fn binding_assignments(
        &self,
        caller: &Principal,
        binding_id: &CompanyQuestionnaireId,
    ) -> Result<Vec<UserQuestionnaireAssignment>, ServiceError> {
        let binding = self.load_binding(binding_id)?;
        self.guard.authorize(caller, &binding.company_id)?;
        Ok(self.assignments.list_by_binding(binding_id)?)
    }

    /// Active bindings of the caller's own company.
    pub fn my_company_questionnaires(
        &self,
        caller: &Principal,
    ) -> Result<Vec<CompanyQuestionnaire>, ServiceError> {
        let membership = self.guard.membership(caller)?;
        Ok(self.bindings.list_by_company(&membership.company_id, true)?)
    }

    /// Assignments held by users who name the caller as their supervisor, limited to the
    /// caller's company unless they are a super admin.
    pub fn team_assignments(
        &self,
        caller: &Principal,
    ) -> Result<Vec<UserQuestionnaireAssignment>, ServiceError> {
        let reports = self.users.list_by_supervisor(&caller.subject)?;
        if reports.is_empty() {
            return Ok(Vec::new());
        }
        if caller.is_super_admin() {
            let team: Vec<UserId> = reports.into_iter().map(|m| m.user_id).collect();
            return Ok(self.assignments.list_by_users(&team)?);
        }

        let company = self.guard.membership(caller)?.company_id;
        let team: Vec<UserId> = reports
            .into_iter()
            .filter(|metadata| metadata.company_id == company)
            .map(|metadata| metadata.user_id)
            .collect();
        if team.is_empty() {
            return Ok(Vec::new());
        }
        let bindings: HashSet<CompanyQuestionnaireId> = self
            .bindings
            .list_by_company(&company, false)?
            .into_iter()
            .map(|binding| binding.id)
            .collect();
        Ok(self
            .assignments
            .list_by_users(&team)?
            .into_iter()
            .filter(|assignment| bindings.contains(&assignment.company_questionnaire_id))
            .collect())
    }

    pub fn progress(
        &self,
        caller: &Principal,
        id: &AssignmentId,
    ) -> Result<AssignmentProgress, ServiceError> {
        let assignment = self.get(caller, id)?;
        let binding = self.load_binding(&assignment.company_questionnaire_id)?;
        let questionnaire = self.load_questionnaire(&binding)?;

        let total_questions = questionnaire.questions.len();
        let answered_questions = questionnaire
            .questions
            .iter()
            .filter(|question| assignment.response(&question.question_id).is_some())
            .count();
        Ok(AssignmentProgress {
            assignment_id: assignment.id.clone(),
            status: assignment.status,
            total_questions,
            answered_questions,
            progress_percentage: percentage(answered_questions, total_questions),
            required: assignment.coverage(&questionnaire),
        })
    }

    /// Removes an assignment within the caller's company.
    pub fn delete(&self, caller: &Principal, id: &AssignmentId) -> Result<(), ServiceError> {
        let assignment = self.load(id)?;
        match self.bindings.fetch(&assignment.company_questionnaire_id)? {
            Some(binding) => self.guard.authorize(caller, &binding.company_id)?,
            None if caller.is_super_admin() => {}
            None => {
                warn!(assignment = %id, "assignment references a missing binding");
                return Err(ServiceError::not_found("company questionnaire"));
            }
        }
        if !self.assignments.delete(id)? {
            return Err(ServiceError::not_found("assignment"));
        }
        info!(assignment = %id, user = %assignment.user_id, "assignment deleted");
        Ok(())
    }

    /// Runs `change` against a freshly loaded copy and stores the result. When another write
    /// lands between the load and the store, the change is re-run from the newer copy so its
    /// checks see the current status.
    fn write_fresh<F>(
        &self,
        id: &AssignmentId,
        mut change: F,
    ) -> Result<UserQuestionnaireAssignment, ServiceError>
    where
        F: FnMut() -> Result<Change, ServiceError>,
    {
        for attempt in 1..=WRITE_ATTEMPTS {
            let assignment = match change()? {
                Change::Write(assignment) => assignment,
                Change::Unchanged(assignment) => return Ok(assignment),
            };
            match self.assignments.update(assignment) {
                Ok(stored) => return Ok(stored),
                Err(RepositoryError::Stale) => {
                    debug!(assignment = %id, attempt, "assignment changed underneath a write");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ServiceError::conflict(
            "assignment is being modified concurrently; retry the request",
        ))
    }

    /// Loads an assignment the caller may write to: owned, not completed, and inside its
    /// binding's period.
    fn writable(
        &self,
        caller: &Principal,
        id: &AssignmentId,
    ) -> Result<UserQuestionnaireAssignment, ServiceError> {
        let assignment = self.owned(caller, id)?;
        if assignment.is_completed() {
            return Err(ServiceError::invalid_state(
                "cannot modify completed assignment",
            ));
        }
        let binding = self.load_binding(&assignment.company_questionnaire_id)?;
        if !binding.period.contains(self.clock.now()) {
            return Err(ServiceError::invalid_state(
                "current time is outside the questionnaire period",
            ));
        }
        Ok(assignment)
    }

    /// Ownership is strict: there is no admin override for answering or submitting.
    fn owned(
        &self,
        caller: &Principal,
        id: &AssignmentId,
    ) -> Result<UserQuestionnaireAssignment, ServiceError> {
        let assignment = self.load(id)?;
        if !assignment.is_owned_by(&caller.subject) {
            warn!(caller = %caller.subject, assignment = %id, "write to foreign assignment denied");
            return Err(ServiceError::unauthorized(
                "assignment does not belong to caller",
            ));
        }
        Ok(assignment)
    }

    fn load(&self, id: &AssignmentId) -> Result<UserQuestionnaireAssignment, ServiceError> {
        self.assignments
            .fetch(id)?
            .ok_or_else(|| ServiceError::not_found("assignment"))
    }

    fn load_binding(
        &self,
        id: &CompanyQuestionnaireId,
    ) -> Result<CompanyQuestionnaire, ServiceError> {
        self.bindings
            .fetch(id)?
            .ok_or_else(|| ServiceError::not_found("company questionnaire"))
    }

    fn load_questionnaire(
        &self,
        binding: &CompanyQuestionnaire,
    ) -> Result<Questionnaire, ServiceError> {
        self.questionnaires
            .fetch(&binding.questionnaire_id)?
            .ok_or_else(|| ServiceError::not_found("questionnaire"))
    }
}

pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
