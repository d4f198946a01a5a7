//! Per-employee questionnaire assignments: creation, answering, and submission.
//!
//! Status moves forward only: `pending` becomes `in_progress` on the first recorded response
//! (or an explicit start) and `completed` on a submission that covers every required
//! question. Completed assignments accept no further writes.

pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use router::assignment_router;
pub use service::{
    AssignmentBatch, AssignmentProgress, AssignmentService, NewAssignments, ResponseInput,
};
