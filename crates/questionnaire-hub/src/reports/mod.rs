//! Read-only completion reporting over assignments, bindings, and the user directory.

pub mod router;
pub mod service;
pub mod views;

#[cfg(test)]
mod tests;

pub use router::report_router;
pub use service::ReportService;
pub use views::{
    BindingBreakdown, CompanyOverview, CompletionMetrics, DepartmentCompletion,
    EmployeeProgress, StatusBreakdown,
};
