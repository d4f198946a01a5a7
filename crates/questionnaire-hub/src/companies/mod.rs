//! Companies and the time-boxed questionnaire bindings they receive.

pub mod router;
pub mod service;


pub use router::company_router;
pub use service::{BindingChanges, CompanyService, NewBinding};
