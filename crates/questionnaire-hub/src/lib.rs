//! Multi-tenant questionnaire assignment, response capture, and completion reporting.
//!
//! Services talk only to the repository traits in [`repository`]; the axum routers in each
//! feature module are thin adapters over them.

pub mod access;
pub mod assignments;
pub mod clock;
pub mod companies;
pub mod config;
pub mod directory;
pub mod domain;
pub mod error;
pub mod http;
pub mod hub;
pub mod identity;
pub mod questionnaires;
pub mod reports;
pub mod repository;
pub mod telemetry;

pub use error::{AppError, ServiceError};
pub use hub::Hub;
