//! Axum glue shared by the feature routers: authentication, envelopes, and parameter parsing.

pub mod auth;
pub mod body;
pub mod envelope;
pub mod params;

pub use auth::{authenticate, bearer_token};
pub use body::JsonBody;
pub use envelope::{error_response, ApiSuccess};
