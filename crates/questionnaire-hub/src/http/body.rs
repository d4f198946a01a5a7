use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::{async_trait, Json};
use serde::de::DeserializeOwned;

use crate::domain::ValidationError;
use crate::error::ServiceError;

/// `Json` whose rejections answer with the standard 400 error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(malformed(rejection).into()),
        }
    }
}

fn malformed(rejection: JsonRejection) -> ValidationError {
    tracing::debug!(status = %rejection.status(), "request body rejected");
    ValidationError::MalformedBody {
        reason: rejection.body_text(),
    }
}
