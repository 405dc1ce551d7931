use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use profile_service::ServiceError;
use serde_json::json;
use thiserror::Error;

use crate::auth::Access;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("not allowed to {access} user profiles")]
    Forbidden { access: Access },

    #[error("too many requests, retry in {}s", .retry_after.as_secs())]
    Throttled { retry_after: Duration },

    #[error("user profile {0} not found")]
    NotFound(u64),

    #[error("user profile {0} is gone")]
    Gone(u64),

    #[error("{matches} user profiles match {id}")]
    MultipleChoices { id: u64, matches: usize },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::MultipleChoices { .. } => StatusCode::MULTIPLE_CHOICES,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to the client.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::NotFound(id) => ApiError::NotFound(id),
            ServiceError::AmbiguousMatch { id, matches } => ApiError::MultipleChoices { id, matches },
            ServiceError::AlreadyExists(_) => ApiError::Conflict(error.to_string()),
            ServiceError::Validation { .. } => ApiError::BadRequest(error.to_string()),
            // decode and I/O failures while transcoding are server errors
            ServiceError::Field(_)
            | ServiceError::Storage(_)
            | ServiceError::Database(_)
            | ServiceError::Serialization(_) => ApiError::Internal(error.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(_) => tracing::error!("Internal service error: {}", self),
            ApiError::MultipleChoices { .. } => tracing::warn!("Lookup invariant violated: {}", self),
            ApiError::Unauthenticated | ApiError::Forbidden { .. } | ApiError::Throttled { .. } => {
                tracing::info!("Request refused: {}", self)
            }
            _ => tracing::debug!("Client error: {}", self),
        }

        let status = self.status_code();
        let mut response = (status, Json(json!({ "error": self.user_message() }))).into_response();

        match &self {
            ApiError::Unauthenticated => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            ApiError::Throttled { retry_after } => {
                // round up so clients never retry inside the window
                let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(seconds));
            }
            _ => {}
        }

        response
    }
}
