use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use quaddash_auth::gate::GateError;
use quaddash_auth::session::SessionError;
use quaddash_db::StoreError;
use quaddash_types::api::ErrorBody;

use crate::payments::ProviderError;

/// Every failure in this slice is caught at the call site and converted to a
/// user-visible message; nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("too many requests, try again in {minutes_left} minutes")]
    RateLimited { minutes_left: i64 },

    #[error("invalid code")]
    CodeMismatch { attempts_remaining: u32 },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    PaymentUnready { message: String, code: String },

    #[error("{message}")]
    Provider {
        message: String,
        code: Option<String>,
    },

    #[error("server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) | ApiError::CodeMismatch { .. } => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PaymentUnready { .. } => StatusCode::BAD_REQUEST,
            ApiError::Provider { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = ErrorBody::new(self.to_string());
        match &self {
            ApiError::RateLimited { minutes_left } => body.minutes_left = Some(*minutes_left),
            ApiError::CodeMismatch { attempts_remaining } => {
                body.attempts_remaining = Some(*attempts_remaining)
            }
            ApiError::PaymentUnready { code, .. } => body.code = Some(code.clone()),
            ApiError::Provider { code, .. } => body.code = code.clone(),
            _ => {}
        }
        (self.status(), Json(body)).into_response()
    }
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::InvalidDomain(_) => ApiError::Validation(e.to_string()),
            GateError::RateLimited { minutes_left } => ApiError::RateLimited { minutes_left },
            GateError::Mismatch { attempts_remaining } => {
                ApiError::CodeMismatch { attempts_remaining }
            }
            GateError::NoChallenge | GateError::Expired | GateError::TooManyAttempts => {
                ApiError::Auth(e.to_string())
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Expired => ApiError::Auth("session expired".to_string()),
            SessionError::InvalidToken => ApiError::Auth("invalid token".to_string()),
            SessionError::Encoding => {
                error!("session token encoding failed");
                ApiError::Internal
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound | StoreError::ChatNotFound => {
                ApiError::NotFound(e.to_string())
            }
            StoreError::AlreadyClaimed | StoreError::SelfClaim => ApiError::Conflict(e.to_string()),
            StoreError::NotOwner | StoreError::NotParticipant => ApiError::Forbidden(e.to_string()),
            StoreError::Db(_) | StoreError::Corrupt(_) | StoreError::LockPoisoned => {
                error!("store error: {}", e);
                ApiError::Internal
            }
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        ApiError::Provider {
            message: e.to_string(),
            code: None,
        }
    }
}

/// Join failures from spawn_blocking.
impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    }
}
