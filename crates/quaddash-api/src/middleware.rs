use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::state::AppState;

/// The verified email of the caller, inserted by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub email: String,
}

/// Extract and validate the bearer session from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Auth("no token provided".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Auth("no token provided".to_string()))?;

    let email = state.sessions.validate(token)?;

    req.extensions_mut().insert(CurrentUser { email });
    Ok(next.run(req).await)
}
