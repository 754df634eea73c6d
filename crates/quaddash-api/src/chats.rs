use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use quaddash_types::api::SendMessageRequest;

use crate::error::ApiError;
use crate::extract::Json;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Channels where the caller is requester or deliverer. Clients filter to
/// status=active for display.
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let email = user.email.clone();
    let chats = tokio::task::spawn_blocking(move || db.db.chats_for_user(&email)).await??;
    Ok(Json(chats))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(chat_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let messages = tokio::task::spawn_blocking(move || db.db.messages_for_chat(chat_id)).await??;
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(chat_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation("message cannot be empty".to_string()));
    }

    let db = state.clone();
    let sender = user.email.clone();
    let message = tokio::task::spawn_blocking(move || {
        db.db.insert_message(chat_id, &sender, &content, Utc::now())
    })
    .await??;

    Ok((StatusCode::CREATED, Json(message)))
}
