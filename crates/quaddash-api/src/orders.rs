use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use quaddash_types::api::{ClaimResponse, CreateOrderRequest};
use quaddash_types::models::{Order, OrderStatus};

use crate::error::ApiError;
use crate::extract::Json;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// All orders regardless of status; "open" vs "mine" vs "claimed-by-me" is a
/// client-side filter.
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let orders = tokio::task::spawn_blocking(move || db.db.list_orders()).await??;
    Ok(Json(orders))
}

pub async fn create_order(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !req.amount.is_finite() || req.amount <= 0.0 {
        return Err(ApiError::Validation(
            "amount must be a positive number".to_string(),
        ));
    }

    let details = req
        .details
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let order = Order {
        id: Uuid::new_v4(),
        requester_email: user.email,
        amount: req.amount,
        dining_hall: req.dining_hall,
        dorm: req.dorm,
        details,
        delivery_window: req.delivery_window,
        status: OrderStatus::Open,
        deliverer_email: None,
        created_at: Utc::now(),
    };

    let db = state.clone();
    let stored = order.clone();
    tokio::task::spawn_blocking(move || db.db.insert_order(&stored)).await??;

    Ok((StatusCode::CREATED, Json(order)))
}

/// Claim an open order. Opening the chat channel happens in the same store
/// transaction, so a claim either fully takes effect or not at all.
pub async fn claim_order(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let caller = user.email.clone();
    let (order, chat) =
        tokio::task::spawn_blocking(move || db.db.claim_order(order_id, &caller, Utc::now()))
            .await??;

    Ok((StatusCode::CREATED, Json(ClaimResponse { order, chat })))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let caller = user.email.clone();
    tokio::task::spawn_blocking(move || db.db.cancel_order(order_id, &caller)).await??;

    Ok(StatusCode::NO_CONTENT)
}
