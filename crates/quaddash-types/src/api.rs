use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::locations::{DeliveryWindow, DiningHall, Dorm};

// -- JWT Claims --

/// Session claims shared by quaddash-api (middleware) and quaddash-auth
/// (issuing/validation). Canonical definition lives here to avoid duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SendCodeRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendCodeResponse {
    pub success: bool,
    pub message: String,
    /// Present only when no mail transport is configured, mirroring the
    /// console fallback of a dev deployment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_code: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
    pub verified: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyCodeResponse {
    pub success: bool,
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCheckResponse {
    pub valid: bool,
    pub user: UserInfo,
}

// -- Orders --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub amount: f64,
    pub dining_hall: DiningHall,
    pub dorm: Dorm,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub delivery_window: DeliveryWindow,
}

/// A successful claim returns the claimed order together with the chat
/// channel opened for it.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub order: crate::models::Order,
    pub chat: crate::models::ChatChannel,
}

// -- Messages --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

// -- Payments --

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountStatusResponse {
    pub connected: bool,
    pub can_receive_payments: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectAccountResponse {
    pub url: String,
    pub account_id: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
    pub amount: f64,
    pub deliverer_email: String,
}

/// Dollar amounts, derived from cent-precise math on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub total: f64,
    pub platform_fee: f64,
    pub deliverer_receives: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePaymentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub breakdown: FeeBreakdown,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub status: String,
    pub amount: f64,
    pub paid: bool,
}

/// Terminal payment outcomes delivered on the webhook.
#[derive(Debug, Deserialize, Serialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub payment_intent_id: String,
}

// -- Errors --

/// Wire shape of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes_left: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            minutes_left: None,
            attempts_remaining: None,
            code: None,
        }
    }
}
