//! Payment bridge: an opaque provider moving funds from requester to
//! deliverer, minus a fixed-percent platform fee. The provider wire format is
//! out of scope; everything behind [`PaymentProvider`] is swappable.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Extension, body::Bytes, extract::Path, extract::State, http::HeaderMap,
    response::IntoResponse,
};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use quaddash_auth::kv::{KeyValue, MemoryKv};
use quaddash_types::api::{
    AccountStatusResponse, ConnectAccountResponse, CreatePaymentRequest, CreatePaymentResponse,
    FeeBreakdown, PaymentStatusResponse, WebhookEvent,
};

use crate::error::ApiError;
use crate::extract::Json;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-quaddash-signature";

/// Settled payments stay queryable for a day, then drop out of the store.
const SETTLED_RETENTION_DAYS: i64 = 1;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),

    #[error("unknown payment account")]
    UnknownAccount,

    #[error("unknown payment intent")]
    UnknownIntent,
}

#[derive(Debug, Clone, Copy)]
pub struct AccountState {
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub details_submitted: bool,
}

#[derive(Debug, Clone)]
pub struct IntentHandle {
    pub id: String,
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_account(&self, email: &str) -> Result<String, ProviderError>;
    async fn account_state(&self, account_id: &str) -> Result<AccountState, ProviderError>;
    async fn onboarding_link(&self, account_id: &str) -> Result<String, ProviderError>;
    async fn create_intent(
        &self,
        amount_cents: i64,
        fee_cents: i64,
        destination: &str,
    ) -> Result<IntentHandle, ProviderError>;
    async fn intent_status(&self, intent_id: &str) -> Result<String, ProviderError>;
}

/// In-process provider for development and tests: accounts are enabled
/// immediately and intents sit in requires_payment_method until a webhook
/// event arrives.
pub struct SandboxProvider {
    accounts: MemoryKv<AccountState>,
    intents: MemoryKv<String>,
}

impl SandboxProvider {
    pub fn new() -> Self {
        Self {
            accounts: MemoryKv::new(),
            intents: MemoryKv::new(),
        }
    }
}

impl Default for SandboxProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProvider for SandboxProvider {
    async fn create_account(&self, _email: &str) -> Result<String, ProviderError> {
        let id = format!("acct_{}", Uuid::new_v4().simple());
        self.accounts.put(
            &id,
            AccountState {
                charges_enabled: true,
                payouts_enabled: true,
                details_submitted: true,
            },
        );
        Ok(id)
    }

    async fn account_state(&self, account_id: &str) -> Result<AccountState, ProviderError> {
        self.accounts
            .get(account_id)
            .ok_or(ProviderError::UnknownAccount)
    }

    async fn onboarding_link(&self, account_id: &str) -> Result<String, ProviderError> {
        Ok(format!(
            "https://pay.sandbox.quaddash.dev/onboard/{}",
            account_id
        ))
    }

    async fn create_intent(
        &self,
        _amount_cents: i64,
        _fee_cents: i64,
        destination: &str,
    ) -> Result<IntentHandle, ProviderError> {
        if self.accounts.get(destination).is_none() {
            return Err(ProviderError::UnknownAccount);
        }
        let id = format!("pi_{}", Uuid::new_v4().simple());
        let client_secret = format!("{}_secret_{}", id, Uuid::new_v4().simple());
        self.intents.put(&id, "requires_payment_method".to_string());
        Ok(IntentHandle { id, client_secret })
    }

    async fn intent_status(&self, intent_id: &str) -> Result<String, ProviderError> {
        self.intents
            .get(intent_id)
            .ok_or(ProviderError::UnknownIntent)
    }
}

/// Payment awaiting its terminal webhook outcome.
#[derive(Debug, Clone)]
pub struct PendingPayment {
    pub order_id: Uuid,
    pub requester_email: String,
    pub deliverer_email: String,
    pub amount: f64,
    pub platform_fee: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

pub struct PaymentBridge {
    provider: Arc<dyn PaymentProvider>,
    /// email -> provider account id
    accounts: Arc<dyn KeyValue<String>>,
    /// intent id -> pending payment details
    pending: Arc<dyn KeyValue<PendingPayment>>,
    pub fee_percent: i64,
    webhook_secret: String,
}

impl PaymentBridge {
    pub fn new(provider: Arc<dyn PaymentProvider>, fee_percent: i64, webhook_secret: &str) -> Self {
        Self {
            provider,
            accounts: Arc::new(MemoryKv::new()),
            pending: Arc::new(MemoryKv::new()),
            fee_percent,
            webhook_secret: webhook_secret.to_string(),
        }
    }

    pub fn account_for(&self, email: &str) -> Option<String> {
        self.accounts.get(email)
    }

    pub async fn ensure_account(&self, email: &str) -> Result<String, ProviderError> {
        if let Some(id) = self.accounts.get(email) {
            return Ok(id);
        }
        let id = self.provider.create_account(email).await?;
        self.accounts.put(email, id.clone());
        info!("created payment account {} for {}", id, email);
        Ok(id)
    }

    /// Constant-time HMAC-SHA256 check over the raw webhook body.
    pub fn verify_signature(&self, body: &[u8], signature_hex: &str) -> bool {
        let Ok(expected) = hex::decode(signature_hex) else {
            return false;
        };
        let mut mac = match Hmac::<Sha256>::new_from_slice(self.webhook_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }

    /// Apply a terminal outcome from the webhook to the pending record.
    pub fn apply_event(&self, event: &WebhookEvent) {
        match event.kind.as_str() {
            "payment_intent.succeeded" => {
                if let Some(mut pending) = self.pending.get(&event.payment_intent_id) {
                    pending.status = "succeeded".to_string();
                    info!(
                        "payment {} succeeded: order {} paid, deliverer {}",
                        event.payment_intent_id, pending.order_id, pending.deliverer_email
                    );
                    self.settle(&event.payment_intent_id, pending);
                } else {
                    warn!("webhook for unknown intent {}", event.payment_intent_id);
                }
            }
            "payment_intent.payment_failed" => {
                if let Some(mut pending) = self.pending.get(&event.payment_intent_id) {
                    pending.status = "failed".to_string();
                    self.settle(&event.payment_intent_id, pending);
                }
                warn!("payment {} failed", event.payment_intent_id);
            }
            other => {
                debug!("ignoring webhook event {}", other);
            }
        }
    }

    /// Store a terminal record with an eviction deadline, so the pending map
    /// does not grow for the lifetime of the process.
    fn settle(&self, intent_id: &str, pending: PendingPayment) {
        self.pending.put(intent_id, pending);
        self.pending
            .expire(intent_id, Utc::now() + Duration::days(SETTLED_RETENTION_DAYS));
    }

    pub fn pending_for(&self, intent_id: &str) -> Option<PendingPayment> {
        self.pending.get(intent_id)
    }

    fn record_pending(&self, intent_id: &str, pending: PendingPayment) {
        self.pending.put(intent_id, pending);
    }
}

/// Cent-precise fee split; the platform takes `fee_percent` of the total,
/// rounded half-up on the cent.
pub fn fee_breakdown(amount: f64, fee_percent: i64) -> FeeBreakdown {
    let total_cents = (amount * 100.0).round() as i64;
    let platform_cents = (total_cents * fee_percent + 50) / 100;
    FeeBreakdown {
        total: total_cents as f64 / 100.0,
        platform_fee: platform_cents as f64 / 100.0,
        deliverer_receives: (total_cents - platform_cents) as f64 / 100.0,
    }
}

// -- Handlers --

pub async fn account_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(account_id) = state.payments.account_for(&user.email) else {
        return Ok(Json(AccountStatusResponse {
            connected: false,
            can_receive_payments: false,
            account_id: None,
        }));
    };

    let account = state.payments.provider.account_state(&account_id).await?;
    Ok(Json(AccountStatusResponse {
        connected: true,
        can_receive_payments: account.charges_enabled && account.payouts_enabled,
        account_id: Some(account_id),
    }))
}

/// Create (or reuse) the caller's payout account and hand back an
/// onboarding link.
pub async fn connect_account(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = state.payments.ensure_account(&user.email).await?;
    let url = state.payments.provider.onboarding_link(&account_id).await?;

    Ok(Json(ConnectAccountResponse { url, account_id }))
}

pub async fn create_payment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !req.amount.is_finite() || req.amount <= 0.0 {
        return Err(ApiError::Validation(
            "amount must be a positive number".to_string(),
        ));
    }

    let deliverer = req.deliverer_email.trim().to_lowercase();
    if deliverer.is_empty() {
        return Err(ApiError::Validation("deliverer_email is required".to_string()));
    }

    let Some(destination) = state.payments.account_for(&deliverer) else {
        return Err(ApiError::PaymentUnready {
            message: "deliverer has not set up payments yet".to_string(),
            code: "DELIVERER_NOT_SETUP".to_string(),
        });
    };

    let account = state.payments.provider.account_state(&destination).await?;
    if !account.charges_enabled {
        return Err(ApiError::PaymentUnready {
            message: "deliverer account is not fully set up".to_string(),
            code: "DELIVERER_INCOMPLETE".to_string(),
        });
    }

    let breakdown = fee_breakdown(req.amount, state.payments.fee_percent);
    let total_cents = (breakdown.total * 100.0).round() as i64;
    let fee_cents = (breakdown.platform_fee * 100.0).round() as i64;

    let intent = state
        .payments
        .provider
        .create_intent(total_cents, fee_cents, &destination)
        .await?;

    state.payments.record_pending(
        &intent.id,
        PendingPayment {
            order_id: req.order_id,
            requester_email: user.email.clone(),
            deliverer_email: deliverer,
            amount: breakdown.total,
            platform_fee: breakdown.platform_fee,
            status: "created".to_string(),
            created_at: Utc::now(),
        },
    );

    info!("payment intent {} created for order {}", intent.id, req.order_id);

    Ok(Json(CreatePaymentResponse {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
        breakdown,
    }))
}

pub async fn payment_status(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(intent_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let pending = state
        .payments
        .pending_for(&intent_id)
        .ok_or_else(|| ApiError::NotFound("unknown payment".to_string()))?;

    // The webhook is authoritative once a terminal outcome has landed.
    let status = if pending.status == "created" {
        state.payments.provider.intent_status(&intent_id).await?
    } else {
        pending.status.clone()
    };

    let paid = status == "succeeded";
    Ok(Json(PaymentStatusResponse {
        status,
        amount: pending.amount,
        paid,
    }))
}

/// Asynchronous terminal-outcome notifications. The body is authenticated
/// with an HMAC over the raw bytes, so this route must see the body before
/// any JSON extractor does.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Validation("missing webhook signature".to_string()))?;

    if !state.payments.verify_signature(&body, signature) {
        return Err(ApiError::Validation("bad webhook signature".to_string()));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|_| ApiError::Validation("malformed webhook payload".to_string()))?;

    state.payments.apply_event(&event);

    Ok(Json(serde_json::json!({ "received": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_percent_of_five_dollars() {
        let b = fee_breakdown(5.0, 5);
        assert_eq!(b.total, 5.0);
        assert_eq!(b.platform_fee, 0.25);
        assert_eq!(b.deliverer_receives, 4.75);
    }

    #[test]
    fn fee_rounds_half_up_on_the_cent() {
        // 5% of 99 cents is 4.95 cents -> 5 cents
        let b = fee_breakdown(0.99, 5);
        assert_eq!(b.platform_fee, 0.05);
        assert_eq!(b.deliverer_receives, 0.94);
    }

    #[test]
    fn breakdown_always_sums_to_total() {
        for cents in [1i64, 37, 99, 250, 500, 1234, 99999] {
            let b = fee_breakdown(cents as f64 / 100.0, 5);
            let total = (b.total * 100.0).round() as i64;
            let fee = (b.platform_fee * 100.0).round() as i64;
            let rest = (b.deliverer_receives * 100.0).round() as i64;
            assert_eq!(fee + rest, total);
        }
    }

    fn bridge() -> PaymentBridge {
        PaymentBridge::new(Arc::new(SandboxProvider::new()), 5, "whsec_test")
    }

    #[test]
    fn signature_round_trip() {
        let bridge = bridge();
        let body = br#"{"type":"payment_intent.succeeded","payment_intent_id":"pi_1"}"#;

        let mut mac = Hmac::<Sha256>::new_from_slice(b"whsec_test").unwrap();
        mac.update(body);
        let sig = hex::encode(mac.finalize().into_bytes());

        assert!(bridge.verify_signature(body, &sig));
        assert!(!bridge.verify_signature(b"tampered", &sig));
        assert!(!bridge.verify_signature(body, "not-hex"));
    }

    #[tokio::test]
    async fn sandbox_payment_lifecycle() {
        let bridge = bridge();
        let account = bridge.ensure_account("bob@upenn.edu").await.unwrap();
        // Repeat requests reuse the account
        assert_eq!(bridge.ensure_account("bob@upenn.edu").await.unwrap(), account);

        let breakdown = fee_breakdown(10.0, bridge.fee_percent);
        let intent = bridge
            .provider
            .create_intent(1000, 50, &account)
            .await
            .unwrap();
        bridge.record_pending(
            &intent.id,
            PendingPayment {
                order_id: Uuid::new_v4(),
                requester_email: "alice@upenn.edu".to_string(),
                deliverer_email: "bob@upenn.edu".to_string(),
                amount: breakdown.total,
                platform_fee: breakdown.platform_fee,
                status: "created".to_string(),
                created_at: Utc::now(),
            },
        );

        assert_eq!(
            bridge.provider.intent_status(&intent.id).await.unwrap(),
            "requires_payment_method"
        );

        bridge.apply_event(&WebhookEvent {
            kind: "payment_intent.succeeded".to_string(),
            payment_intent_id: intent.id.clone(),
        });
        assert_eq!(bridge.pending_for(&intent.id).unwrap().status, "succeeded");
    }
}
