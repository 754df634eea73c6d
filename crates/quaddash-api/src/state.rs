use std::sync::Arc;

use quaddash_auth::{SessionKeys, VerificationGate};
use quaddash_db::Database;

use crate::payments::PaymentBridge;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub gate: VerificationGate,
    pub sessions: SessionKeys,
    pub payments: PaymentBridge,
}
