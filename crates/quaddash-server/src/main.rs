mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use quaddash_api::middleware::require_auth;
use quaddash_api::payments::{PaymentBridge, SandboxProvider};
use quaddash_api::{AppState, AppStateInner, auth, chats, orders, payments};
use quaddash_auth::kv::MemoryKv;
use quaddash_auth::{DevMailer, GateConfig, Mailer, SessionKeys, SmtpMailer, VerificationGate};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quaddash=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::load()?;

    // Init database
    let db = quaddash_db::Database::open(&PathBuf::from(&config.db_path))?;

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(
            &smtp.host,
            smtp.port,
            smtp.username.clone(),
            smtp.password.clone(),
            &smtp.from,
        )?),
        None => Arc::new(DevMailer),
    };

    let gate = VerificationGate::new(
        GateConfig {
            domain: config.email_domain.clone(),
            ..GateConfig::default()
        },
        Arc::new(MemoryKv::new()),
        Arc::new(MemoryKv::new()),
        mailer,
    );

    let payments = PaymentBridge::new(
        Arc::new(SandboxProvider::new()),
        config.platform_fee_percent,
        &config.webhook_secret,
    );

    let state: AppState = Arc::new(AppStateInner {
        db,
        gate,
        sessions: SessionKeys::new(&config.jwt_secret),
        payments,
    });

    // Routes
    let public_routes = Router::new()
        .route("/api/health", get(auth::health))
        .route("/api/auth/send-code", post(auth::send_code))
        .route("/api/auth/verify-code", post(auth::verify_code))
        .route("/api/auth/verify-session", post(auth::verify_session))
        .route("/api/payments/webhook", post(payments::webhook))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/orders", get(orders::list_orders))
        .route("/api/orders", post(orders::create_order))
        .route("/api/orders/{order_id}/claim", post(orders::claim_order))
        .route("/api/orders/{order_id}", delete(orders::cancel_order))
        .route("/api/chats", get(chats::list_chats))
        .route("/api/chats/{chat_id}/messages", get(chats::get_messages))
        .route("/api/chats/{chat_id}/messages", post(chats::send_message))
        .route("/api/payments/account-status", get(payments::account_status))
        .route("/api/payments/connect-account", post(payments::connect_account))
        .route("/api/payments/create-payment", post(payments::create_payment))
        .route("/api/payments/status/{intent_id}", get(payments::payment_status))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Quaddash server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
