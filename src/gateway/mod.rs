//! HTTP Gateway
//!
//! Hosts the carrier webhook receiver and the status query API. The webhook
//! handler and the reconciliation monitors share nothing but the status
//! cache; a push and a poll tick for the same message may interleave freely.

pub mod handlers;
pub mod state;
pub mod types;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::status::StatusCache;
use state::AppState;

/// Build the gateway router around a shared status cache
pub fn build_router(cache: Arc<StatusCache>) -> Router {
    let state = Arc::new(AppState::new(cache));

    Router::new()
        .route("/webhook/sms-status", post(handlers::sms_status_webhook))
        .route(
            "/api/v1/status/{message_id}",
            get(handlers::get_message_status),
        )
        .route("/api/v1/health", get(handlers::health_check))
        .with_state(state)
}

/// Start the HTTP gateway server
pub async fn run_server(host: &str, port: u16, cache: Arc<StatusCache>) {
    let app = build_router(cache);

    let addr = format!("{}:{}", host, port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("FATAL: Failed to bind to {}: {}", addr, e);
            eprintln!(
                "   Hint: Port {} may already be in use. Check with: lsof -i :{}",
                port, port
            );
            std::process::exit(1);
        }
    };

    println!("🚀 Gateway listening on http://{}", addr);
    println!("📨 Webhook endpoint: POST /webhook/sms-status");
    println!("🔎 Status query:     GET  /api/v1/status/{{message_id}}");

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("FATAL: Server error: {}", e);
        std::process::exit(1);
    }
}
