//! Gateway Handlers
//!
//! - `sms_status_webhook`: carrier status callback receiver (form-encoded)
//! - `get_message_status`: cache lookup by message id
//! - `health_check`: liveness + build info

use super::state::AppState;
use super::types::{ApiResponse, error_codes};
use crate::carrier::DeliveryState;
use crate::status::{CacheEntry, StatusCache, StatusSource};
use axum::{
    Form, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Acknowledgment body the carrier expects on a status callback
const PROVIDER_ACK: &str = "<Response></Response>";

/// Carrier status callback, form-encoded with the provider's field names
#[derive(Debug, Deserialize)]
pub struct StatusCallback {
    #[serde(rename = "MessageSid", default)]
    pub message_sid: String,
    #[serde(rename = "MessageStatus", default)]
    pub message_status: String,
    #[serde(rename = "To", default)]
    pub to: String,
    #[serde(rename = "From", default)]
    pub from: Option<String>,
    #[serde(rename = "ErrorCode", default)]
    pub error_code: Option<String>,
    #[serde(rename = "ErrorMessage", default)]
    pub error_message: Option<String>,
}

/// What a status callback did to the cache
#[derive(Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied(DeliveryState),
    /// Client error: no message id, nothing written
    MissingSid,
    /// Acknowledged but not written: status outside the tracked lifecycle
    UnknownStatus(String),
}

/// Apply one carrier push to the status cache.
///
/// Kept separate from the axum handler so the webhook semantics are testable
/// without a running server.
pub fn apply_status_callback(cache: &StatusCache, cb: StatusCallback) -> WebhookOutcome {
    if cb.message_sid.is_empty() {
        return WebhookOutcome::MissingSid;
    }

    let Some(state) = DeliveryState::parse(&cb.message_status) else {
        warn!(
            message_id = %cb.message_sid,
            status = %cb.message_status,
            "Ignoring callback with untracked status"
        );
        return WebhookOutcome::UnknownStatus(cb.message_status);
    };

    let error_code = cb.error_code.as_deref().and_then(|s| s.parse::<i64>().ok());
    cache.put(
        &cb.message_sid,
        CacheEntry::new(state, &cb.to, StatusSource::Webhook)
            .with_error(error_code, cb.error_message),
    );

    info!(
        message_id = %cb.message_sid,
        recipient = %cb.to,
        state = %state,
        error_code,
        "Carrier status callback applied"
    );
    WebhookOutcome::Applied(state)
}

/// POST /webhook/sms-status
///
/// Responds 200 with the provider acknowledgment envelope for anything that
/// carries a message id; the push itself needs no content back.
pub async fn sms_status_webhook(
    State(state): State<Arc<AppState>>,
    Form(cb): Form<StatusCallback>,
) -> Response {
    match apply_status_callback(&state.cache, cb) {
        WebhookOutcome::MissingSid => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                "MessageSid is required",
            )),
        )
            .into_response(),
        _ => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/xml")],
            PROVIDER_ACK,
        )
            .into_response(),
    }
}

/// GET /api/v1/status/{message_id}
pub async fn get_message_status(
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<String>,
) -> Result<Json<ApiResponse<CacheEntry>>, (StatusCode, Json<ApiResponse<()>>)> {
    match state.cache.get(&message_id) {
        Some(entry) => Ok(Json(ApiResponse::success(entry))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error(
                error_codes::MESSAGE_NOT_FOUND,
                format!("No status recorded for message {}", message_id),
            )),
        )),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: &'static str,
    pub version: &'static str,
    pub build: &'static str,
}

/// GET /api/v1/health
pub async fn health_check() -> Json<ApiResponse<HealthData>> {
    Json(ApiResponse::success(HealthData {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        build: env!("GIT_HASH"),
    }))
}
