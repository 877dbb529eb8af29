//! Carrier Gateway Contract
//!
//! The outbound transport is opaque behind this trait: implementations
//! accept a send request and answer direct state queries by message id.

use super::error::CarrierError;
use super::state::DeliveryState;
use async_trait::async_trait;
use serde::Serialize;

/// Result of a successful send: the provider-assigned id plus the state
/// the provider stamped on the message at accept time.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub message_id: String,
    pub initial_state: DeliveryState,
}

/// One point-in-time answer from a direct state query
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state: DeliveryState,
    pub error_code: Option<i64>,
    pub error_detail: Option<String>,
}

impl StateSnapshot {
    pub fn of(state: DeliveryState) -> Self {
        Self {
            state,
            error_code: None,
            error_detail: None,
        }
    }
}

/// Carrier gateway client
///
/// `send` fails with a terminal rejection (no message id is produced, so no
/// reconciliation starts) unless the error is `TransientProvider`, which the
/// caller may retry. `fetch_state` failures are never terminal on their own:
/// the caller must fall back to the status cache before giving up on a tick.
#[async_trait]
pub trait CarrierGateway: Send + Sync {
    /// Submit one message. Returns the provider message id + initial state.
    async fn send(&self, recipient: &str, body: &str) -> Result<SendReceipt, CarrierError>;

    /// Query the provider's current view of a message.
    async fn fetch_state(&self, message_id: &str) -> Result<StateSnapshot, CarrierError>;
}
