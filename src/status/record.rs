//! Per-Message Reconciliation Record
//!
//! One `MessageRecord` tracks a single outbound message from send to
//! terminal verdict. The outcome transitions PENDING -> {SUCCESS | FAILURE}
//! exactly once; after that the record is settled and nothing mutates it.

use crate::carrier::DeliveryState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Which channel produced an accepted state observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusSource {
    /// Direct provider query from the reconciliation loop
    DirectQuery,
    /// Cache read after a failed provider query
    CacheFallback,
    /// Carrier push to the webhook receiver
    Webhook,
}

impl StatusSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusSource::DirectQuery => "direct-query",
            StatusSource::CacheFallback => "cache-fallback",
            StatusSource::Webhook => "webhook",
        }
    }
}

impl fmt::Display for StatusSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final verdict for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Success,
    Failure,
}

/// Why a record settled as a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// The carrier rejected the send; no message id exists
    SendRejected,
    /// The carrier reported a terminal non-delivered state
    CarrierReported,
    /// Stuck in SENT until the retry budget ran out; treated as non-delivery
    SentUnconfirmed,
    /// Retry budget exhausted without reaching a terminal state
    TimedOut,
    /// The batch was canceled while this message was still in flight
    Canceled,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::SendRejected => "send-rejected",
            FailureReason::CarrierReported => "carrier-reported",
            FailureReason::SentUnconfirmed => "sent-unconfirmed-after-timeout",
            FailureReason::TimedOut => "timed-out",
            FailureReason::Canceled => "canceled",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reconciliation record for one outbound message attempt
#[derive(Debug, Clone, Serialize)]
pub struct MessageRecord {
    /// Destination phone number, immutable after creation
    pub recipient: String,
    /// Provider-assigned message id, immutable after creation
    pub message_id: String,
    /// Last accepted delivery state
    pub current_state: DeliveryState,
    /// Reconciliation queries issued so far, monotonically increasing
    pub attempts_made: u32,
    pub outcome: Outcome,
    pub failure_reason: Option<FailureReason>,
    /// When the most recent observation was accepted
    pub last_observed_at: Option<DateTime<Utc>>,
    /// Channel of the most recent accepted observation
    pub observation_source: Option<StatusSource>,
}

impl MessageRecord {
    pub fn new(recipient: &str, message_id: &str, initial_state: DeliveryState) -> Self {
        Self {
            recipient: recipient.to_string(),
            message_id: message_id.to_string(),
            current_state: initial_state,
            attempts_made: 0,
            outcome: Outcome::Pending,
            failure_reason: None,
            last_observed_at: None,
            observation_source: None,
        }
    }

    /// Whether the record reached its terminal verdict
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.outcome != Outcome::Pending
    }

    /// Accept a new state observation (last-observation-wins).
    /// A settled record ignores further observations.
    pub fn accept_observation(&mut self, state: DeliveryState, source: StatusSource) {
        if self.is_settled() {
            return;
        }
        self.current_state = state;
        self.last_observed_at = Some(Utc::now());
        self.observation_source = Some(source);
    }

    /// Settle the record. The first call wins; later calls are no-ops.
    pub fn settle(&mut self, outcome: Outcome, reason: Option<FailureReason>) {
        if self.is_settled() || outcome == Outcome::Pending {
            return;
        }
        self.outcome = outcome;
        self.failure_reason = reason;
    }
}
