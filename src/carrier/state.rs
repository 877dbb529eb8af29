//! Delivery State Definitions
//!
//! State names match the carrier's wire values exactly, so the same enum
//! parses webhook callbacks, REST query responses and config entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Delivery lifecycle of one outbound message.
///
/// Forward path: QUEUED -> SENDING -> SENT -> one of the four terminal states.
/// Terminal states: DELIVERED, UNDELIVERED, FAILED, CANCELED.
/// Only DELIVERED counts as a successful delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    /// Accepted by the carrier, waiting in its outbound queue
    Queued,

    /// Carrier is handing the message to the mobile operator
    Sending,

    /// Operator accepted the message - handset receipt not yet confirmed
    Sent,

    /// Terminal: handset confirmed receipt
    Delivered,

    /// Terminal: operator could not deliver (inactive / unreachable number)
    Undelivered,

    /// Terminal: carrier or operator rejected the message
    Failed,

    /// Terminal: message was canceled before handoff
    Canceled,
}

impl DeliveryState {
    /// Check if this is a terminal state (no further transition expected)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryState::Delivered
                | DeliveryState::Undelivered
                | DeliveryState::Failed
                | DeliveryState::Canceled
        )
    }

    /// Check if the message is still in flight at the carrier
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        !self.is_terminal()
    }

    /// Wire name as the carrier reports it
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryState::Queued => "queued",
            DeliveryState::Sending => "sending",
            DeliveryState::Sent => "sent",
            DeliveryState::Delivered => "delivered",
            DeliveryState::Undelivered => "undelivered",
            DeliveryState::Failed => "failed",
            DeliveryState::Canceled => "canceled",
        }
    }

    /// Parse a carrier wire value. Returns None for statuses outside the
    /// tracked lifecycle (callers decide whether to skip or coerce them).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queued" => Some(DeliveryState::Queued),
            "sending" => Some(DeliveryState::Sending),
            "sent" => Some(DeliveryState::Sent),
            "delivered" => Some(DeliveryState::Delivered),
            "undelivered" => Some(DeliveryState::Undelivered),
            "failed" => Some(DeliveryState::Failed),
            "canceled" => Some(DeliveryState::Canceled),
            _ => None,
        }
    }

    /// Human-readable label for progress reporting
    pub fn describe(&self) -> &'static str {
        match self {
            DeliveryState::Queued => "queued at carrier",
            DeliveryState::Sending => "handing off to operator",
            DeliveryState::Sent => "sent to operator, awaiting handset confirmation",
            DeliveryState::Delivered => "delivered to handset",
            DeliveryState::Undelivered => "not delivered (number inactive or unreachable)",
            DeliveryState::Failed => "failed (carrier or operator error)",
            DeliveryState::Canceled => "canceled before handoff",
        }
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeliveryState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeliveryState::parse(s).ok_or_else(|| format!("Unknown delivery state: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(DeliveryState::Delivered.is_terminal());
        assert!(DeliveryState::Undelivered.is_terminal());
        assert!(DeliveryState::Failed.is_terminal());
        assert!(DeliveryState::Canceled.is_terminal());

        assert!(!DeliveryState::Queued.is_terminal());
        assert!(!DeliveryState::Sending.is_terminal());
        assert!(!DeliveryState::Sent.is_terminal());
    }

    #[test]
    fn test_in_flight_states() {
        assert!(DeliveryState::Queued.is_in_flight());
        assert!(DeliveryState::Sending.is_in_flight());
        assert!(DeliveryState::Sent.is_in_flight());

        assert!(!DeliveryState::Delivered.is_in_flight());
        assert!(!DeliveryState::Failed.is_in_flight());
    }

    #[test]
    fn test_wire_roundtrip() {
        let states = [
            DeliveryState::Queued,
            DeliveryState::Sending,
            DeliveryState::Sent,
            DeliveryState::Delivered,
            DeliveryState::Undelivered,
            DeliveryState::Failed,
            DeliveryState::Canceled,
        ];

        for state in states {
            let recovered = DeliveryState::parse(state.as_str()).unwrap();
            assert_eq!(state, recovered);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(DeliveryState::parse("DELIVERED"), Some(DeliveryState::Delivered));
        assert_eq!(DeliveryState::parse(" Sent "), Some(DeliveryState::Sent));
    }

    #[test]
    fn test_unknown_wire_value() {
        assert!(DeliveryState::parse("accepted").is_none());
        assert!(DeliveryState::parse("").is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(DeliveryState::Queued.to_string(), "queued");
        assert_eq!(DeliveryState::Undelivered.to_string(), "undelivered");
    }
}
