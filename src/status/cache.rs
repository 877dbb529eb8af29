//! Status Cache
//!
//! Shared last-known-state store keyed by message id, written by both the
//! webhook receiver and the reconciliation loop, read by the loop's cache
//! fallback and the status query endpoint.
//!
//! Writes are last-write-wins with one guard: a terminal state already
//! recorded is never downgraded by a non-terminal observation (a late
//! `sent` webhook cannot regress a polled `delivered`).

use super::record::StatusSource;
use crate::carrier::DeliveryState;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

/// Last known state of one in-flight message
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub state: DeliveryState,
    pub recipient: String,
    pub error_code: Option<i64>,
    pub error_detail: Option<String>,
    pub observed_at: DateTime<Utc>,
    pub source: StatusSource,
}

impl CacheEntry {
    pub fn new(state: DeliveryState, recipient: &str, source: StatusSource) -> Self {
        Self {
            state,
            recipient: recipient.to_string(),
            error_code: None,
            error_detail: None,
            observed_at: Utc::now(),
            source,
        }
    }

    pub fn with_error(mut self, code: Option<i64>, detail: Option<String>) -> Self {
        self.error_code = code;
        self.error_detail = detail;
        self
    }
}

/// Concurrent status cache. Single-key reads and writes are atomic; no read
/// blocks a write.
pub struct StatusCache {
    entries: DashMap<String, CacheEntry>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Store the latest observation for a message. Last write wins, except
    /// that a recorded terminal state is never downgraded to a non-terminal
    /// one.
    pub fn put(&self, message_id: &str, entry: CacheEntry) {
        if !entry.state.is_terminal()
            && let Some(existing) = self.entries.get(message_id)
            && existing.state.is_terminal()
        {
            debug!(
                message_id,
                recorded = %existing.state,
                incoming = %entry.state,
                "Dropping stale non-terminal observation for settled message"
            );
            return;
        }
        self.entries.insert(message_id.to_string(), entry);
    }

    pub fn get(&self, message_id: &str) -> Option<CacheEntry> {
        self.entries.get(message_id).map(|e| e.clone())
    }

    /// Drop entries whose observation predates `now - max_age`. Called
    /// opportunistically from the send path, not on its own schedule.
    pub fn evict_older_than(&self, max_age: Duration) {
        let cutoff = Utc::now() - max_age;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.observed_at >= cutoff);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, "Evicted stale status cache entries");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_get_returns_written_entry() {
        let cache = StatusCache::new();
        cache.put(
            "SM1",
            CacheEntry::new(DeliveryState::Sent, "+50211111111", StatusSource::Webhook),
        );

        let entry = cache.get("SM1").unwrap();
        assert_eq!(entry.state, DeliveryState::Sent);
        assert_eq!(entry.recipient, "+50211111111");
        assert_eq!(entry.source, StatusSource::Webhook);
    }

    #[test]
    fn test_get_absent_key() {
        let cache = StatusCache::new();
        assert!(cache.get("SM404").is_none());
    }

    #[test]
    fn test_last_write_wins_between_in_flight_states() {
        let cache = StatusCache::new();
        cache.put(
            "SM1",
            CacheEntry::new(DeliveryState::Queued, "+502", StatusSource::DirectQuery),
        );
        cache.put(
            "SM1",
            CacheEntry::new(DeliveryState::Sent, "+502", StatusSource::Webhook),
        );

        assert_eq!(cache.get("SM1").unwrap().state, DeliveryState::Sent);
    }

    #[test]
    fn test_terminal_state_is_not_downgraded() {
        let cache = StatusCache::new();
        cache.put(
            "SM1",
            CacheEntry::new(DeliveryState::Delivered, "+502", StatusSource::DirectQuery),
        );

        // Late-arriving webhook with a stale in-flight state
        cache.put(
            "SM1",
            CacheEntry::new(DeliveryState::Sent, "+502", StatusSource::Webhook),
        );

        assert_eq!(cache.get("SM1").unwrap().state, DeliveryState::Delivered);
    }

    #[test]
    fn test_terminal_state_may_be_replaced_by_terminal() {
        let cache = StatusCache::new();
        cache.put(
            "SM1",
            CacheEntry::new(DeliveryState::Undelivered, "+502", StatusSource::Webhook),
        );
        cache.put(
            "SM1",
            CacheEntry::new(DeliveryState::Delivered, "+502", StatusSource::DirectQuery),
        );

        assert_eq!(cache.get("SM1").unwrap().state, DeliveryState::Delivered);
    }

    #[test]
    fn test_eviction_by_age() {
        let cache = StatusCache::new();
        let mut old = CacheEntry::new(DeliveryState::Sent, "+502", StatusSource::Webhook);
        old.observed_at = Utc::now() - Duration::hours(48);
        cache.put("SM_old", old);
        cache.put(
            "SM_new",
            CacheEntry::new(DeliveryState::Sent, "+502", StatusSource::Webhook),
        );

        cache.evict_older_than(Duration::hours(24));

        assert!(cache.get("SM_old").is_none());
        assert!(cache.get("SM_new").is_some());
        assert_eq!(cache.len(), 1);
    }
}
