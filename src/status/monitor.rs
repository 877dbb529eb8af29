//! Delivery Monitor - per-message status reconciliation loop
//!
//! One monitor task watches one sent message: after an initial quiet period
//! it queries the provider on a fixed interval, falling back to the shared
//! status cache when the query fails, until the message reaches a terminal
//! state or the retry budget runs out. Query failures are never fatal; the
//! loop always ends in a settled record.

use super::cache::{CacheEntry, StatusCache};
use super::record::{FailureReason, MessageRecord, Outcome, StatusSource};
use crate::carrier::{CarrierGateway, DeliveryState, StateSnapshot};
use crate::config::MonitorConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

/// Observer for per-tick progress and the final verdict.
///
/// Updates are idempotent: replaying the same record state is safe.
pub trait StatusListener: Send + Sync {
    fn on_update(&self, record: &MessageRecord);
}

/// Default listener that just logs progress
pub struct LogListener;

impl StatusListener for LogListener {
    fn on_update(&self, record: &MessageRecord) {
        info!(
            recipient = %record.recipient,
            message_id = %record.message_id,
            state = %record.current_state,
            attempt = record.attempts_made,
            status = record.current_state.describe(),
            "Delivery status update"
        );
    }
}

/// Per-message status reconciliation loop
pub struct DeliveryMonitor {
    gateway: Arc<dyn CarrierGateway>,
    cache: Arc<StatusCache>,
    config: MonitorConfig,
    listener: Arc<dyn StatusListener>,
    /// Checked at the top of each tick; set by the batch to abort in-flight monitors
    cancel: Arc<AtomicBool>,
}

impl DeliveryMonitor {
    pub fn new(
        gateway: Arc<dyn CarrierGateway>,
        cache: Arc<StatusCache>,
        config: MonitorConfig,
        listener: Arc<dyn StatusListener>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            gateway,
            cache,
            config,
            listener,
            cancel,
        }
    }

    /// Watch one message until it settles. Consumes and returns the record.
    pub async fn watch(&self, mut record: MessageRecord) -> MessageRecord {
        debug!(
            recipient = %record.recipient,
            message_id = %record.message_id,
            initial_state = %record.current_state,
            "Starting delivery monitor"
        );

        // Quiet period: the provider needs a moment to process the send
        sleep(Duration::from_millis(self.config.initial_delay_ms)).await;

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                record.settle(Outcome::Failure, Some(FailureReason::Canceled));
                self.listener.on_update(&record);
                info!(
                    recipient = %record.recipient,
                    message_id = %record.message_id,
                    "Monitor canceled"
                );
                return record;
            }

            record.attempts_made += 1;

            if let Some((snapshot, source)) = self.observe(&record).await {
                record.accept_observation(snapshot.state, source);

                if self.config.is_final(snapshot.state) {
                    let (outcome, reason) = classify_terminal(snapshot.state);
                    record.settle(outcome, reason);
                    self.listener.on_update(&record);
                    info!(
                        recipient = %record.recipient,
                        message_id = %record.message_id,
                        state = %record.current_state,
                        attempts = record.attempts_made,
                        source = %source,
                        "Terminal state reached"
                    );
                    return record;
                }

                self.listener.on_update(&record);
            }

            if record.attempts_made >= self.config.max_attempts {
                let (outcome, reason) = self.classify_timeout(record.current_state);
                record.settle(outcome, reason);
                self.listener.on_update(&record);
                warn!(
                    recipient = %record.recipient,
                    message_id = %record.message_id,
                    last_state = %record.current_state,
                    attempts = record.attempts_made,
                    "Retry budget exhausted"
                );
                return record;
            }

            sleep(Duration::from_millis(self.config.check_interval_ms)).await;
        }
    }

    /// One reconciliation query: provider first, cache fallback second.
    /// Returns None when neither source yields data this tick.
    async fn observe(&self, record: &MessageRecord) -> Option<(StateSnapshot, StatusSource)> {
        match self.gateway.fetch_state(&record.message_id).await {
            Ok(snapshot) => {
                // Write through so the status endpoint and late fallbacks see it
                self.cache.put(
                    &record.message_id,
                    CacheEntry::new(snapshot.state, &record.recipient, StatusSource::DirectQuery)
                        .with_error(snapshot.error_code, snapshot.error_detail.clone()),
                );
                Some((snapshot, StatusSource::DirectQuery))
            }
            Err(e) => {
                warn!(
                    message_id = %record.message_id,
                    attempt = record.attempts_made,
                    error = %e,
                    "Provider query failed, falling back to status cache"
                );
                match self.cache.get(&record.message_id) {
                    Some(entry) => Some((
                        StateSnapshot {
                            state: entry.state,
                            error_code: entry.error_code,
                            error_detail: entry.error_detail,
                        },
                        StatusSource::CacheFallback,
                    )),
                    None => {
                        debug!(
                            message_id = %record.message_id,
                            "No observation this tick (provider failed, cache empty)"
                        );
                        None
                    }
                }
            }
        }
    }

    /// Classify a record whose retry budget ran out while still in flight.
    ///
    /// Prolonged SENT without a handset confirmation is treated as
    /// non-delivery. That is a product policy, not a carrier fact, so it
    /// stays behind the `stale_sent_is_failure` knob; turning the knob off
    /// presumes delivery instead.
    fn classify_timeout(&self, last_state: DeliveryState) -> (Outcome, Option<FailureReason>) {
        if last_state == DeliveryState::Sent {
            if self.config.stale_sent_is_failure {
                return (Outcome::Failure, Some(FailureReason::SentUnconfirmed));
            }
            return (Outcome::Success, None);
        }
        (Outcome::Failure, Some(FailureReason::TimedOut))
    }
}

/// Literal state-to-outcome mapping for terminal states
fn classify_terminal(state: DeliveryState) -> (Outcome, Option<FailureReason>) {
    if state == DeliveryState::Delivered {
        (Outcome::Success, None)
    } else {
        (Outcome::Failure, Some(FailureReason::CarrierReported))
    }
}
