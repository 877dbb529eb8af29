//! Batch Dispatcher
//!
//! Drives one bulk send run: submits each recipient through the carrier
//! gateway with a small pacing delay, spawns an independent delivery monitor
//! per accepted message, and folds the settled records into a batch report.
//! A send rejection never blocks the rest of the batch, and one message's
//! reconciliation never waits on another's.

use crate::carrier::{CarrierError, CarrierGateway, DeliveryState};
use crate::config::{BatchConfig, CacheConfig, MonitorConfig};
use crate::status::{
    CacheEntry, DeliveryMonitor, FailureReason, LogListener, MessageRecord, Outcome, StatusCache,
    StatusListener, StatusSource,
};
use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::{Duration, sleep};
use tracing::{error, info, warn};

/// Extra send retries on a transient provider error
const TRANSIENT_SEND_RETRIES: u32 = 2;

/// Per-recipient result of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct MessageResult {
    pub recipient: String,
    pub message_id: Option<String>,
    pub state: Option<DeliveryState>,
    pub state_label: String,
    pub outcome: Outcome,
    pub failure_reason: Option<FailureReason>,
    /// Carrier rejection code when the send itself failed
    pub send_error: Option<String>,
    pub attempts: u32,
}

impl MessageResult {
    fn from_record(record: &MessageRecord) -> Self {
        Self {
            recipient: record.recipient.clone(),
            message_id: Some(record.message_id.clone()),
            state: Some(record.current_state),
            state_label: record.current_state.describe().to_string(),
            outcome: record.outcome,
            failure_reason: record.failure_reason,
            send_error: None,
            attempts: record.attempts_made,
        }
    }

    fn send_rejected(recipient: &str, error: &CarrierError) -> Self {
        Self {
            recipient: recipient.to_string(),
            message_id: None,
            state: None,
            state_label: format!("send rejected: {}", error),
            outcome: Outcome::Failure,
            failure_reason: Some(FailureReason::SendRejected),
            send_error: Some(error.code().to_string()),
            attempts: 0,
        }
    }
}

/// Outcome counts plus per-recipient detail for one run
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub results: Vec<MessageResult>,
    pub delivered: usize,
    pub failed: usize,
    pub pending: usize,
}

impl BatchReport {
    fn from_results(results: Vec<MessageResult>) -> Self {
        let delivered = results
            .iter()
            .filter(|r| r.outcome == Outcome::Success)
            .count();
        let failed = results
            .iter()
            .filter(|r| r.outcome == Outcome::Failure)
            .count();
        let pending = results
            .iter()
            .filter(|r| r.outcome == Outcome::Pending)
            .count();
        Self {
            results,
            delivered,
            failed,
            pending,
        }
    }
}

/// Listener that keeps the shared per-recipient result slot current on
/// every monitor tick
struct ResultsListener {
    results: Arc<DashMap<String, MessageResult>>,
    inner: LogListener,
}

impl StatusListener for ResultsListener {
    fn on_update(&self, record: &MessageRecord) {
        self.inner.on_update(record);
        self.results
            .insert(record.recipient.clone(), MessageResult::from_record(record));
    }
}

/// Bulk send driver
pub struct BatchDispatcher {
    gateway: Arc<dyn CarrierGateway>,
    cache: Arc<StatusCache>,
    monitor_config: MonitorConfig,
    batch_config: BatchConfig,
    cache_config: CacheConfig,
    cancel: Arc<AtomicBool>,
}

impl BatchDispatcher {
    pub fn new(
        gateway: Arc<dyn CarrierGateway>,
        cache: Arc<StatusCache>,
        monitor_config: MonitorConfig,
        batch_config: BatchConfig,
        cache_config: CacheConfig,
    ) -> Self {
        Self {
            gateway,
            cache,
            monitor_config,
            batch_config,
            cache_config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel flag shared with every monitor this dispatcher spawns
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Abort in-flight monitors at their next tick
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Send `body` to every recipient and reconcile each message to a
    /// terminal verdict. Returns when every message has settled.
    pub async fn dispatch(&self, recipients: &[String], body: &str) -> BatchReport {
        let accepted = if recipients.len() > self.batch_config.max_batch_size {
            warn!(
                total = recipients.len(),
                cap = self.batch_config.max_batch_size,
                "Batch exceeds cap, extra recipients skipped this run"
            );
            &recipients[..self.batch_config.max_batch_size]
        } else {
            recipients
        };

        info!(count = accepted.len(), "Dispatching batch");

        let results: Arc<DashMap<String, MessageResult>> = Arc::new(DashMap::new());
        let listener: Arc<dyn StatusListener> = Arc::new(ResultsListener {
            results: results.clone(),
            inner: LogListener,
        });

        let mut handles = Vec::new();

        for (i, recipient) in accepted.iter().enumerate() {
            if i > 0 {
                sleep(Duration::from_millis(self.batch_config.send_spacing_ms)).await;
            }
            if self.cancel.load(Ordering::Relaxed) {
                warn!(remaining = accepted.len() - i, "Batch canceled mid-send");
                break;
            }

            match self.send_with_retry(recipient, body).await {
                Ok(receipt) => {
                    // Seed the cache so the status endpoint answers before
                    // the first poll tick; eviction piggybacks on the send path
                    self.cache.put(
                        &receipt.message_id,
                        CacheEntry::new(receipt.initial_state, recipient, StatusSource::DirectQuery),
                    );
                    self.cache.evict_older_than(self.cache_config.max_age());

                    let record =
                        MessageRecord::new(recipient, &receipt.message_id, receipt.initial_state);
                    results.insert(recipient.clone(), MessageResult::from_record(&record));

                    let monitor = DeliveryMonitor::new(
                        self.gateway.clone(),
                        self.cache.clone(),
                        self.monitor_config.clone(),
                        listener.clone(),
                        self.cancel.clone(),
                    );
                    handles.push(tokio::spawn(async move { monitor.watch(record).await }));
                }
                Err(e) => {
                    error!(recipient = %recipient, code = e.code(), error = %e, "Send rejected");
                    results.insert(recipient.clone(), MessageResult::send_rejected(recipient, &e));
                }
            }
        }

        for joined in join_all(handles).await {
            match joined {
                Ok(record) => {
                    results.insert(
                        record.recipient.clone(),
                        MessageResult::from_record(&record),
                    );
                }
                Err(e) => error!(error = %e, "Monitor task panicked"),
            }
        }

        // Report rows in the original recipient order
        let ordered = accepted
            .iter()
            .filter_map(|r| results.get(r).map(|entry| entry.clone()))
            .collect();

        let report = BatchReport::from_results(ordered);
        info!(
            delivered = report.delivered,
            failed = report.failed,
            pending = report.pending,
            "Batch settled"
        );
        report
    }

    /// One send, retrying only transient provider errors
    async fn send_with_retry(
        &self,
        recipient: &str,
        body: &str,
    ) -> Result<crate::carrier::SendReceipt, CarrierError> {
        let mut attempt = 0;
        loop {
            match self.gateway.send(recipient, body).await {
                Ok(receipt) => return Ok(receipt),
                Err(e) if e.is_retryable() && attempt < TRANSIENT_SEND_RETRIES => {
                    attempt += 1;
                    warn!(
                        recipient = %recipient,
                        attempt,
                        error = %e,
                        "Transient send error, retrying"
                    );
                    sleep(Duration::from_millis(self.batch_config.send_spacing_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
