//! End-to-end reconciliation scenarios through the public API.
//!
//! Everything runs against the scripted mock gateway with millisecond
//! timers; no network or carrier credentials involved.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use sms_dispatch::batch::BatchDispatcher;
use sms_dispatch::carrier::{CarrierError, CarrierGateway, DeliveryState, MockGateway};
use sms_dispatch::config::{BatchConfig, CacheConfig, MonitorConfig};
use sms_dispatch::gateway::handlers::{StatusCallback, apply_status_callback};
use sms_dispatch::status::{
    DeliveryMonitor, FailureReason, LogListener, MessageRecord, Outcome, StatusCache, StatusSource,
};

fn fast_monitor_config(max_attempts: u32) -> MonitorConfig {
    MonitorConfig {
        initial_delay_ms: 1,
        check_interval_ms: 1,
        max_attempts,
        ..MonitorConfig::default()
    }
}

fn fast_batch_config() -> BatchConfig {
    BatchConfig {
        send_spacing_ms: 0,
        max_batch_size: 50,
    }
}

fn callback(sid: &str, recipient: &str, status: &str) -> StatusCallback {
    StatusCallback {
        message_sid: sid.to_string(),
        message_status: status.to_string(),
        to: recipient.to_string(),
        from: Some("+50210000000".to_string()),
        error_code: None,
        error_message: None,
    }
}

/// A mixed batch: one delivered, one rejected at send, one stuck in SENT
/// until the budget runs out. Counts are reported distinctly and no failure
/// blocks another message.
#[tokio::test]
async fn mixed_batch_settles_every_message() {
    let gateway = Arc::new(MockGateway::new());
    let cache = Arc::new(StatusCache::new());

    gateway.script_recipient(
        "+50211111111",
        vec![
            DeliveryState::Queued,
            DeliveryState::Sent,
            DeliveryState::Delivered,
        ],
    );
    gateway.fail_send("+50222222222", CarrierError::UnsupportedRecipientType);
    gateway.script_recipient("+50233333333", vec![DeliveryState::Sent]);

    let dispatcher = BatchDispatcher::new(
        gateway.clone(),
        cache.clone(),
        fast_monitor_config(5),
        fast_batch_config(),
        CacheConfig::default(),
    );

    let recipients = vec![
        "+50211111111".to_string(),
        "+50222222222".to_string(),
        "+50233333333".to_string(),
    ];
    let report = dispatcher.dispatch(&recipients, "aviso institucional").await;

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(report.pending, 0);

    let delivered = &report.results[0];
    assert_eq!(delivered.outcome, Outcome::Success);
    assert_eq!(delivered.state, Some(DeliveryState::Delivered));

    let rejected = &report.results[1];
    assert_eq!(rejected.failure_reason, Some(FailureReason::SendRejected));
    assert!(rejected.message_id.is_none(), "rejected send gets no id");

    let unconfirmed = &report.results[2];
    assert_eq!(
        unconfirmed.failure_reason,
        Some(FailureReason::SentUnconfirmed)
    );
    assert_eq!(unconfirmed.attempts, 5);

    // Only the two accepted messages ever reached the provider
    assert_eq!(gateway.sent_messages().len(), 2);
}

/// The webhook receiver and the poller share only the cache: when the
/// provider stops answering queries, a pushed terminal state still settles
/// the record through the cache fallback.
#[tokio::test]
async fn webhook_push_settles_record_when_provider_is_down() {
    let gateway = Arc::new(MockGateway::new());
    let cache = Arc::new(StatusCache::new());

    let receipt = gateway.send("+50244444444", "aviso").await.unwrap();
    gateway.script_states(
        &receipt.message_id,
        vec![Err(CarrierError::TransientProvider(
            "connection reset".into(),
        ))],
    );

    // Carrier pushes the terminal state to the webhook endpoint
    apply_status_callback(
        &cache,
        callback(&receipt.message_id, "+50244444444", "undelivered"),
    );

    let monitor = DeliveryMonitor::new(
        gateway,
        cache,
        fast_monitor_config(10),
        Arc::new(LogListener),
        Arc::new(AtomicBool::new(false)),
    );
    let record = MessageRecord::new("+50244444444", &receipt.message_id, receipt.initial_state);
    let settled = monitor.watch(record).await;

    assert_eq!(settled.outcome, Outcome::Failure);
    assert_eq!(settled.failure_reason, Some(FailureReason::CarrierReported));
    assert_eq!(settled.current_state, DeliveryState::Undelivered);
    assert_eq!(settled.observation_source, Some(StatusSource::CacheFallback));
}

/// The batch seeds the cache at send time, so the status query surface
/// answers before the first poll tick, and a webhook for an unknown message
/// id still lands (receiver and monitors are not synchronized).
#[tokio::test]
async fn cache_is_seeded_at_send_and_open_to_webhooks() {
    let gateway = Arc::new(MockGateway::new());
    let cache = Arc::new(StatusCache::new());

    gateway.script_recipient("+50255555555", vec![DeliveryState::Delivered]);

    let dispatcher = BatchDispatcher::new(
        gateway.clone(),
        cache.clone(),
        fast_monitor_config(3),
        fast_batch_config(),
        CacheConfig::default(),
    );
    dispatcher
        .dispatch(&["+50255555555".to_string()], "aviso")
        .await;

    let message_id = gateway.message_id_for("+50255555555").unwrap();
    let entry = cache.get(&message_id).unwrap();
    assert_eq!(entry.state, DeliveryState::Delivered);
    assert_eq!(entry.recipient, "+50255555555");

    // A push for a message this process never sent is cached all the same
    apply_status_callback(&cache, callback("SM_external", "+50266666666", "sent"));
    assert_eq!(cache.get("SM_external").unwrap().state, DeliveryState::Sent);
}

/// Canceling the batch settles every in-flight monitor with a canceled
/// verdict instead of leaving records pending.
#[tokio::test]
async fn cancellation_settles_in_flight_monitors() {
    let gateway = Arc::new(MockGateway::new());
    let cache = Arc::new(StatusCache::new());

    // Never reaches a terminal state on its own
    gateway.script_recipient("+50277777777", vec![DeliveryState::Queued]);

    let dispatcher = BatchDispatcher::new(
        gateway,
        cache,
        MonitorConfig {
            initial_delay_ms: 1,
            check_interval_ms: 1,
            max_attempts: 10_000,
            ..MonitorConfig::default()
        },
        fast_batch_config(),
        CacheConfig::default(),
    );

    let cancel = dispatcher.cancel_flag();
    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        cancel.store(true, std::sync::atomic::Ordering::Relaxed);
    });

    let report = dispatcher
        .dispatch(&["+50277777777".to_string()], "aviso")
        .await;

    assert_eq!(report.pending, 0);
    assert_eq!(report.failed, 1);
    assert_eq!(
        report.results[0].failure_reason,
        Some(FailureReason::Canceled)
    );
}
