//! SMS Dispatch - bulk SMS with delivery status reconciliation
//!
//! Sends notification batches through a third-party carrier API and tracks
//! each message to an authoritative delivery verdict by reconciling three
//! racing sources of truth: direct provider queries, carrier webhook pushes
//! and a shared status cache.
//!
//! # Modules
//!
//! - [`carrier`] - carrier gateway trait, REST client, scripted mock
//! - [`status`] - message records, status cache, reconciliation monitor
//! - [`batch`] - bulk send driver and batch report
//! - [`gateway`] - HTTP server: webhook receiver + status query API
//! - [`config`] - YAML application config
//! - [`logging`] - tracing setup (file + stdout)

pub mod batch;
pub mod carrier;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod status;

// Convenient re-exports at crate root
pub use batch::{BatchDispatcher, BatchReport, MessageResult};
pub use carrier::{
    CarrierError, CarrierGateway, DeliveryState, MockGateway, SendReceipt, StateSnapshot,
    TwilioGateway,
};
pub use config::{AppConfig, CarrierMode, MonitorConfig};
pub use status::{
    CacheEntry, DeliveryMonitor, FailureReason, MessageRecord, Outcome, StatusCache, StatusSource,
};
