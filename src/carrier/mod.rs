//! Carrier Gateway
//!
//! Outbound SMS transport, opaque behind the [`CarrierGateway`] trait.
//!
//! - [`TwilioGateway`] - Twilio-compatible Messages REST API client
//! - [`MockGateway`] - scripted gateway for tests and credential-less runs
//!
//! Send rejections and query failures collapse into the [`CarrierError`]
//! taxonomy; only transient provider errors are retryable.

pub mod client;
pub mod error;
pub mod mock;
pub mod state;
pub mod twilio;

pub use client::{CarrierGateway, SendReceipt, StateSnapshot};
pub use error::CarrierError;
pub use mock::MockGateway;
pub use state::DeliveryState;
pub use twilio::TwilioGateway;
