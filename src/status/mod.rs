//! Delivery Status Reconciliation
//!
//! Merges three racing sources of truth about a sent message - direct
//! provider queries, carrier webhook pushes, and the shared status cache -
//! into one settled verdict per message.
//!
//! # Flow
//!
//! ```text
//! send -> MessageRecord -> DeliveryMonitor tick loop
//!              [ provider query || webhook push ] -> StatusCache
//!                         read, accept, classify
//!              -> terminal state | budget exhausted | canceled
//! ```
//!
//! # Invariants
//!
//! 1. A record's outcome settles PENDING -> {SUCCESS | FAILURE} exactly once
//! 2. Query failures are swallowed and retried; the loop never aborts
//! 3. A terminal cache state is never downgraded by a stale observation

pub mod cache;
pub mod monitor;
pub mod record;


pub use cache::{CacheEntry, StatusCache};
pub use monitor::{DeliveryMonitor, LogListener, StatusListener};
pub use record::{FailureReason, MessageRecord, Outcome, StatusSource};
