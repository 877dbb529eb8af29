//! Mock Carrier Gateway
//!
//! Scripted gateway for tests and for running the service without carrier
//! credentials. Sends hand out generated message ids; state queries replay a
//! per-message script, sticking on the last entry once the script runs out.

use super::client::{CarrierGateway, SendReceipt, StateSnapshot};
use super::error::CarrierError;
use super::state::DeliveryState;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;
use uuid::Uuid;

pub struct MockGateway {
    /// Initial state handed out on send
    initial_state: Mutex<DeliveryState>,
    /// Per-recipient send failures
    send_failures: Mutex<HashMap<String, CarrierError>>,
    /// Per-message scripted query results; the last entry repeats forever
    state_scripts: Mutex<HashMap<String, VecDeque<Result<StateSnapshot, CarrierError>>>>,
    /// Scripts staged by recipient, installed under the message id at send time
    staged_scripts: Mutex<HashMap<String, VecDeque<Result<StateSnapshot, CarrierError>>>>,
    /// Sent messages for verification: (recipient, body, message_id)
    sent: Mutex<Vec<(String, String, String)>>,
    send_count: AtomicUsize,
    fetch_count: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            initial_state: Mutex::new(DeliveryState::Queued),
            send_failures: Mutex::new(HashMap::new()),
            state_scripts: Mutex::new(HashMap::new()),
            staged_scripts: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            send_count: AtomicUsize::new(0),
            fetch_count: AtomicUsize::new(0),
        }
    }

    /// Override the initial state stamped on future sends
    pub fn set_initial_state(&self, state: DeliveryState) {
        *self.initial_state.lock().unwrap() = state;
    }

    /// Make `send` fail for one recipient
    pub fn fail_send(&self, recipient: &str, error: CarrierError) {
        self.send_failures
            .lock()
            .unwrap()
            .insert(recipient.to_string(), error);
    }

    /// Script the answers `fetch_state` returns for one message id.
    /// Once the script is down to its last entry, that entry repeats.
    pub fn script_states(
        &self,
        message_id: &str,
        results: Vec<Result<StateSnapshot, CarrierError>>,
    ) {
        self.state_scripts
            .lock()
            .unwrap()
            .insert(message_id.to_string(), results.into());
    }

    /// Shorthand: script a sequence of plain states
    pub fn script_plain(&self, message_id: &str, states: Vec<DeliveryState>) {
        self.script_states(
            message_id,
            states.into_iter().map(|s| Ok(StateSnapshot::of(s))).collect(),
        );
    }

    /// Stage a script before the message id exists: it is installed under
    /// whatever id the next `send` to this recipient gets.
    pub fn script_recipient(&self, recipient: &str, states: Vec<DeliveryState>) {
        self.staged_scripts.lock().unwrap().insert(
            recipient.to_string(),
            states
                .into_iter()
                .map(|s| Ok(StateSnapshot::of(s)))
                .collect(),
        );
    }

    pub fn send_count(&self) -> usize {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Messages sent so far: (recipient, body, message_id)
    pub fn sent_messages(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Message id assigned to a recipient, if the send went through
    pub fn message_id_for(&self, recipient: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .find(|(r, _, _)| r == recipient)
            .map(|(_, _, id)| id.clone())
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CarrierGateway for MockGateway {
    async fn send(&self, recipient: &str, body: &str) -> Result<SendReceipt, CarrierError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self.send_failures.lock().unwrap().get(recipient) {
            return Err(err.clone());
        }

        let message_id = format!("SM{}", Uuid::new_v4().simple());
        debug!(recipient, message_id = %message_id, "Mock send accepted");

        if let Some(script) = self.staged_scripts.lock().unwrap().remove(recipient) {
            self.state_scripts
                .lock()
                .unwrap()
                .insert(message_id.clone(), script);
        }

        self.sent.lock().unwrap().push((
            recipient.to_string(),
            body.to_string(),
            message_id.clone(),
        ));

        Ok(SendReceipt {
            message_id,
            initial_state: *self.initial_state.lock().unwrap(),
        })
    }

    async fn fetch_state(&self, message_id: &str) -> Result<StateSnapshot, CarrierError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let mut scripts = self.state_scripts.lock().unwrap();
        let Some(script) = scripts.get_mut(message_id) else {
            return Err(CarrierError::NotFound(message_id.to_string()));
        };

        match script.len() {
            0 => Err(CarrierError::NotFound(message_id.to_string())),
            1 => script.front().cloned().unwrap(),
            _ => script.pop_front().unwrap(),
        }
    }
}
