//! Twilio Gateway Implementation
//!
//! Talks to the Twilio-compatible Messages REST API: form-encoded POST to
//! create a message, GET by message sid to query its current status.
//! Provider error codes are collapsed into the `CarrierError` taxonomy.

use super::client::{CarrierGateway, SendReceipt, StateSnapshot};
use super::error::CarrierError;
use super::state::DeliveryState;
use crate::config::CarrierConfig;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Message resource as the Messages API returns it
#[derive(Deserialize, Debug)]
struct MessageResource {
    sid: String,
    status: String,
    error_code: Option<i64>,
    error_message: Option<String>,
}

/// Error envelope returned on non-2xx responses
#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

/// Carrier gateway backed by the Twilio Messages REST API
pub struct TwilioGateway {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
    /// Webhook URL the carrier pushes status callbacks to, if configured
    status_callback_url: Option<String>,
}

impl TwilioGateway {
    pub fn new(config: &CarrierConfig) -> Result<Self, CarrierError> {
        info!(
            "Initializing carrier gateway at {} (from: {})",
            config.base_url, config.from_number
        );

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                CarrierError::TransientProvider(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
            status_callback_url: config.status_callback_url.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }

    fn message_url(&self, message_id: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages/{}.json",
            self.base_url, self.account_sid, message_id
        )
    }

    /// Turn a non-2xx response into a `CarrierError`
    async fn classify_failure(&self, response: reqwest::Response) -> CarrierError {
        let http_status = response.status().as_u16();
        match response.json::<ApiErrorBody>().await {
            Ok(body) => {
                let detail = body.message.unwrap_or_default();
                match body.code {
                    Some(code) => CarrierError::from_provider_code(code, &detail, http_status),
                    None => CarrierError::from_http_status(http_status, &detail),
                }
            }
            Err(_) => CarrierError::from_http_status(http_status, "unreadable error body"),
        }
    }

    /// The provider reports a handful of statuses outside the tracked
    /// lifecycle ("accepted", "receiving"). Those are all pre-handoff, so
    /// they coerce to QUEUED.
    fn coerce_state(wire: &str) -> DeliveryState {
        DeliveryState::parse(wire).unwrap_or(DeliveryState::Queued)
    }
}

#[async_trait]
impl CarrierGateway for TwilioGateway {
    async fn send(&self, recipient: &str, body: &str) -> Result<SendReceipt, CarrierError> {
        let mut form = vec![
            ("To", recipient.to_string()),
            ("From", self.from_number.clone()),
            ("Body", body.to_string()),
        ];
        if let Some(ref callback) = self.status_callback_url {
            form.push(("StatusCallback", callback.clone()));
        }

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.classify_failure(response).await);
        }

        let resource: MessageResource = response.json().await.map_err(|e| {
            CarrierError::TransientProvider(format!("Unparseable send response: {}", e))
        })?;

        let initial_state = Self::coerce_state(&resource.status);
        info!(
            message_id = %resource.sid,
            state = %initial_state,
            "Message accepted by carrier"
        );

        Ok(SendReceipt {
            message_id: resource.sid,
            initial_state,
        })
    }

    async fn fetch_state(&self, message_id: &str) -> Result<StateSnapshot, CarrierError> {
        let response = self
            .client
            .get(self.message_url(message_id))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            debug!(message_id, "Provider has no record of message");
            return Err(CarrierError::NotFound(message_id.to_string()));
        }
        if !response.status().is_success() {
            let err = self.classify_failure(response).await;
            warn!(message_id, error = %err, "State query failed");
            return Err(err);
        }

        let resource: MessageResource = response.json().await.map_err(|e| {
            CarrierError::TransientProvider(format!("Unparseable state response: {}", e))
        })?;

        Ok(StateSnapshot {
            state: Self::coerce_state(&resource.status),
            error_code: resource.error_code,
            error_detail: resource.error_message,
        })
    }
}
