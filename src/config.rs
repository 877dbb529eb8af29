use crate::carrier::DeliveryState;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub carrier: CarrierConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Which carrier gateway implementation to run
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CarrierMode {
    Twilio,
    /// Scripted gateway, no credentials required
    #[default]
    Mock,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CarrierConfig {
    pub mode: CarrierMode,
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number the carrier account owns
    pub from_number: String,
    /// Public URL of this service's webhook endpoint, sent with each message
    /// so the carrier pushes status callbacks back to us
    pub status_callback_url: Option<String>,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            mode: CarrierMode::Mock,
            base_url: "https://api.twilio.com".to_string(),
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            status_callback_url: None,
        }
    }
}

/// Reconciliation loop knobs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitorConfig {
    /// Quiet period before the first state check
    pub initial_delay_ms: u64,
    /// Wait between reconciliation ticks
    pub check_interval_ms: u64,
    /// Retry budget per message (30 ticks at 10s is ~5 minutes)
    pub max_attempts: u32,
    /// State names the loop stops on
    pub final_states: Vec<String>,
    /// Classify a message stuck in SENT at budget exhaustion as a failure
    /// rather than presuming delivery
    pub stale_sent_is_failure: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 5000,
            check_interval_ms: 10000,
            max_attempts: 30,
            final_states: vec![
                "delivered".to_string(),
                "undelivered".to_string(),
                "failed".to_string(),
                "canceled".to_string(),
            ],
            stale_sent_is_failure: true,
        }
    }
}

impl MonitorConfig {
    /// Whether the loop should stop on this state
    pub fn is_final(&self, state: DeliveryState) -> bool {
        self.final_states
            .iter()
            .any(|name| name.eq_ignore_ascii_case(state.as_str()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchConfig {
    /// Spacing between consecutive sends to the provider
    pub send_spacing_ms: u64,
    /// Hard cap on recipients per run
    pub max_batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            send_spacing_ms: 500,
            max_batch_size: 50,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Entries older than this are dropped on send-path eviction
    pub max_age_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_age_hours: 24 }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_age_hours)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "sms_dispatch.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            gateway: GatewayConfig::default(),
            carrier: CarrierConfig::default(),
            monitor: MonitorConfig::default(),
            batch: BatchConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.initial_delay_ms, 5000);
        assert_eq!(config.check_interval_ms, 10000);
        assert_eq!(config.max_attempts, 30);
        assert!(config.stale_sent_is_failure);
        assert_eq!(config.final_states.len(), 4);
    }

    #[test]
    fn test_is_final_follows_configured_names() {
        let config = MonitorConfig::default();
        assert!(config.is_final(DeliveryState::Delivered));
        assert!(config.is_final(DeliveryState::Undelivered));
        assert!(config.is_final(DeliveryState::Failed));
        assert!(config.is_final(DeliveryState::Canceled));
        assert!(!config.is_final(DeliveryState::Sent));
        assert!(!config.is_final(DeliveryState::Queued));

        // The stop set is config-driven, not hardwired to the enum
        let narrowed = MonitorConfig {
            final_states: vec!["delivered".to_string()],
            ..MonitorConfig::default()
        };
        assert!(!narrowed.is_final(DeliveryState::Failed));
    }

    #[test]
    fn test_yaml_parsing_with_defaults() {
        let yaml = r#"
log_level: "debug"
log_dir: "./logs"
log_file: "test.log"
use_json: false
rotation: "never"
gateway:
  host: "127.0.0.1"
  port: 9090
monitor:
  initial_delay_ms: 100
  check_interval_ms: 200
  max_attempts: 5
  final_states: ["delivered", "failed"]
  stale_sent_is_failure: false
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.gateway.port, 9090);
        assert_eq!(config.monitor.max_attempts, 5);
        assert!(!config.monitor.stale_sent_is_failure);
        // Omitted sections fall back to defaults
        assert_eq!(config.batch.send_spacing_ms, 500);
        assert_eq!(config.cache.max_age_hours, 24);
        assert_eq!(config.carrier.mode, CarrierMode::Mock);
    }
}
