//! Alert module - best-effort notification transports

mod mqtt;
mod webhook;

pub use mqtt::*;
pub use webhook::*;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Which transport delivers alerts
    pub transport: AlertTransport,

    /// Upper bound on a single delivery attempt
    pub timeout_ms: u64,

    /// MQTT
    pub mqtt_broker: String,
    pub mqtt_port: u16,
    pub mqtt_client_id: String,
    pub mqtt_topic: String,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,

    /// Webhook
    pub webhook_url: Option<String>,
    pub webhook_token: Option<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            transport: AlertTransport::None,
            timeout_ms: 5000,

            mqtt_broker: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_client_id: "farmtech".to_string(),
            mqtt_topic: "farmtech/alerts".to_string(),
            mqtt_username: None,
            mqtt_password: None,

            webhook_url: None,
            webhook_token: None,
        }
    }
}

impl AlertConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Alert transport
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertTransport {
    None,
    Mqtt,
    Webhook,
}

impl AlertTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertTransport::None => "none",
            AlertTransport::Mqtt => "mqtt",
            AlertTransport::Webhook => "webhook",
        }
    }
}

/// Why an alert did not go out
#[derive(Debug, Error)]
pub enum AlertDeliveryError {
    #[error("alert transport is not configured: {0}")]
    Unconfigured(String),

    #[error("alert delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("alert transport failed: {0}")]
    Transport(String),

    #[error("alert rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Proof that a transport accepted an alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub transport: String,
    pub message_id: Uuid,
    pub delivered_at: DateTime<Utc>,
}

/// Wire body shared by the MQTT and webhook transports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub id: Uuid,
    pub subject: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

impl AlertPayload {
    pub fn new(message: &str, subject: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.to_string(),
            message: message.to_string(),
            sent_at: Utc::now(),
        }
    }

    pub fn receipt(&self, transport: &str) -> DeliveryReceipt {
        DeliveryReceipt {
            transport: transport.to_string(),
            message_id: self.id,
            delivered_at: Utc::now(),
        }
    }
}

/// External notification transport.
///
/// Implementations receive their configuration at construction time.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Short transport name used in logs and receipts
    fn transport(&self) -> &str;

    async fn notify(&self, message: &str, subject: &str) -> Result<DeliveryReceipt, AlertDeliveryError>;
}

/// Sink used when no transport is configured; every notify fails.
pub struct UnconfiguredSink {
    reason: String,
}

impl UnconfiguredSink {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl AlertSink for UnconfiguredSink {
    fn transport(&self) -> &str {
        "none"
    }

    async fn notify(&self, _message: &str, _subject: &str) -> Result<DeliveryReceipt, AlertDeliveryError> {
        Err(AlertDeliveryError::Unconfigured(self.reason.clone()))
    }
}

/// Sink standing in for a transport that could not be built; every notify fails.
pub struct FailedSink {
    transport: String,
    error: String,
}

impl FailedSink {
    pub fn new(transport: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            transport: transport.into(),
            error: error.into(),
        }
    }
}

#[async_trait]
impl AlertSink for FailedSink {
    fn transport(&self) -> &str {
        &self.transport
    }

    async fn notify(&self, _message: &str, _subject: &str) -> Result<DeliveryReceipt, AlertDeliveryError> {
        Err(AlertDeliveryError::Transport(format!(
            "{} sink could not be built: {}",
            self.transport, self.error
        )))
    }
}

/// Build the sink selected by `config`.
///
/// Never fails: a transport that cannot be built is replaced by a sink whose
/// every delivery fails, so cycles still persist their readings.
pub async fn build_sink(config: &AlertConfig) -> Arc<dyn AlertSink> {
    let built: Result<Arc<dyn AlertSink>, AlertDeliveryError> = match config.transport {
        AlertTransport::None => {
            return Arc::new(UnconfiguredSink::new("no alert transport selected"));
        }
        AlertTransport::Mqtt => MqttAlertSink::new(config).await.map(|s| Arc::new(s) as Arc<dyn AlertSink>),
        AlertTransport::Webhook => WebhookAlertSink::new(config).map(|s| Arc::new(s) as Arc<dyn AlertSink>),
    };

    sink_or_fallback(config.transport, built)
}

fn sink_or_fallback(
    transport: AlertTransport,
    built: Result<Arc<dyn AlertSink>, AlertDeliveryError>,
) -> Arc<dyn AlertSink> {
    match built {
        Ok(sink) => {
            info!("Alert transport ready: {}", sink.transport());
            sink
        }
        Err(AlertDeliveryError::Unconfigured(reason)) => {
            warn!("Alerts disabled: {}", reason);
            Arc::new(UnconfiguredSink::new(reason))
        }
        Err(e) => {
            warn!("Alert transport {} unavailable: {}", transport.as_str(), e);
            Arc::new(FailedSink::new(transport.as_str(), e.to_string()))
        }
    }
}

/// One delivery attempt bounded by `timeout`.
pub async fn deliver(
    sink: &dyn AlertSink,
    message: &str,
    subject: &str,
    timeout: Duration,
) -> Result<DeliveryReceipt, AlertDeliveryError> {
    match tokio::time::timeout(timeout, sink.notify(message, subject)).await {
        Ok(result) => result,
        Err(_) => Err(AlertDeliveryError::Timeout(timeout)),
    }
}
