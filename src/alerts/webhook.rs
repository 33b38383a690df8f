//! HTTP webhook alert transport

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{AlertConfig, AlertDeliveryError, AlertPayload, AlertSink, DeliveryReceipt};

/// POSTs alerts as JSON to a fixed URL
#[derive(Clone)]
pub struct WebhookAlertSink {
    client: Client,
    url: String,
    token: Option<String>,
}

impl WebhookAlertSink {
    pub fn new(config: &AlertConfig) -> Result<Self, AlertDeliveryError> {
        let url = match config.webhook_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => return Err(AlertDeliveryError::Unconfigured("webhook_url is not set".to_string())),
        };

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AlertDeliveryError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            token: config.webhook_token.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    fn transport(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, message: &str, subject: &str) -> Result<DeliveryReceipt, AlertDeliveryError> {
        let payload = AlertPayload::new(message, subject);

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AlertDeliveryError::Transport(format!("POST {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertDeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Alert {} accepted by {}", payload.id, self.url);
        Ok(payload.receipt(self.transport()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertTransport;

    fn webhook_config(url: Option<&str>) -> AlertConfig {
        AlertConfig {
            transport: AlertTransport::Webhook,
            webhook_url: url.map(str::to_string),
            timeout_ms: 1000,
            ..AlertConfig::default()
        }
    }

    #[test]
    fn test_missing_url_is_unconfigured() {
        for url in [None, Some(""), Some("   ")] {
            assert!(matches!(
                WebhookAlertSink::new(&webhook_config(url)),
                Err(AlertDeliveryError::Unconfigured(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) is closed on test hosts.
        let sink = WebhookAlertSink::new(&webhook_config(Some("http://127.0.0.1:9/alerts"))).unwrap();
        assert_eq!(sink.url(), "http://127.0.0.1:9/alerts");

        let err = sink.notify("dry", "Humidity Alert - Plot 1").await.unwrap_err();
        assert!(matches!(err, AlertDeliveryError::Transport(_)));
    }
}
