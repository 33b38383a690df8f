// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! MQTT alert transport
//!
//! The spawned event loop reports connection state and packet ids back to
//! [`MqttAlertSink::notify`], which only returns a receipt once the broker
//! has acknowledged the publish.

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{AlertConfig, AlertDeliveryError, AlertPayload, AlertSink, DeliveryReceipt};

/// Connection state as last seen by the event loop
#[derive(Debug, Clone, PartialEq)]
enum LinkState {
    Connecting,
    Connected,
    Down(String),
}

/// Publish progress reported by the event loop
#[derive(Debug, Clone)]
enum LinkEvent {
    Published(u16),
    Acked(u16),
    Failed(String),
}

/// Publishes alerts to an MQTT topic at QoS 1
pub struct MqttAlertSink {
    client: AsyncClient,
    topic: String,
    broker: String,
    link: watch::Receiver<LinkState>,
    events: broadcast::Sender<LinkEvent>,
    // One publish in flight, so the next outgoing packet id is ours
    in_flight: Mutex<()>,
    eventloop: JoinHandle<()>,
}

impl MqttAlertSink {
    /// Connect lazily to the configured broker. Must run inside a tokio runtime.
    pub async fn new(config: &AlertConfig) -> Result<Self, AlertDeliveryError> {
        if config.mqtt_broker.trim().is_empty() {
            return Err(AlertDeliveryError::Unconfigured("mqtt_broker is empty".to_string()));
        }
        if config.mqtt_topic.trim().is_empty() {
            return Err(AlertDeliveryError::Unconfigured("mqtt_topic is empty".to_string()));
        }
        // rumqttc panics on a blank client id
        if config.mqtt_client_id.trim().is_empty() || config.mqtt_client_id.starts_with(' ') {
            return Err(AlertDeliveryError::Unconfigured("mqtt_client_id is empty".to_string()));
        }

        let mut options = MqttOptions::new(&config.mqtt_client_id, &config.mqtt_broker, config.mqtt_port);
        options.set_keep_alive(Duration::from_secs(30));

        if let (Some(username), Some(password)) = (&config.mqtt_username, &config.mqtt_password) {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 16);
        let (link_tx, link) = watch::channel(LinkState::Connecting);
        let (events, _) = broadcast::channel(32);
        let events_tx = events.clone();

        let eventloop = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("MQTT connected");
                        link_tx.send_replace(LinkState::Connected);
                    }
                    Ok(Event::Outgoing(Outgoing::Publish(pkid))) => {
                        let _ = events_tx.send(LinkEvent::Published(pkid));
                    }
                    Ok(Event::Incoming(Packet::PubAck(ack))) => {
                        debug!("MQTT alert acknowledged: pkid {}", ack.pkid);
                        let _ = events_tx.send(LinkEvent::Acked(ack.pkid));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("MQTT error: {:?}", e);
                        let reason = e.to_string();
                        link_tx.send_replace(LinkState::Down(reason.clone()));
                        let _ = events_tx.send(LinkEvent::Failed(reason));

                        tokio::time::sleep(Duration::from_secs(5)).await;
                        link_tx.send_replace(LinkState::Connecting);
                    }
                }
            }
        });

        info!("MQTT alert sink initialized for {}:{}", config.mqtt_broker, config.mqtt_port);

        Ok(Self {
            client,
            topic: config.mqtt_topic.clone(),
            broker: config.mqtt_broker.clone(),
            link,
            events,
            in_flight: Mutex::new(()),
            eventloop,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    fn unreachable(&self, reason: &str) -> AlertDeliveryError {
        AlertDeliveryError::Transport(format!("MQTT broker {} unreachable: {}", self.broker, reason))
    }

    /// Wait for a ConnAck, failing fast if the last connection attempt failed
    async fn connected(&self) -> Result<(), AlertDeliveryError> {
        let mut link = self.link.clone();
        loop {
            let state = link.borrow_and_update().clone();
            match state {
                LinkState::Connected => return Ok(()),
                LinkState::Down(reason) => return Err(self.unreachable(&reason)),
                LinkState::Connecting => {}
            }
            link.changed()
                .await
                .map_err(|_| self.unreachable("event loop stopped"))?;
        }
    }
}

impl Drop for MqttAlertSink {
    fn drop(&mut self) {
        self.eventloop.abort();
    }
}

#[async_trait]
impl AlertSink for MqttAlertSink {
    fn transport(&self) -> &str {
        "mqtt"
    }

    async fn notify(&self, message: &str, subject: &str) -> Result<DeliveryReceipt, AlertDeliveryError> {
        let payload = AlertPayload::new(message, subject);
        let json = serde_json::to_vec(&payload)
            .map_err(|e| AlertDeliveryError::Transport(format!("failed to encode alert: {}", e)))?;

        let _in_flight = self.in_flight.lock().await;
        self.connected().await?;

        let mut events = self.events.subscribe();
        self.client
            .publish(self.topic.as_str(), QoS::AtLeastOnce, false, json)
            .await
            .map_err(|e| AlertDeliveryError::Transport(format!("MQTT publish to {} failed: {}", self.broker, e)))?;

        let mut pkid = None;
        loop {
            match events.recv().await {
                Ok(LinkEvent::Published(id)) if pkid.is_none() => pkid = Some(id),
                Ok(LinkEvent::Acked(id)) if pkid == Some(id) => break,
                Ok(LinkEvent::Failed(reason)) => return Err(self.unreachable(&reason)),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("MQTT sink skipped {} link events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(self.unreachable("event loop stopped"));
                }
            }
        }

        debug!("Alert {} acknowledged on MQTT topic {}", payload.id, self.topic);
        Ok(payload.receipt(self.transport()))
    }
}
