// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Reading cycle orchestration
//!
//! A cycle runs strictly in order: schema, sample, insert, decide, alert.
//! The reading is committed before any alert is attempted, so alert failures
//! never cost an observation.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

use super::{AlertOutcome, CycleResult};
use crate::alerts::{self, AlertSink};
use crate::db::{ReadingStore, StorageError};
use crate::irrigation::{self, Alert};
use crate::sensors::{Reading, SensorError, SensorFeed};

/// A cycle stage that failed
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("schema stage failed: {0}")]
    Schema(#[source] StorageError),

    #[error("simulate stage failed: {0}")]
    Simulate(#[from] SensorError),

    #[error("insert stage failed: {0}")]
    Insert(#[source] StorageError),

    #[error("query stage failed: {0}")]
    Query(#[source] StorageError),
}

impl CycleError {
    pub fn stage(&self) -> &'static str {
        match self {
            CycleError::Schema(_) => "schema",
            CycleError::Simulate(_) => "simulate",
            CycleError::Insert(_) => "insert",
            CycleError::Query(_) => "query",
        }
    }

    pub fn is_storage(&self) -> bool {
        !matches!(self, CycleError::Simulate(_))
    }
}

/// Composes feed, store, policy and alert sink into one cycle.
///
/// Holds no state between cycles beyond what lives in the store.
pub struct CycleOrchestrator {
    store: Arc<dyn ReadingStore>,
    feed: Mutex<Box<dyn SensorFeed>>,
    sink: Arc<dyn AlertSink>,
    alert_timeout: Duration,
}

impl CycleOrchestrator {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        feed: Box<dyn SensorFeed>,
        sink: Arc<dyn AlertSink>,
        alert_timeout: Duration,
    ) -> Self {
        Self {
            store,
            feed: Mutex::new(feed),
            sink,
            alert_timeout,
        }
    }

    /// Run one simulate, persist, decide, notify cycle for `plot_id`.
    ///
    /// Storage failures abort the cycle. An alert failure is logged and
    /// reported through [`AlertOutcome::Failed`]; the cycle still succeeds.
    pub async fn run_cycle(&self, plot_id: u32) -> Result<CycleResult, CycleError> {
        self.store.ensure_schema().map_err(CycleError::Schema)?;

        let reading = self.feed.lock().read(plot_id)?;
        let reading = self.store.insert(&reading).map_err(CycleError::Insert)?;

        let decision = irrigation::decide(&reading);
        info!(
            "Plot {} reading {:?}: humidity {}% -> {}",
            reading.plot_id, reading.id, reading.humidity, decision.action
        );

        let alert = match decision.alert {
            Some(alert) => self.dispatch(&reading, &alert).await,
            None => AlertOutcome::NotRequired,
        };

        Ok(CycleResult {
            reading,
            action: decision.action,
            alert,
        })
    }

    /// Most recent readings, newest first
    pub fn recent_readings(&self, limit: usize) -> Result<Vec<Reading>, CycleError> {
        self.store.recent(limit).map_err(CycleError::Query)
    }

    async fn dispatch(&self, reading: &Reading, alert: &Alert) -> AlertOutcome {
        match alerts::deliver(self.sink.as_ref(), &alert.message, &alert.subject, self.alert_timeout).await {
            Ok(receipt) => {
                info!("Alert {} sent via {}", receipt.message_id, receipt.transport);
                AlertOutcome::Delivered { receipt }
            }
            Err(e) => {
                warn!(
                    "Irrigation advice for plot {} computed but alert not delivered: {}",
                    reading.plot_id, e
                );
                AlertOutcome::Failed { error: e.to_string() }
            }
        }
    }
}
