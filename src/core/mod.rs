//! Core module - the reading cycle and its result types

mod cycle;

pub use cycle::{CycleError, CycleOrchestrator};

use serde::Serialize;

use crate::alerts::DeliveryReceipt;
use crate::irrigation::IrrigationAction;
use crate::sensors::Reading;

/// What happened to the alert of one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AlertOutcome {
    /// Humidity was sufficient, nothing to send
    NotRequired,
    Delivered { receipt: DeliveryReceipt },
    /// Persistence and the decision succeeded but responders may not know
    Failed { error: String },
}

impl AlertOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, AlertOutcome::Failed { .. })
    }
}

/// Result of one reading cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleResult {
    #[serde(flatten)]
    pub reading: Reading,
    pub action: IrrigationAction,
    pub alert: AlertOutcome,
}

impl CycleResult {
    /// The reading was stored and the action computed, but the alert failed
    pub fn is_degraded(&self) -> bool {
        self.alert.is_failed()
    }
}
