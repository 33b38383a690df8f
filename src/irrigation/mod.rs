// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Irrigation policy - maps a single reading to a pump action

use std::fmt;

use serde::{Serialize, Serializer};

use crate::sensors::Reading;

/// Soil humidity (percent) below which the pump is switched on.
pub const HUMIDITY_THRESHOLD: f64 = 30.0;

/// How long the pump runs once activated.
pub const PUMP_DURATION_MINUTES: u32 = 15;

/// Action suggested for a plot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrrigationAction {
    ActivatePump,
    NoAction,
}

impl IrrigationAction {
    pub fn activates_pump(&self) -> bool {
        matches!(self, IrrigationAction::ActivatePump)
    }
}

impl fmt::Display for IrrigationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrrigationAction::ActivatePump => {
                write!(f, "activate pump for {} minutes", PUMP_DURATION_MINUTES)
            }
            IrrigationAction::NoAction => f.write_str("no action, humidity sufficient"),
        }
    }
}

impl Serialize for IrrigationAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Notification to send when the pump is activated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub subject: String,
    pub message: String,
}

/// Outcome of the policy for one reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: IrrigationAction,
    pub alert: Option<Alert>,
}

/// Apply the humidity rule to a reading.
///
/// Only `humidity` drives the action; the other fields feed the alert text.
/// Values outside the simulated range are not rejected, and NaN never
/// activates the pump.
pub fn decide(reading: &Reading) -> Decision {
    if reading.humidity < HUMIDITY_THRESHOLD {
        let action = IrrigationAction::ActivatePump;
        Decision {
            action,
            alert: Some(Alert {
                subject: alert_subject(reading.plot_id),
                message: alert_message(reading, action),
            }),
        }
    } else {
        Decision {
            action: IrrigationAction::NoAction,
            alert: None,
        }
    }
}

pub fn alert_subject(plot_id: u32) -> String {
    format!("Humidity Alert - Plot {}", plot_id)
}

fn alert_message(reading: &Reading, action: IrrigationAction) -> String {
    format!(
        "Low soil humidity detected!\n\n\
         Plot: {}\n\
         Timestamp: {}\n\
         Humidity: {:.1}%\n\
         pH: {:.1}\n\
         Nutrients: {:.1}\n\n\
         Suggested action: {}.",
        reading.plot_id,
        reading.formatted_timestamp(),
        reading.humidity,
        reading.ph,
        reading.nutrients,
        action,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{parse_timestamp, ReadingSource};

    fn reading_with_humidity(humidity: f64) -> Reading {
        let mut reading = Reading::new(1, humidity, 6.2, 48.0, ReadingSource::Simulated);
        reading.timestamp = parse_timestamp("2025-06-10 14:30:00").unwrap();
        reading
    }

    #[test]
    fn test_threshold_is_strict() {
        assert_eq!(decide(&reading_with_humidity(29.9)).action, IrrigationAction::ActivatePump);
        assert_eq!(decide(&reading_with_humidity(30.0)).action, IrrigationAction::NoAction);
        assert_eq!(decide(&reading_with_humidity(30.1)).action, IrrigationAction::NoAction);
        assert_eq!(decide(&reading_with_humidity(80.0)).action, IrrigationAction::NoAction);
    }

    #[test]
    fn test_action_text() {
        assert_eq!(IrrigationAction::ActivatePump.to_string(), "activate pump for 15 minutes");
        assert_eq!(IrrigationAction::NoAction.to_string(), "no action, humidity sufficient");
        assert_eq!(
            serde_json::to_value(IrrigationAction::ActivatePump).unwrap(),
            "activate pump for 15 minutes"
        );
    }

    #[test]
    fn test_dry_reading_builds_alert() {
        let reading = reading_with_humidity(15.0);
        let decision = decide(&reading);
        let alert = decision.alert.expect("dry soil must raise an alert");

        assert_eq!(alert.subject, "Humidity Alert - Plot 1");
        assert!(alert.message.contains("Plot: 1"));
        assert!(alert.message.contains("2025-06-10 14:30:00"));
        assert!(alert.message.contains("Humidity: 15.0%"));
        assert!(alert.message.contains("pH: 6.2"));
        assert!(alert.message.contains("Nutrients: 48.0"));
        assert!(alert.message.contains("activate pump for 15 minutes"));
    }

    #[test]
    fn test_wet_reading_has_no_alert() {
        assert!(decide(&reading_with_humidity(65.0)).alert.is_none());
    }

    #[test]
    fn test_decision_is_deterministic() {
        let reading = reading_with_humidity(21.7);
        assert_eq!(decide(&reading), decide(&reading));
    }

    #[test]
    fn test_out_of_range_values_are_total() {
        assert!(decide(&reading_with_humidity(-5.0)).action.activates_pump());
        assert!(!decide(&reading_with_humidity(250.0)).action.activates_pump());
        assert!(!decide(&reading_with_humidity(f64::NAN)).action.activates_pump());
    }
}
