// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Sensor traits and common types

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Text layout of reading timestamps, both persisted and displayed.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where a reading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingSource {
    Simulated,
    Sensor,
}

impl ReadingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingSource::Simulated => "simulated",
            ReadingSource::Sensor => "sensor",
        }
    }
}

impl fmt::Display for ReadingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown reading source '{0}'")]
pub struct UnknownSource(pub String);

impl FromStr for ReadingSource {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simulated" => Ok(ReadingSource::Simulated),
            "sensor" => Ok(ReadingSource::Sensor),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

/// A single plot observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Assigned by the store on insert; `None` until then.
    pub id: Option<i64>,
    pub plot_id: u32,
    #[serde(with = "timestamp_text")]
    pub timestamp: NaiveDateTime,

    // Soil data
    pub humidity: f64,
    pub ph: f64,
    pub nutrients: f64,

    pub source: ReadingSource,
}

impl Reading {
    /// New unsaved reading stamped with the current local time.
    pub fn new(plot_id: u32, humidity: f64, ph: f64, nutrients: f64, source: ReadingSource) -> Self {
        Self {
            id: None,
            plot_id,
            timestamp: now_seconds(),
            humidity,
            ph,
            nutrients,
            source,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Local wall-clock time truncated to whole seconds.
pub fn now_seconds() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
}

mod timestamp_text {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_timestamp(&text).map_err(de::Error::custom)
    }
}

/// Errors raised by a reading source
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor for plot {plot_id} unavailable: {reason}")]
    Unavailable { plot_id: u32, reason: String },
}

/// Anything that can produce a reading for a plot.
///
/// The simulator implements this today; a hardware adapter must yield the
/// same [`Reading`] shape.
pub trait SensorFeed: Send {
    fn read(&mut self, plot_id: u32) -> Result<Reading, SensorError>;
}
