//! Sensor module - reading types and the simulated feed

mod simulator;
mod traits;

pub use simulator::{ReadingSimulator, HUMIDITY_RANGE, NUTRIENTS_RANGE, PH_RANGE};
pub use traits::{
    now_seconds, parse_timestamp, Reading, ReadingSource, SensorError, SensorFeed, UnknownSource,
    TIMESTAMP_FORMAT,
};
