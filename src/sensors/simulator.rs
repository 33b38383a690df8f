// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Sensor simulator for demo/testing

use rand::prelude::*;
use rand_distr::Uniform;
use tracing::trace;

use super::{Reading, ReadingSource, SensorError, SensorFeed};

/// Simulated soil humidity bounds, percent.
pub const HUMIDITY_RANGE: (f64, f64) = (10.0, 80.0);
/// Simulated soil pH bounds.
pub const PH_RANGE: (f64, f64) = (4.5, 7.5);
/// Simulated nutrient index bounds.
pub const NUTRIENTS_RANGE: (f64, f64) = (20.0, 100.0);

/// Produces uniformly distributed soil readings
pub struct ReadingSimulator {
    rng: StdRng,
    humidity: Uniform<f64>,
    ph: Uniform<f64>,
    nutrients: Uniform<f64>,
    sequence: u64,
}

impl ReadingSimulator {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic simulator, useful for replaying a demo.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            humidity: Uniform::new_inclusive(HUMIDITY_RANGE.0, HUMIDITY_RANGE.1),
            ph: Uniform::new_inclusive(PH_RANGE.0, PH_RANGE.1),
            nutrients: Uniform::new_inclusive(NUTRIENTS_RANGE.0, NUTRIENTS_RANGE.1),
            sequence: 0,
        }
    }

    pub fn simulate(&mut self, plot_id: u32) -> Reading {
        self.sequence += 1;

        let humidity = one_decimal(self.rng.sample(&self.humidity));
        let ph = one_decimal(self.rng.sample(&self.ph));
        let nutrients = one_decimal(self.rng.sample(&self.nutrients));

        trace!(
            "Simulated reading #{} for plot {}: humidity={} ph={} nutrients={}",
            self.sequence, plot_id, humidity, ph, nutrients
        );

        Reading::new(plot_id, humidity, ph, nutrients, ReadingSource::Simulated)
    }

    /// Number of readings produced so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Default for ReadingSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorFeed for ReadingSimulator {
    fn read(&mut self, plot_id: u32) -> Result<Reading, SensorError> {
        Ok(self.simulate(plot_id))
    }
}

// Range bounds all have one decimal, so rounding never leaves the range.
fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(value: f64, range: (f64, f64)) -> bool {
        value >= range.0 && value <= range.1
    }

    #[test]
    fn test_values_stay_in_range() {
        let mut sim = ReadingSimulator::with_seed(7);

        for plot_id in 1..=500 {
            let reading = sim.simulate(plot_id);
            assert_eq!(reading.plot_id, plot_id);
            assert!(within(reading.humidity, HUMIDITY_RANGE), "humidity {}", reading.humidity);
            assert!(within(reading.ph, PH_RANGE), "ph {}", reading.ph);
            assert!(within(reading.nutrients, NUTRIENTS_RANGE), "nutrients {}", reading.nutrients);
        }
        assert_eq!(sim.sequence(), 500);
    }

    #[test]
    fn test_readings_are_tagged_simulated_and_unsaved() {
        let mut sim = ReadingSimulator::new();
        let reading = sim.read(4).unwrap();

        assert_eq!(reading.source, ReadingSource::Simulated);
        assert_eq!(reading.id, None);
        assert_eq!(reading.plot_id, 4);
    }

    #[test]
    fn test_values_rounded_to_one_decimal() {
        let mut sim = ReadingSimulator::with_seed(99);

        for _ in 0..100 {
            let reading = sim.simulate(1);
            for value in [reading.humidity, reading.ph, reading.nutrients] {
                assert!(((value * 10.0).round() - value * 10.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_seeded_simulators_agree() {
        let mut a = ReadingSimulator::with_seed(2024);
        let mut b = ReadingSimulator::with_seed(2024);

        for _ in 0..20 {
            let ra = a.simulate(2);
            let rb = b.simulate(2);
            assert_eq!((ra.humidity, ra.ph, ra.nutrients), (rb.humidity, rb.ph, rb.nutrients));
        }
    }
}
