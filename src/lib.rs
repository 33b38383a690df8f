// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! FarmTech - plot sensor monitoring and irrigation decisions
//!
//! Each reading cycle samples a plot, stores the reading, applies the
//! humidity rule and, when the pump should run, notifies an alert sink.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Cycle Orchestrator                     │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌────────────┐  ┌─────────┐  ┌────────────┐  ┌───────┐  │
//! │  │ Sensor Feed│→ │  Store  │→ │ Irrigation │→ │ Alert │  │
//! │  │ (simulator)│  │ (SQLite)│  │   Policy   │  │ Sink  │  │
//! │  └────────────┘  └─────────┘  └────────────┘  └───────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod alerts;
pub mod config;
pub mod core;
pub mod db;
pub mod irrigation;
pub mod sensors;

// Re-exports for convenience
pub use alerts::{AlertDeliveryError, AlertSink, DeliveryReceipt};
pub use config::Config;
pub use self::core::{AlertOutcome, CycleError, CycleOrchestrator, CycleResult};
pub use db::{ReadingStore, SqliteReadingStore, StorageError};
pub use irrigation::{decide, Decision, IrrigationAction, HUMIDITY_THRESHOLD};
pub use sensors::{Reading, ReadingSimulator, ReadingSource, SensorFeed};

/// FarmTech version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// FarmTech name
pub const NAME: &str = "FarmTech";
