// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! FarmTech - plot sensor monitoring and irrigation decisions
//!
//! Runs reading cycles against a local SQLite log and shows recent readings.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use farmtech::{
    alerts::{self, AlertTransport},
    sensors::ReadingSimulator,
    AlertOutcome, Config, CycleOrchestrator, Reading, ReadingStore, SqliteReadingStore, VERSION,
};

/// FarmTech - plot sensor monitoring and irrigation decisions
#[derive(Parser, Debug)]
#[command(name = "farmtech")]
#[command(version = VERSION)]
#[command(about = "Simulated soil readings with threshold-based irrigation alerts")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Database file
    #[arg(long)]
    db: Option<PathBuf>,

    /// MQTT broker address for alerts
    #[arg(long)]
    mqtt_broker: Option<String>,

    /// Webhook URL for alerts
    #[arg(long)]
    webhook_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Take one reading, store it and decide on irrigation
    Cycle {
        /// Plot identifier
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        plot: Option<u32>,
    },

    /// Show the most recent readings
    Recent {
        /// Number of readings
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show database statistics
    Stats,

    /// Send a test message through the configured alert transport
    TestAlert,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{}", config.app_name, VERSION);
    info!("Configuration loaded from {:?}", config_path);

    // Override with command line args
    if let Some(db) = args.db {
        config.database.path = db;
    }
    if let Some(mqtt) = args.mqtt_broker {
        config.alerts.transport = AlertTransport::Mqtt;
        config.alerts.mqtt_broker = mqtt;
    }
    if let Some(url) = args.webhook_url {
        config.alerts.transport = AlertTransport::Webhook;
        config.alerts.webhook_url = Some(url);
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args.command, config))
}

async fn run(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Cycle { plot } => {
            let store = Arc::new(SqliteReadingStore::open(&config.database)?);
            let sink = alerts::build_sink(&config.alerts).await;
            let simulator = match config.cycle.seed {
                Some(seed) => ReadingSimulator::with_seed(seed),
                None => ReadingSimulator::new(),
            };

            let orchestrator = CycleOrchestrator::new(store, Box::new(simulator), sink, config.alerts.timeout());
            let result = orchestrator.run_cycle(plot.unwrap_or(config.cycle.default_plot)).await?;

            println!("{}", serde_json::to_string_pretty(&result)?);
            if let AlertOutcome::Failed { error } = &result.alert {
                eprintln!("warning: alert not delivered: {}", error);
            }
        }

        Command::Recent { limit } => {
            let store = SqliteReadingStore::open(&config.database)?;
            let readings = store.recent(limit.unwrap_or(config.cycle.recent_limit))?;
            print_readings(&readings);
        }

        Command::Stats => {
            let store = SqliteReadingStore::open(&config.database)?;
            println!("Database:  {}", config.database.path.display());
            println!("Readings:  {}", store.count()?);
            if let Some(latest) = store.recent(1)?.first() {
                println!("Latest:    {} (plot {})", latest.formatted_timestamp(), latest.plot_id);
            }
        }

        Command::TestAlert => {
            let sink = alerts::build_sink(&config.alerts).await;
            let receipt = alerts::deliver(
                sink.as_ref(),
                "Test alert sent from the FarmTech command line.",
                "Test - FarmTech",
                config.alerts.timeout(),
            )
            .await?;
            println!("Delivered via {} (message {})", receipt.transport, receipt.message_id);
        }
    }

    Ok(())
}

fn print_readings(readings: &[Reading]) {
    if readings.is_empty() {
        println!("No readings recorded yet.");
        return;
    }

    println!(
        "{:>6}  {:>5}  {:<19}  {:>8}  {:>4}  {:>9}  {}",
        "id", "plot", "timestamp", "humidity", "ph", "nutrients", "source"
    );
    for r in readings {
        println!(
            "{:>6}  {:>5}  {:<19}  {:>8.1}  {:>4.1}  {:>9.1}  {}",
            r.id.unwrap_or_default(),
            r.plot_id,
            r.formatted_timestamp(),
            r.humidity,
            r.ph,
            r.nutrients,
            r.source
        );
    }
}
