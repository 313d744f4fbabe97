/// Flood alert service entry point.
///
/// Subcommands:
///   serve      run the HTTP service (device ingestion + dashboard)
///   prepare    preprocess the raw survey export into the zone dataset
///   train      fit the regression model on the zone dataset
///   predict    one-off alert for a sensor level at a coordinate
///   verify     evaluate the model and run the probe coordinates
///   simulate   post a synthetic voltage sweep to a running server

use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use flood_alert_service::alert::zone_risk::ZoneRiskLookup;
use flood_alert_service::alert::AlertEngine;
use flood_alert_service::config::Config;
use flood_alert_service::dataset;
use flood_alert_service::dev_mode::DevMode;
use flood_alert_service::logging::{self, Component, LogLevel};
use flood_alert_service::model::{Coordinate, SensorLevel};
use flood_alert_service::regression::ModelArtifact;
use flood_alert_service::server::ApiServer;
use flood_alert_service::status::StatusService;
use flood_alert_service::store::CoordinateStore;
use flood_alert_service::verify;
use flood_alert_service::zones::ZoneTable;

#[derive(Parser)]
#[command(name = "flood_alert_service", version, about = "Flood alert service for a single water-level sensor")]
struct Cli {
    /// Configuration file (default: flood_alert.toml)
    #[arg(long, global = true, env = "FLOOD_ALERT_CONFIG")]
    config: Option<PathBuf>,

    /// Minimum log level: debug, info, warn, error
    #[arg(long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Also append log entries to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve,
    /// Preprocess the raw survey CSV into the zone dataset
    Prepare {
        #[arg(long)]
        input: PathBuf,
        /// Defaults to the configured dataset path
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Train the regression model and write the artifact
    Train,
    /// Print the alert for a sensor level at a coordinate
    Predict {
        #[arg(long)]
        sensor: u8,
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,
    },
    /// Evaluate the model and run the probe coordinates
    Verify {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Post synthetic readings to a running server
    Simulate {
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        url: String,
        #[arg(long, default_value_t = 20)]
        count: usize,
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let log_file = cli.log_file.clone().or_else(|| config.paths.log_file.clone());
    let log_file = log_file.as_ref().map(|p| p.display().to_string());
    logging::init_logger(cli.log_level, log_file.as_deref(), true);

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::error(Component::System, None, &e.to_string());
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &Config) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Serve => serve(config),
        Command::Prepare { input, output } => {
            let output = output.unwrap_or_else(|| config.paths.dataset.clone());
            let summary = dataset::prepare_file(&input, &output, &config.risk)?;
            summary.print();
            println!("Processed dataset written to {}", output.display());
            Ok(())
        }
        Command::Train => train(config),
        Command::Predict { sensor, lat, lon } => {
            let level = SensorLevel::new(sensor)?;
            let coordinate = match (lat, lon) {
                (Some(lat), Some(lon)) => Coordinate::new(lat, lon),
                _ => CoordinateStore::new(&config.paths.coordinates).load_or(config.location.coordinate()),
            };
            coordinate.validate()?;

            let engine = build_engine(config)?;
            let result = engine.evaluate_level(&coordinate, level, f64::NAN, f64::NAN);
            println!("Coordinate:  {}", result.coordinate);
            println!("Zone score:  {:.1} ({:?})", result.risk_score, result.score_source);
            println!("Zone risk:   {}", result.risk_band);
            println!("Sensor:      {}", result.sensor_level);
            println!("Alert:       {} - {}", result.alert, result.alert.guidance());
            Ok(())
        }
        Command::Verify { json } => {
            let engine = build_engine(config)?;
            let report = verify::run_verification(&engine, &config.evaluation);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                verify::print_summary(&report);
            }
            Ok(())
        }
        Command::Simulate { url, count, interval_ms } => {
            let summary = DevMode::new(&url, count)
                .with_interval(Duration::from_millis(interval_ms))
                .run()?;
            println!("Sent {} readings ({} acknowledged)", summary.sent, summary.acknowledged);
            println!("{}", serde_json::to_string_pretty(&summary.final_status)?);
            Ok(())
        }
    }
}

fn build_engine(config: &Config) -> Result<AlertEngine, Box<dyn Error>> {
    let lookup = ZoneRiskLookup::load(&config.paths.dataset, &config.paths.model)?
        .with_region(config.region.bounds)
        .with_tolerance(config.region.match_tolerance_deg);
    Ok(AlertEngine::new(lookup)
        .with_breakpoints(config.sensor.breakpoints)
        .with_thresholds(config.risk)
        .with_table(config.decision_table()))
}

fn serve(config: &Config) -> Result<(), Box<dyn Error>> {
    logging::info(Component::System, None, "Starting flood alert service");
    let engine = build_engine(config)?;
    let store = CoordinateStore::new(&config.paths.coordinates);
    let service = Arc::new(StatusService::new(engine, store, config.location.coordinate()));
    logging::info(
        Component::System,
        None,
        &format!("Monitoring coordinate {}", service.coordinates()),
    );

    let server = ApiServer::bind(&config.server.bind, service)?;
    server.run();
    Ok(())
}

fn train(config: &Config) -> Result<(), Box<dyn Error>> {
    let zones = ZoneTable::load(&config.paths.dataset)?;
    let samples = zones.samples();
    logging::info(
        Component::Model,
        Some(&config.paths.dataset.display().to_string()),
        &format!(
            "Training on {} rows with {:?}, holding out {:?}",
            samples.len(),
            config.model,
            config.evaluation
        ),
    );

    let artifact = ModelArtifact::train_with_holdout(&samples, config.model, config.evaluation)?;
    artifact.save(&config.paths.model)?;

    println!("Trained regression tree on {} of {} rows", artifact.training_rows, samples.len());
    println!("  depth:  {}", artifact.tree.depth());
    println!("  leaves: {}", artifact.tree.leaf_count());
    match &artifact.holdout {
        Some(holdout) => {
            println!("Held-out rows ({}, seed {}):", holdout.samples, config.evaluation.seed);
            verify::print_metrics(holdout);
        }
        None => println!("No rows held out (test_fraction = 0)"),
    }
    println!("Feature importance:");
    for f in &artifact.feature_importances {
        println!("  {:<12} {:.3}", format!("{:?}", f.feature).to_lowercase(), f.importance);
    }
    println!("Model written to {}", config.paths.model.display());
    Ok(())
}
