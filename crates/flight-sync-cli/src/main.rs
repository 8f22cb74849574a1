//! flight-sync CLI - flight schedule reconciliation between SQL Server databases.

use clap::{Parser, Subcommand};
use flight_sync::{Config, MssqlSource, MssqlTarget, Scheduler, SyncError, SyncOrchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "flight-sync")]
#[command(about = "Reconcile flight schedules from a source database into a target table")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single reconciliation pass
    Run,

    /// Run reconciliation passes on an interval until interrupted
    Watch {
        /// Override the configured interval between passes
        #[arg(long)]
        interval_minutes: Option<u64>,
    },

    /// Test database connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), SyncError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let cancel_token = setup_signal_handler()?;

    match cli.command {
        Commands::Run => {
            let orchestrator = SyncOrchestrator::new(&config)?;
            let summary = orchestrator.run_once(&cancel_token).await?;

            if cli.output_json {
                println!("{}", summary.to_json()?);
            } else {
                println!("\nSync {}!", summary.status);
                println!("  Run ID: {}", summary.run_id);
                println!("  Window: {} to {}", summary.window.from, summary.window.to);
                println!("  Duration: {:.2}s", summary.duration_seconds);
                println!(
                    "  Source rows: {} (target: {}, crew groups: {})",
                    summary.source_rows, summary.target_rows, summary.crew_groups
                );
                println!("  Inserted: {}", summary.inserted);
                println!("  Updated: {}", summary.updated);
                println!("  Unchanged: {}", summary.unchanged);
                if summary.out_of_window > 0 {
                    println!("  Outside window: {}", summary.out_of_window);
                }
                if let Some(ref err) = summary.transform_error {
                    println!("  Stopped early: {}", err);
                }
            }
        }

        Commands::Watch { interval_minutes } => {
            if let Some(minutes) = interval_minutes {
                config.sync.interval_minutes = minutes;
                config.validate()?;
            }

            let orchestrator = SyncOrchestrator::new(&config)?;
            let scheduler = Scheduler::new(orchestrator);
            let passes = scheduler.run(cancel_token).await;

            if cli.output_json {
                println!("{}", serde_json::json!({ "passes": passes }));
            } else {
                println!("Stopped after {} passes", passes);
            }
        }

        Commands::HealthCheck => {
            let source = MssqlSource::new(config.source.clone())?;
            let target = MssqlTarget::new(config.target.clone());

            let source_result = source.ping().await;
            let target_result = target.ping().await;
            let healthy = source_result.is_ok() && target_result.is_ok();

            if cli.output_json {
                let report = serde_json::json!({
                    "source_connected": source_result.is_ok(),
                    "source_latency_ms": latency_ms(&source_result),
                    "source_error": source_result.as_ref().err().map(|e| e.to_string()),
                    "target_connected": target_result.is_ok(),
                    "target_latency_ms": latency_ms(&target_result),
                    "target_error": target_result.as_ref().err().map(|e| e.to_string()),
                    "healthy": healthy,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Health Check Results:");
                print_check(
                    "Source",
                    &config.source.connection.describe(),
                    &source_result,
                );
                print_check(
                    "Target",
                    &config.target.connection.describe(),
                    &target_result,
                );
                println!(
                    "\n  Overall: {}",
                    if healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !healthy {
                return Err(SyncError::connection(
                    "health check failed",
                    "source or target unreachable",
                ));
            }
        }
    }

    Ok(())
}

fn latency_ms(result: &Result<Duration, SyncError>) -> u128 {
    result.as_ref().map(|d| d.as_millis()).unwrap_or(0)
}

fn print_check(label: &str, endpoint: &str, result: &Result<Duration, SyncError>) {
    match result {
        Ok(latency) => println!("  {} ({}): OK ({}ms)", label, endpoint, latency.as_millis()),
        Err(e) => {
            println!("  {} ({}): FAILED", label, endpoint);
            println!("    Error: {}", e);
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[cfg(unix)]
fn setup_signal_handler() -> Result<CancellationToken, SyncError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => eprintln!("\nReceived SIGINT. Finishing current phase..."),
            _ = sigterm.recv() => eprintln!("\nReceived SIGTERM. Finishing current phase..."),
        }
        token.cancel();
    });

    Ok(cancel_token)
}

#[cfg(not(unix))]
fn setup_signal_handler() -> Result<CancellationToken, SyncError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Finishing current phase...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}
