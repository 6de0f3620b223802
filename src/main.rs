//! NetMood - real-time network traffic mood analysis.
//!
//! Captures traffic observations (live driver, interface counters, or
//! simulation), classifies each into a mood label, keeps running stats,
//! re-analyzes a sliding window every ten observations and pushes the
//! resulting snapshot to WebSocket subscribers.

mod analyzer;
mod api;
mod batch;
mod broadcast;
mod capture;
mod config;
mod controller;
mod errors;
mod export;
mod features;
mod metrics;
mod mood;
mod observation;
mod privacy;
mod queue;
mod shutdown;
mod stats;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use analyzer::WindowSnapshot;
use capture::CaptureSource;
use config::Settings;
use controller::CaptureController;
use metrics::Metrics;
use observation::MoodLabel;
use privacy::Anonymizer;
use shutdown::ShutdownCoordinator;

#[derive(Parser)]
#[command(
    name = "netmood",
    about = "Real-time network traffic mood analysis",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the live capture pipeline and its HTTP/WS surface
    Run {
        /// Optional TOML settings file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Analyze a previously exported CSV file
    Analyze {
        /// Path to the CSV export
        #[arg(long)]
        csv: PathBuf,
        /// Also write the full report as JSON to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Analyze the built-in sample data set
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { config } => run(config.as_deref()).await,
        Command::Analyze { csv, output } => analyze_file(&csv, output.as_deref()),
        Command::Demo => {
            let snapshot = batch::analyze_csv(batch::SAMPLE_CSV)?;
            print_report(&snapshot);
            Ok(())
        }
    }
}

async fn run(config_path: Option<&Path>) -> Result<()> {
    let settings = Settings::load(config_path).context("loading settings")?;
    info!(
        "starting: privacy level {}, queue capacity {}, window {} / interval {}",
        settings.privacy_level,
        settings.queue_capacity,
        settings.window_size,
        settings.analysis_interval
    );

    let anonymizer = Arc::new(Anonymizer::new(settings.privacy_level));
    // No platform capture driver is linked into this binary; the probe
    // falls through to counter sampling or simulation.
    let source = CaptureSource::select(settings.source, anonymizer, None);
    let metrics = Arc::new(Metrics::new());
    let controller = Arc::new(CaptureController::new(
        settings.clone(),
        source,
        metrics.clone(),
    ));

    controller.start();

    let coordinator = ShutdownCoordinator::new();
    let mut server_shutdown = coordinator.subscribe();
    let mut stats_shutdown = coordinator.subscribe();
    tokio::spawn(coordinator.wait_for_signal());

    // Periodic stats log while running.
    {
        let controller = controller.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(10));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let stats = controller.stats();
                        let distribution: Vec<String> = stats
                            .per_mood
                            .iter()
                            .map(|(label, count)| format!("{}={}", label, count))
                            .collect();
                        info!(
                            "captured {} observations ({:.1}/s, {} dropped) | {}",
                            stats.total,
                            stats.rate,
                            stats.dropped,
                            distribution.join(" ")
                        );
                    }
                    _ = stats_shutdown.recv() => break,
                }
            }
        });
    }

    let state = api::AppState::new(controller.clone(), metrics, &settings);
    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(settings.listen_addr())
        .await
        .with_context(|| format!("binding {}", settings.listen))?;
    info!("listening on http://{}", settings.listen);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = server_shutdown.recv().await;
    })
    .await
    .context("http server")?;

    controller.stop();

    // Final export of whatever the consumer never got to.
    let path = settings
        .export_dir
        .join(export::export_file_name(Local::now()));
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("creating {}", path.display()))?;
    let records = controller.export(&mut file)?;
    info!(
        "exported {} buffered observation(s) to {}",
        records,
        path.display()
    );

    let stats = controller.stats();
    info!(
        "final totals: {} observations, {} dropped, {:.1}/s over {:.0}s",
        stats.total, stats.dropped, stats.rate, stats.elapsed_seconds
    );
    Ok(())
}

fn analyze_file(csv: &Path, output: Option<&Path>) -> Result<()> {
    let text =
        std::fs::read_to_string(csv).with_context(|| format!("reading {}", csv.display()))?;
    let snapshot = batch::analyze_csv(&text)?;
    print_report(&snapshot);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("\nReport written to {}", path.display());
    }
    Ok(())
}

fn print_report(snapshot: &WindowSnapshot) {
    println!("Mood distribution ({} records):", snapshot.sample_count);
    for label in MoodLabel::ALL {
        let pct = snapshot.percentages.get(&label).copied().unwrap_or(0.0);
        println!("  {:>7}: {:>5.1}%", label.to_string(), pct);
    }

    println!("\nAlerts:");
    for alert in &snapshot.alerts {
        println!("  [{}] {}", alert.severity, alert.message);
    }

    println!("\n{}", snapshot.summary);
}
