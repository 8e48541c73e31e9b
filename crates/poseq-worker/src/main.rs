//! Pose sequence reconstruction worker binary.

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use poseq_worker::{BatchRunner, Cli, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("poseq_core=info".parse()?)
        .add_directive("poseq_worker=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let cli = Cli::parse();
    let config = cli.apply(WorkerConfig::from_env());
    info!("Worker config: {:?}", config);

    let prometheus = if config.metrics_enabled {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Metrics recorder unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };

    let runner = match BatchRunner::new(config) {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to create batch runner: {}", e);
            std::process::exit(2);
        }
    };

    let cancel = runner.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, cancelling runs");
            cancel.cancel();
        }
    });

    let summary = runner.run_batch(&cli.inputs).await?;

    if let Some(handle) = prometheus {
        println!("{}", handle.render());
    }

    if summary.failed() > 0 {
        error!("{} of {} runs failed", summary.failed(), summary.outcomes.len());
        std::process::exit(1);
    }

    info!("Worker finished");
    Ok(())
}
