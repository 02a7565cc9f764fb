//! Bulk issuance runner entry point.

use std::process::ExitCode;

use cli::config::Config;
use event_store::InMemoryEventStore;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT");
        }
        () = terminate => {
            tracing::info!("received SIGTERM");
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let app = cli::create_app(InMemoryEventStore::new());

    let exit = match app.run_bulk(&config, shutdown_signal()).await {
        Ok(summary) => {
            let progress = summary.report.progress;
            tracing::info!(
                success = progress.success,
                error = progress.error,
                skipped = progress.skipped,
                aborted = summary.report.aborted,
                elapsed_ms = summary.report.elapsed.as_millis() as u64,
                cards = summary.cards.count,
                "bulk issuance complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "bulk issuance failed");
            ExitCode::FAILURE
        }
    };

    if config.print_metrics {
        println!("{}", metrics_handle.render());
    }

    exit
}
