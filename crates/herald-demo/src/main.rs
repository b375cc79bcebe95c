//! # Herald Demo
//!
//! Loads configuration, initializes telemetry and runs the sample flow.

use herald_config::ConfigLoader;
use herald_core::{init_telemetry, metrics::register_metrics, CancellationToken, HeraldResult};
use herald_demo::DemoApp;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(
            code = e.error_code(),
            retriable = e.is_retriable(),
            "Application error: {}",
            e
        );
        eprintln!("herald-demo failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> HeraldResult<()> {
    let loader = ConfigLoader::from_default_location()?;
    let config = loader.get().await;

    init_telemetry(&config.telemetry)?;
    register_metrics();

    info!("Starting {} v{}", config.app.name, config.app.version);
    info!("Environment: {}", config.app.environment);

    let app = DemoApp::new(config.cache)?;
    let cancel = CancellationToken::new();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            shutdown.cancel();
        }
    });

    let report = app.run(&cancel).await?;
    info!(?report, "Demo finished");
    Ok(())
}
