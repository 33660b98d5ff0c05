use blobcopy::{Application, Config, telemetry};
use clap::Parser;
use tokio::signal;

/// Resolves on Ctrl+C, or on SIGTERM where the platform has it.
async fn shutdown_signal() {
    #[cfg(unix)]
    let sigterm = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable, only Ctrl+C will stop the server: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let received = tokio::select! {
        _ = ctrl_c => "Ctrl+C",
        _ = sigterm => "SIGTERM",
    };
    tracing::info!("{} received, draining in-flight requests", received);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Must happen before the storage HTTP client is built
    blobcopy::install_crypto_provider();

    let args = blobcopy::config::Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;

    tracing::debug!("{:?}", args);

    let shutdown = shutdown_signal();
    Application::new(config)?.serve(shutdown).await
}
