use clap::Parser;
use squeeze::{Application, Config, telemetry};
use tracing::{info, warn};

/// Resolve once the process is asked to stop.
///
/// A signal whose handler cannot be installed is logged and never fires; the other one still
/// triggers shutdown.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        () = interrupt => "interrupt",
        () = terminate => "terminate",
    };

    info!(signal = received, "Shutdown requested, draining in-flight requests");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = squeeze::config::Args::parse();

    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(config.log_format)?;

    tracing::debug!("{:?}", args);

    Application::new(config)?.serve(shutdown_signal()).await
}
