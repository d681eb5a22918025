//! Command implementations.

mod info;
mod send;
mod simulate;
mod validate;

pub use info::run_info;
pub use send::run_send;
pub use simulate::run_simulate;
pub use validate::run_validate;

use tracing::{error, info};

/// Install the Prometheus exporter when a port is given
fn init_metrics(port: u16) -> anyhow::Result<()> {
    if port != 0 {
        observability::init_metrics_only(port)?;
        info!("Metrics endpoint available on port {}", port);
    }
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
