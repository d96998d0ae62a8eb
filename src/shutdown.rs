//! OS shutdown signals as a cancellation source for waits.
//!
//! ```ignore
//! use hemmer_provider_waiter::shutdown_signal;
//!
//! let topic = waiter.wait_with_shutdown(&probe, shutdown_signal()).await?;
//! ```

use tracing::{info, warn};

/// Resolve when the process is asked to stop.
///
/// On Unix this waits for SIGTERM or SIGINT. On Windows it waits for CTRL+C.
/// If no handler can be installed the future never resolves, so the wait runs
/// until its own timeout.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(error = %e, "Failed to install signal handlers, waits cannot be interrupted");
                    return std::future::pending::<()>().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, cancelling wait");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, cancelling wait");
            }
        }
    }

    #[cfg(windows)]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install CTRL+C handler, waits cannot be interrupted");
            return std::future::pending::<()>().await;
        }
        info!("Received CTRL+C, cancelling wait");
    }

    #[cfg(not(any(unix, windows)))]
    {
        std::future::pending::<()>().await;
    }
}
