//! Signal handling.

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancel `token` on SIGINT or SIGTERM.
///
/// A cycle already in flight finishes; the scheduler then stops instead of
/// sleeping or starting another cycle.
pub fn register_shutdown_handlers(token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install SIGINT handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT (Ctrl+C), stopping after the current cycle"),
            _ = terminate => info!("Received SIGTERM, stopping after the current cycle"),
        }

        token.cancel();
    });
}
