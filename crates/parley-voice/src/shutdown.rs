//! Process signal wiring for run cancellation.
//!
//! The CLI layer owns signal handling; these helpers implement it the same
//! way for every command: SIGINT/SIGTERM resolve a future, and
//! [`bind_interrupt`] maps that onto a run's stop token. Cancelling an
//! already-cancelled token is a no-op, so the wiring composes with other
//! stop sources (frame limits, caller-initiated stops).

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Waits for a SIGINT (Ctrl+C) or, on unix, SIGTERM.
pub async fn interrupt_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "cannot listen for interrupt");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received interrupt, stopping"),
        () = terminate => info!("received SIGTERM, stopping"),
    }
}

/// Spawns a task that cancels `token` on the first interrupt.
pub fn bind_interrupt(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        interrupt_signal().await;
        token.cancel();
    })
}
