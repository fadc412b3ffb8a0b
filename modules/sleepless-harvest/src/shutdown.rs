//! Process shutdown signalling.
//!
//! The harvester never gets killed mid-write by a signal handler. Instead a
//! listener task flips a watch channel, the scheduler notices it between (or
//! during) polls, and performs its own final flush.

use tokio::sync::watch;
use tracing::{info, warn};

/// Spawn a task that flips the returned receiver to `true` on Ctrl-C or
/// SIGTERM.
pub fn spawn_signal_listener() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        let _ = tx.send(true);
    });
    rx
}

/// Resolves once shutdown has been requested. Never resolves if the sender
/// is gone without having asked.
pub async fn requested(rx: &mut watch::Receiver<bool>) {
    let signalled = rx.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM, relying on Ctrl-C only");
            ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = ctrl_c() => {},
        _ = term.recv() => {},
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
