//! Signal handling for graceful termination.

use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

/// Fan-out of a single shutdown notification to every listener.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolves once shutdown has been triggered.
    pub async fn recv(mut self) {
        // A dropped sender also means shutdown.
        let _ = self.receiver.wait_for(|stopped| *stopped).await;
    }
}

/// Owner of the shutdown trigger.
#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

/// Create a linked trigger and signal.
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownTrigger { sender }, ShutdownSignal { receiver })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        let _ = self.sender.send(true);
    }
}

/// Waits for SIGTERM or SIGINT.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating shutdown"),
    }
}

/// Wait for `servers` to drain, giving up after `timeout`.
pub async fn drain<F>(servers: F, timeout: Duration) -> bool
where
    F: Future<Output = ()>,
{
    match tokio::time::timeout(timeout, servers).await {
        Ok(()) => {
            info!("All servers stopped gracefully");
            true
        }
        Err(_) => {
            warn!(?timeout, "Shutdown timeout reached, abandoning in-flight requests");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_every_signal() {
        let (trigger, signal) = channel();
        let other = signal.clone();

        trigger.trigger();
        signal.recv().await;
        other.recv().await;
    }

    #[tokio::test]
    async fn test_dropped_trigger_releases_waiters() {
        let (trigger, signal) = channel();
        drop(trigger);
        tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_drain_times_out() {
        let finished = drain(std::future::pending::<()>(), Duration::from_millis(10)).await;
        assert!(!finished);
        assert!(drain(async {}, Duration::from_secs(1)).await);
    }
}
