//! Graceful shutdown coordinator.
//!
//! Translates SIGINT/SIGTERM into a broadcast every long-running task can
//! subscribe to; the pipeline itself stops via the controller's cooperative
//! run flag.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal;
use tracing::{info, warn};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

pub fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Relaxed)
}

pub fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

pub struct ShutdownCoordinator {
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(8);
        Self { shutdown_tx }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Wait for CTRL+C or SIGTERM, then notify every subscriber.
    pub async fn wait_for_signal(self) {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
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
            _ = ctrl_c => {
                info!("received CTRL+C, shutting down");
            }
            _ = terminate => {
                info!("received SIGTERM, shutting down");
            }
        }

        request_shutdown();
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("no shutdown subscribers: {}", e);
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
