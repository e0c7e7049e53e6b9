// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that every run loop monitors.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    error!(error = %e, "failed to install SIGTERM handler, only Ctrl+C stops the bot");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Waits for a background task, giving up after `timeout`.
///
/// Returns `false` when the task panicked or did not finish in time.
pub async fn join_with_timeout<T>(name: &str, task: JoinHandle<T>, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(_)) => {
            debug!(task = name, "task stopped");
            true
        }
        Ok(Err(e)) => {
            error!(task = name, error = %e, "task failed during shutdown");
            false
        }
        Err(_) => {
            warn!(task = name, timeout_secs = timeout.as_secs(), "task did not stop in time");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_signal_handler_returns_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }

    #[tokio::test]
    async fn finished_task_joins() {
        let task = tokio::spawn(async { 5 });
        assert!(join_with_timeout("quick", task, Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_task_times_out() {
        let task = tokio::spawn(std::future::pending::<()>());
        assert!(!join_with_timeout("stuck", task, Duration::from_secs(5)).await);
    }
}
