// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The intake loop: one receiver, a bounded pool of handler tasks.

use std::sync::Arc;

use peerwarden_core::MessagingGateway;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::handler::Handler;

/// Pulls inbound events and runs each on a bounded pool of handler tasks.
///
/// When every permit is taken the loop stops receiving until one frees up.
pub struct Dispatcher {
    gateway: Arc<dyn MessagingGateway>,
    handler: Arc<Handler>,
    pool: Arc<Semaphore>,
    size: usize,
}

impl Dispatcher {
    /// `size` is the number of events handled at once. At least one.
    pub fn new(gateway: Arc<dyn MessagingGateway>, handler: Arc<Handler>, size: usize) -> Self {
        let size = size.max(1);
        Self {
            gateway,
            handler,
            pool: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Receive and dispatch events until cancelled or the gateway closes.
    ///
    /// When every slot is busy the loop waits for one to free up before
    /// receiving more. Returns the number of dispatched events.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        info!(workers = self.size, "dispatch loop running");
        let mut dispatched = 0u64;

        loop {
            let event = tokio::select! {
                received = self.gateway.receive() => match received {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "gateway closed, stopping intake");
                        break;
                    }
                },
                _ = cancel.cancelled() => {
                    info!("shutdown requested, stopping intake");
                    break;
                }
            };

            let permit = match Arc::clone(&self.pool).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                handler.handle(event).await;
                drop(permit);
            });
            dispatched += 1;
        }

        debug!(dispatched, "dispatch loop stopped");
        dispatched
    }

    /// Wait until every in-flight handler has finished.
    pub async fn drain(&self) {
        let busy = self.size - self.pool.available_permits();
        if busy > 0 {
            info!(busy, "waiting for in-flight handlers");
        }
        let permits = u32::try_from(self.size).unwrap_or(u32::MAX);
        match self.pool.acquire_many(permits).await {
            Ok(_all) => debug!("all handlers finished"),
            Err(e) => warn!(error = %e, "worker pool closed while draining"),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.size - self.pool.available_permits()
    }
}
