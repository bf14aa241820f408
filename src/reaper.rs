// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Link Reaper
//!
//! Background task that evicts transfer records once they are past expiry
//! plus a grace period, deleting the stored bytes with them. Without it the
//! registry and the storage directory grow with every upload.
//!
//! During the grace period an expired link still answers `403 Expired`;
//! after eviction it answers `404 NotFound`.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::registry::LinkRegistry;

pub struct LinkReaper {
    registry: Arc<LinkRegistry>,
    interval: Duration,
    grace: Duration,
}

impl LinkReaper {
    pub fn new(registry: Arc<LinkRegistry>, interval: Duration, grace: Duration) -> Self {
        Self {
            registry,
            interval,
            grace,
        }
    }

    /// Run sweeps until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(reaper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            grace_secs = self.grace.as_secs(),
            "Link reaper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Link reaper shutting down");
                return;
            }

            self.sweep();

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Link reaper shutting down");
                    return;
                }
            }
        }
    }

    /// One eviction pass. Returns the number of records removed.
    pub fn sweep(&self) -> usize {
        let evicted = self.registry.reap(self.grace);
        debug!(evicted, remaining = self.registry.len(), "Link reaper sweep");
        evicted
    }
}
