//! Poller set — one background task per configured endpoint.
//!
//! The endpoint set is fixed when the set is spawned. Each task gets its own
//! shutdown signal so pollers stop independently of the collector.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use histats_core::{Endpoint, ResultSink};

use crate::poller::Poller;
use crate::probe::Probe;

/// Schedule shared by every poller in a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    /// Consecutive failures before a series is expired; zero disables.
    pub evict_after_failures: u32,
}

/// Per-endpoint poller state.
struct PollerSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// Owns the running pollers.
pub struct PollerSet {
    /// endpoint name → slot.
    slots: HashMap<String, PollerSlot>,
}

impl PollerSet {
    /// Spawn a poller for every endpoint.
    ///
    /// Endpoint names are assumed unique; a repeated name replaces the
    /// earlier poller.
    pub fn spawn<P: Probe>(
        endpoints: impl IntoIterator<Item = Endpoint>,
        probe: Arc<P>,
        sink: ResultSink,
        schedule: PollSchedule,
    ) -> Self {
        let mut slots = HashMap::new();

        for endpoint in endpoints {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let name = endpoint.name().to_string();
            let url = endpoint.url().to_string();

            let poller = Poller::new(endpoint, probe.clone(), sink.clone(), schedule.interval)
                .with_eviction(schedule.evict_after_failures);
            let handle = tokio::spawn(poller.run(shutdown_rx));

            if let Some(old) = slots.insert(name.clone(), PollerSlot { handle, shutdown_tx }) {
                let _ = old.shutdown_tx.send(true);
                old.handle.abort();
            }

            info!(endpoint = %name, %url, "poller started");
        }

        Self { slots }
    }

    /// Signal every poller and wait for them to finish.
    pub async fn stop_all(&mut self) {
        for (name, slot) in self.slots.drain() {
            let _ = slot.shutdown_tx.send(true);
            if let Err(e) = slot.handle.await {
                debug!(endpoint = %name, error = %e, "poller task ended abnormally");
            }
        }
        info!("all pollers stopped");
    }

    /// Endpoint names with a running poller, sorted.
    pub fn active(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
