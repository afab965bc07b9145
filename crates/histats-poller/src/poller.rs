//! Per-endpoint polling loop.
//!
//! A poller fires on a fixed interval, probes its endpoint, and publishes a
//! sample on success. Failures skip the tick; the next tick is the retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use histats_core::{Endpoint, Metric, PollEvent, PollResult, ResultSink, SendOutcome, SinkClosed};

use crate::probe::Probe;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// A sample was published.
    Sampled(Metric),
    /// The full channel discarded the sample or expiry.
    Dropped,
    /// The probe failed; nothing was published.
    Failed,
    /// The probe failed and the endpoint's series was expired.
    Expired,
}

/// Counts consecutive probe failures for a single endpoint.
#[derive(Debug, Default)]
pub struct FailureTracker {
    consecutive_failures: u32,
    /// Failures before the series is expired. Zero disables expiry.
    evict_after: u32,
    /// Set once the collector has been handed this streak's expiry.
    expired: bool,
}

impl FailureTracker {
    pub fn new(evict_after: u32) -> Self {
        Self {
            consecutive_failures: 0,
            evict_after,
            expired: false,
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.expired = false;
    }

    /// Record a failure. Returns true once the streak has reached the
    /// eviction threshold, and keeps returning true on later failures until
    /// [`FailureTracker::mark_expired`] is called.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.evict_after > 0 && self.consecutive_failures >= self.evict_after && !self.expired
    }

    /// The expiry for the current streak reached the collector.
    pub fn mark_expired(&mut self) {
        self.expired = true;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

pub struct Poller<P> {
    endpoint: Endpoint,
    probe: Arc<P>,
    sink: ResultSink,
    interval: Duration,
    tracker: FailureTracker,
}

impl<P: Probe> Poller<P> {
    /// `interval` must be non-zero.
    pub fn new(endpoint: Endpoint, probe: Arc<P>, sink: ResultSink, interval: Duration) -> Self {
        Self {
            endpoint,
            probe,
            sink,
            interval,
            tracker: FailureTracker::default(),
        }
    }

    /// Expire the endpoint's series after `failures` consecutive failures.
    pub fn with_eviction(mut self, failures: u32) -> Self {
        self.tracker = FailureTracker::new(failures);
        self
    }

    /// Probe once and publish the outcome.
    pub async fn tick(&mut self) -> Result<TickOutcome, SinkClosed> {
        match self.probe.probe(self.endpoint.url()).await {
            Ok(latency) => {
                self.tracker.record_success();
                let metric = Metric::from_latency(latency);
                let event = PollEvent::Sample(PollResult {
                    endpoint: self.endpoint.clone(),
                    metric,
                });
                match self.sink.send(event).await? {
                    SendOutcome::Delivered => Ok(TickOutcome::Sampled(metric)),
                    SendOutcome::Dropped => Ok(TickOutcome::Dropped),
                }
            }
            Err(e) => {
                warn!(
                    endpoint = %self.endpoint.name(),
                    url = %self.endpoint.url(),
                    error = %e,
                    "probe failed"
                );
                if !self.tracker.record_failure() {
                    return Ok(TickOutcome::Failed);
                }
                match self.sink.send(PollEvent::Expired(self.endpoint.clone())).await? {
                    SendOutcome::Delivered => {
                        self.tracker.mark_expired();
                        Ok(TickOutcome::Expired)
                    }
                    // Retried on the next failed tick.
                    SendOutcome::Dropped => Ok(TickOutcome::Dropped),
                }
            }
        }
    }

    /// Tick every interval until shutdown or until the collector goes away.
    ///
    /// The first probe fires one interval after start.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(endpoint = %self.endpoint.name(), interval = ?self.interval, "poller starting");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.tick().await.is_err() {
                        info!(endpoint = %self.endpoint.name(), "result channel closed, poller stopping");
                        break;
                    }
                }
                _ = shutdown.changed() => {
                    debug!(endpoint = %self.endpoint.name(), "poller shutting down");
                    break;
                }
            }
        }
    }
}
