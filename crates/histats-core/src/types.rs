//! Shared types used across histats crates.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A named network target monitored for latency.
///
/// The name doubles as the repository key and the metric name prefix, so it
/// must be unique across the configured set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    name: String,
    url: String,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// A single timestamped latency sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Unix seconds at which the probe completed.
    pub timestamp: u64,
    /// Round-trip latency in milliseconds.
    pub value: f64,
}

impl Metric {
    pub fn new(timestamp: u64, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Build a sample from a measured latency, stamped with the current time.
    ///
    /// Latency is truncated to whole microseconds before conversion.
    pub fn from_latency(latency: Duration) -> Self {
        Self::new(epoch_secs(), latency_ms(latency))
    }
}

/// The named record held in the repository, one per endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub help: String,
    pub metric_type: String,
    pub latest: Metric,
}

impl Series {
    /// A series with empty help and type fields.
    pub fn new(name: impl Into<String>, latest: Metric) -> Self {
        Self {
            name: name.into(),
            help: String::new(),
            metric_type: String::new(),
            latest,
        }
    }
}

/// Outcome of a successful poll, in flight from a poller to the collector.
#[derive(Debug, Clone, PartialEq)]
pub struct PollResult {
    pub endpoint: Endpoint,
    pub metric: Metric,
}

/// Item carried on the result channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// A successful probe.
    Sample(PollResult),
    /// The endpoint crossed its consecutive-failure limit; its series
    /// should be dropped from the repository.
    Expired(Endpoint),
}

impl PollEvent {
    pub fn endpoint(&self) -> &Endpoint {
        match self {
            PollEvent::Sample(result) => &result.endpoint,
            PollEvent::Expired(endpoint) => endpoint,
        }
    }
}

/// Convert a duration to fractional milliseconds at microsecond resolution.
pub fn latency_ms(latency: Duration) -> f64 {
    latency.as_micros() as f64 / 1000.0
}

pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
