//! Metric repository — last-value cache of per-endpoint latency series.
//!
//! A single reader/writer lock guards the whole map. The collector is the
//! only writer; scrape handlers take the read side to snapshot it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use histats_core::{Metric, Series};

/// Thread-safe store of the latest sample per series name.
///
/// Cloning yields another handle to the same map.
#[derive(Clone, Default)]
pub struct MetricRepository {
    series: Arc<RwLock<HashMap<String, Series>>>,
}

impl MetricRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace (or create) the latest sample for `name`.
    pub async fn update(&self, name: &str, metric: Metric) {
        let mut series = self.series.write().await;
        match series.get_mut(name) {
            Some(existing) => existing.latest = metric,
            None => {
                series.insert(name.to_string(), Series::new(name, metric));
            }
        }
    }

    /// Drop a series. Returns whether it was present.
    pub async fn remove(&self, name: &str) -> bool {
        self.series.write().await.remove(name).is_some()
    }

    /// Consistent snapshot of every series' latest sample, sorted by name.
    pub async fn dump(&self) -> Vec<(String, Metric)> {
        let series = self.series.read().await;
        let mut out: Vec<(String, Metric)> = series
            .iter()
            .map(|(name, s)| (name.clone(), s.latest))
            .collect();
        drop(series);

        out.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub async fn get(&self, name: &str) -> Option<Series> {
        self.series.read().await.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.series.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.series.read().await.is_empty()
    }
}
