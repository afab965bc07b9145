//! Collector — the single writer of the metric repository.
//!
//! Drains the poller result channel and applies each event to the
//! repository. Because there is exactly one collector, repository writes
//! are serialized without any coordination beyond the repository lock.

use tokio::sync::watch;
use tracing::{debug, info};

use histats_core::{PollEvent, ResultReceiver};

use crate::repository::MetricRepository;

pub struct Collector {
    repo: MetricRepository,
}

impl Collector {
    pub fn new(repo: MetricRepository) -> Self {
        Self { repo }
    }

    /// Apply one event to the repository.
    pub async fn apply(&self, event: PollEvent) {
        match event {
            PollEvent::Sample(result) => {
                debug!(
                    endpoint = %result.endpoint.name(),
                    latency_ms = result.metric.value,
                    "sample recorded"
                );
                self.repo.update(result.endpoint.name(), result.metric).await;
            }
            PollEvent::Expired(endpoint) => {
                if self.repo.remove(endpoint.name()).await {
                    info!(endpoint = %endpoint.name(), "series evicted after repeated failures");
                }
            }
        }
    }

    /// Consume events until every sink is dropped or shutdown is signalled.
    pub async fn run(self, mut results: ResultReceiver, mut shutdown: watch::Receiver<bool>) {
        info!("collector started");

        loop {
            tokio::select! {
                event = results.recv() => match event {
                    Some(event) => self.apply(event).await,
                    None => {
                        info!("result channel closed, collector stopping");
                        break;
                    }
                },
                _ = shutdown.changed() => {
                    info!("collector shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histats_core::{result_channel, Endpoint, Metric, OverflowPolicy, PollResult};

    fn sample(name: &str, value: f64) -> PollEvent {
        PollEvent::Sample(PollResult {
            endpoint: Endpoint::new(name, format!("http://{name}.test")),
            metric: Metric::new(1000, value),
        })
    }

    #[tokio::test]
    async fn apply_sample_then_expire() {
        let repo = MetricRepository::new();
        let collector = Collector::new(repo.clone());

        collector.apply(sample("a", 5.0)).await;
        assert_eq!(repo.get("a").await.unwrap().latest.value, 5.0);

        collector
            .apply(PollEvent::Expired(Endpoint::new("a", "http://a.test")))
            .await;
        assert!(repo.get("a").await.is_none());

        // Expiring an absent series is a no-op.
        collector
            .apply(PollEvent::Expired(Endpoint::new("b", "http://b.test")))
            .await;
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn run_applies_in_order_until_channel_closes() {
        let repo = MetricRepository::new();
        let (sink, rx) = result_channel(16, OverflowPolicy::Block);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        for v in [1.0, 2.0, 3.0] {
            sink.send(sample("a", v)).await.unwrap();
        }
        sink.send(sample("b", 9.0)).await.unwrap();
        drop(sink);

        // Returns on its own once the channel is drained and closed.
        Collector::new(repo.clone()).run(rx, shutdown_rx).await;

        assert_eq!(
            repo.dump().await,
            vec![
                ("a".to_string(), Metric::new(1000, 3.0)),
                ("b".to_string(), Metric::new(1000, 9.0)),
            ]
        );
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (_sink, rx) = result_channel(16, OverflowPolicy::Block);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(Collector::new(MetricRepository::new()).run(rx, shutdown_rx));
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("collector did not stop")
            .unwrap();
    }
}
