//! histats-api — HTTP surface of the histats exporter.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Prometheus exposition of the latest latency per endpoint |

pub mod handlers;

use axum::Router;
use axum::routing::get;
use histats_metrics::MetricRepository;

/// Shared state for scrape handlers.
#[derive(Clone)]
pub struct ApiState {
    pub repo: MetricRepository,
}

/// Build the exporter router.
pub fn build_router(repo: MetricRepository) -> Router {
    Router::new()
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(ApiState { repo })
}
