//! histats-metrics — the latency repository and its writer and reader.
//!
//! # Architecture
//!
//! ```text
//! ResultReceiver ──► Collector::run()
//!                      └── MetricRepository::update() / remove()
//!
//! /metrics handler
//!   └── MetricRepository::dump() ──► render_prometheus()
//! ```

pub mod collector;
pub mod prometheus;
pub mod repository;

pub use collector::Collector;
pub use prometheus::render_prometheus;
pub use repository::MetricRepository;
