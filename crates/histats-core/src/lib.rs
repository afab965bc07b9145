//! histats-core — shared types, configuration and the poller→collector
//! result channel for the histats exporter.

pub mod channel;
pub mod config;
pub mod error;
pub mod types;

pub use channel::{result_channel, ResultReceiver, ResultSink, SendOutcome};
pub use config::{HistatsConfig, OverflowPolicy, PollingConfig, ServerConfig};
pub use error::{ConfigError, ConfigResult, SinkClosed};
pub use types::*;
