//! histats-poller — periodic latency probing for the histats exporter.
//!
//! Each configured endpoint gets its own background task that probes the
//! endpoint's URL on a fixed interval and publishes successful samples on
//! the shared result channel.
//!
//! # Architecture
//!
//! ```text
//! PollerSet
//!   └── Per-endpoint background task (Poller::run)
//!       ├── interval tick
//!       ├── Probe::probe() → latency | ProbeError
//!       ├── FailureTracker (optional eviction)
//!       └── ResultSink::send(PollEvent)
//! ```
//!
//! Probe failures are logged and skipped. There is no backoff: the next
//! tick is the retry.

pub mod poller;
pub mod probe;
pub mod set;

pub use poller::{FailureTracker, Poller, TickOutcome};
pub use probe::{HttpProbe, Probe, ProbeError};
pub use set::{PollSchedule, PollerSet};
