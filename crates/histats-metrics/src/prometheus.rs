//! Prometheus text exposition.
//!
//! Renders a repository snapshot as one `<name>_response_ms <value>` line per
//! series. Values use the shortest decimal form that round-trips, so a whole
//! number renders without a fractional part.

use std::fmt::Write;

use histats_core::Metric;

/// Suffix appended to every endpoint name.
pub const METRIC_SUFFIX: &str = "_response_ms";

/// Render a snapshot into Prometheus text format.
pub fn render_prometheus(snapshot: &[(String, Metric)]) -> String {
    let mut out = String::new();
    for (name, metric) in snapshot {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{name}{METRIC_SUFFIX} {}", metric.value);
    }
    out
}
