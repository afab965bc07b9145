//! histats.toml configuration parser.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Endpoint;

/// Sites polled when the config names no endpoints.
const DEFAULT_SITES: &[(&str, &str)] = &[
    ("amazon", "amazon.com"),
    ("facebook", "facebook.com"),
    ("google", "google.com"),
    ("instagram", "instagram.com"),
    ("linkedin", "linkedin.com"),
    ("netflix", "netflix.com"),
    ("reddit", "reddit.com"),
    ("twitch", "twitch.tv"),
    ("twitter", "twitter.com"),
    ("wikipedia", "wikipedia.org"),
    ("yahoo", "yahoo.com"),
    ("youtube", "youtube.com"),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistatsConfig {
    pub server: ServerConfig,
    pub polling: PollingConfig,
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8081".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval: String,
    pub timeout: String,
    /// Result channel capacity. `0` means unbounded.
    pub channel_capacity: usize,
    pub overflow: OverflowPolicy,
    /// Consecutive failures after which an endpoint's series is evicted.
    /// `0` keeps the last known value forever.
    pub evict_after_failures: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: "1s".to_string(),
            timeout: "800ms".to_string(),
            channel_capacity: 1024,
            overflow: OverflowPolicy::Block,
            evict_after_failures: 0,
        }
    }
}

/// What a poller does when the bounded result channel is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Wait for the collector to free a slot.
    #[default]
    Block,
    /// Discard the new result and log it.
    DropNewest,
}

impl HistatsConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Check every field that can be checked without touching the network.
    pub fn validate(&self) -> ConfigResult<()> {
        self.listen_addr()?;
        self.polling.interval()?;
        self.polling.probe_timeout()?;

        let mut seen = HashSet::new();
        for ep in &self.endpoints {
            validate_name(ep.name())?;
            validate_url(ep)?;
            if !seen.insert(ep.name()) {
                return Err(ConfigError::DuplicateName(ep.name().to_string()));
            }
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> ConfigResult<SocketAddr> {
        self.server
            .listen
            .parse()
            .map_err(|_| ConfigError::InvalidListen(self.server.listen.clone()))
    }

    /// The configured endpoints, or the built-in site list if none are set.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        if self.endpoints.is_empty() {
            default_endpoints()
        } else {
            self.endpoints.clone()
        }
    }
}

impl std::str::FromStr for HistatsConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        let config: HistatsConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl PollingConfig {
    pub fn interval(&self) -> ConfigResult<Duration> {
        let interval = parse_duration(&self.interval)
            .ok_or_else(|| ConfigError::InvalidDuration(self.interval.clone()))?;
        if interval.is_zero() {
            return Err(ConfigError::ZeroDuration("polling.interval"));
        }
        Ok(interval)
    }

    /// Per-request timeout, always shorter than the polling interval. A
    /// timeout at or above the interval falls back to 4/5 of it.
    pub fn probe_timeout(&self) -> ConfigResult<Duration> {
        let timeout = parse_duration(&self.timeout)
            .ok_or_else(|| ConfigError::InvalidDuration(self.timeout.clone()))?;
        if timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("polling.timeout"));
        }
        let interval = self.interval()?;
        if timeout < interval {
            Ok(timeout)
        } else {
            Ok(interval * 4 / 5)
        }
    }
}

pub fn default_endpoints() -> Vec<Endpoint> {
    DEFAULT_SITES
        .iter()
        .map(|(name, host)| Endpoint::new(*name, format!("https://www.{host}")))
        .collect()
}

/// Parse a polling duration: `500ms`, `5s`, `2m`, or bare seconds.
///
/// Returns `None` for anything else, including minute counts too large to
/// represent.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (digits, unit_ms) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60_000)
    } else {
        (s, 1_000)
    };
    let count: u64 = digits.parse().ok()?;
    count.checked_mul(unit_ms).map(Duration::from_millis)
}

fn validate_name(name: &str) -> ConfigResult<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(ConfigError::EmptyName);
    };
    let valid_first = first.is_ascii_alphabetic() || first == '_' || first == ':';
    if !valid_first || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':') {
        return Err(ConfigError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn validate_url(ep: &Endpoint) -> ConfigResult<()> {
    let invalid = |reason: &str| ConfigError::InvalidUrl {
        name: ep.name().to_string(),
        url: ep.url().to_string(),
        reason: reason.to_string(),
    };

    let uri: http::Uri = ep.url().parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(_) => return Err(invalid("scheme must be http or https")),
        None => return Err(invalid("missing scheme")),
    }
    match uri.host() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(invalid("missing host")),
    }
}
