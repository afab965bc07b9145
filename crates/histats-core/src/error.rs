//! Error types for histats configuration.

use thiserror::Error;

/// Result type alias for configuration loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or validating a `histats.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("invalid listen address: {0:?}")]
    InvalidListen(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("endpoint name is empty")]
    EmptyName,

    #[error("endpoint name {0:?} is not a valid metric name")]
    InvalidName(String),

    #[error("duplicate endpoint name: {0}")]
    DuplicateName(String),

    #[error("endpoint {name}: invalid url {url:?}: {reason}")]
    InvalidUrl {
        name: String,
        url: String,
        reason: String,
    },
}

/// The collector side of the result channel has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("result channel closed")]
pub struct SinkClosed;
