// Client configuration: explicit values or environment variables
use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::types::Endpoint;

// Environment variables for configuration
// TETHER_ENDPOINT: host:port, tcp://host:port or unix:/path (default: 127.0.0.1:4444)
// TETHER_CONNECT_TIMEOUT_MS: bound on connect, 0 = block forever (default: 0)
// TETHER_READ_TIMEOUT_MS / TETHER_WRITE_TIMEOUT_MS: per-call I/O bound, 0 = block forever (default: 0)
// TETHER_NODELAY: disable Nagle on TCP, 0/1/true/false (default: 0)
// TETHER_SEND_BUFFER_SIZE / TETHER_RECV_BUFFER_SIZE: SO_SNDBUF / SO_RCVBUF in bytes (default: OS)

pub const ENV_ENDPOINT: &str = "TETHER_ENDPOINT";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "TETHER_CONNECT_TIMEOUT_MS";
pub const ENV_READ_TIMEOUT_MS: &str = "TETHER_READ_TIMEOUT_MS";
pub const ENV_WRITE_TIMEOUT_MS: &str = "TETHER_WRITE_TIMEOUT_MS";
pub const ENV_NODELAY: &str = "TETHER_NODELAY";
pub const ENV_SEND_BUFFER_SIZE: &str = "TETHER_SEND_BUFFER_SIZE";
pub const ENV_RECV_BUFFER_SIZE: &str = "TETHER_RECV_BUFFER_SIZE";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid endpoint {input:?}: {reason}")]
    InvalidEndpoint { input: String, reason: String },

    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },
}

/// Socket-level options shared by every transport backend.
///
/// `None` timeouts mean blocking without bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub nodelay: bool,
    pub send_buffer_size: Option<usize>,
    pub recv_buffer_size: Option<usize>,
}

/// Everything a client needs to open a connection. Passed at construction,
/// never read from process-wide state behind the caller's back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    pub options: TransportOptions,
}

impl ClientConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        ClientConfig {
            endpoint,
            options: TransportOptions::default(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = non_zero(timeout);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.options.read_timeout = non_zero(timeout);
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.options.write_timeout = non_zero(timeout);
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.options.nodelay = nodelay;
        self
    }

    pub fn with_send_buffer_size(mut self, size: usize) -> Self {
        self.options.send_buffer_size = Some(size);
        self
    }

    pub fn with_recv_buffer_size(mut self, size: usize) -> Self {
        self.options.recv_buffer_size = Some(size);
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = match lookup(ENV_ENDPOINT) {
            Some(value) => value.parse()?,
            None => Endpoint::default(),
        };

        let options = TransportOptions {
            connect_timeout: parse_millis(&lookup, ENV_CONNECT_TIMEOUT_MS)?,
            read_timeout: parse_millis(&lookup, ENV_READ_TIMEOUT_MS)?,
            write_timeout: parse_millis(&lookup, ENV_WRITE_TIMEOUT_MS)?,
            nodelay: parse_bool(&lookup, ENV_NODELAY)?.unwrap_or(false),
            send_buffer_size: parse_number(&lookup, ENV_SEND_BUFFER_SIZE)?,
            recv_buffer_size: parse_number(&lookup, ENV_RECV_BUFFER_SIZE)?,
        };

        Ok(ClientConfig { endpoint, options })
    }
}

fn non_zero(timeout: Duration) -> Option<Duration> {
    if timeout.is_zero() {
        None
    } else {
        Some(timeout)
    }
}

fn parse_number<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(None),
    }
}

fn parse_millis<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_number::<F, u64>(lookup, var)?
        .map(Duration::from_millis)
        .and_then(non_zero))
}

fn parse_bool<F>(lookup: &F, var: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue { var, value }),
        },
        None => Ok(None),
    }
}
