// Core types used across all tether components
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:4444";

const TCP_SCHEME: &str = "tcp://";
const UNIX_SCHEME: &str = "unix:";

/// Remote endpoint a client connects to (or a listener binds to).
///
/// Text forms: `host:port`, `tcp://host:port`, `unix:/path` and `unix:///path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `host:port`, resolved at connect time.
    Tcp(String),
    /// Filesystem path of a Unix-domain stream socket.
    Unix(PathBuf),
}

impl Endpoint {
    pub fn tcp(addr: impl Into<String>) -> Self {
        Endpoint::Tcp(addr.into())
    }

    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Endpoint::Unix(path.into())
    }

    pub fn is_unix(&self) -> bool {
        matches!(self, Endpoint::Unix(_))
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Tcp(DEFAULT_ENDPOINT.to_string())
    }
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let invalid = |reason: &str| ConfigError::InvalidEndpoint {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        if let Some(rest) = input.strip_prefix(UNIX_SCHEME) {
            // unix:///tmp/sock and unix:/tmp/sock both name /tmp/sock
            let path = rest.strip_prefix("//").unwrap_or(rest);
            if path.is_empty() {
                return Err(invalid("missing socket path"));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }

        let addr = input.strip_prefix(TCP_SCHEME).unwrap_or(input);
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected host:port"))?;
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        port.parse::<u16>().map_err(|_| invalid("invalid port"))?;

        Ok(Endpoint::Tcp(addr.to_string()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "{}{}", TCP_SCHEME, addr),
            Endpoint::Unix(path) => write!(f, "{}//{}", UNIX_SCHEME, path.display()),
        }
    }
}

// Connection lifecycle: Unconnected -> Connected -> Closed (terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Unconnected = 0,
    Connected = 1,
    Closed = 2,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConnectionState::Unconnected => write!(f, "UNCONNECTED"),
            ConnectionState::Connected => write!(f, "CONNECTED"),
            ConnectionState::Closed => write!(f, "CLOSED"),
        }
    }
}
