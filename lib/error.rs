// Error taxonomy surfaced by the transport client
use std::fmt;
use std::io;

use tether_core::{ConfigError, Endpoint};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// I/O direction that failed on an established connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Send,
    Receive,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operation::Send => write!(f, "send"),
            Operation::Receive => write!(f, "receive"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The connection could not be established (unreachable, refused,
    /// unresolvable, timed out, or no resource left to allocate).
    #[error("could not connect to {endpoint}: {source}")]
    Connection {
        endpoint: Endpoint,
        #[source]
        source: io::Error,
    },

    /// I/O attempted on a handle that is not open.
    #[error("connection closed")]
    ConnectionClosed,

    /// I/O failure on an open connection. The handle is closed afterwards.
    #[error("{op} failed: {source}")]
    Transport {
        op: Operation,
        #[source]
        source: io::Error,
    },

    /// Caller-supplied length, buffer or handle violates the call contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    ConnectionClosed,
    Transport,
    InvalidArgument,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection { .. } => ErrorKind::Connection,
            Error::ConnectionClosed => ErrorKind::ConnectionClosed,
            Error::Transport { .. } => ErrorKind::Transport,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Underlying OS error, when there is one.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Error::Connection { source, .. } | Error::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn kinds_match_variants() {
        let refused = Error::Connection {
            endpoint: Endpoint::default(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(refused.kind(), ErrorKind::Connection);
        assert_eq!(
            refused.io_error().map(|e| e.kind()),
            Some(io::ErrorKind::ConnectionRefused)
        );
        assert!(refused.source().is_some());

        assert_eq!(Error::ConnectionClosed.kind(), ErrorKind::ConnectionClosed);
        assert!(Error::ConnectionClosed.io_error().is_none());
        assert_eq!(Error::invalid_argument("x").kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn messages_name_the_failing_side() {
        let err = Error::Transport {
            op: Operation::Receive,
            source: io::Error::from(io::ErrorKind::ConnectionReset),
        };
        assert!(err.to_string().starts_with("receive failed"));

        let err = Error::Connection {
            endpoint: Endpoint::tcp("10.1.2.3:9"),
            source: io::Error::from(io::ErrorKind::TimedOut),
        };
        assert!(err.to_string().contains("tcp://10.1.2.3:9"));
    }
}
