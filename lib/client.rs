// client: opens connections to the endpoint it was configured with
use tether_core::{ClientConfig, Endpoint};
use tether_transport::connect_endpoint;
use tracing::debug;

use crate::connection::Connection;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct TransportClient {
    config: ClientConfig,
}

impl TransportClient {
    pub fn new(config: ClientConfig) -> Self {
        TransportClient { config }
    }

    /// Client configured from `TETHER_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(TransportClient::new(ClientConfig::from_env()?))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.config.endpoint
    }

    /// Open one connection. Blocks until it is established or fails; never retries.
    pub fn connect(&self) -> Result<Connection> {
        let endpoint = &self.config.endpoint;
        let transport = connect_endpoint(endpoint, &self.config.options).map_err(|source| {
            debug!(%endpoint, error = %source, "connect failed");
            Error::Connection {
                endpoint: endpoint.clone(),
                source,
            }
        })?;
        debug!(%endpoint, "connected");
        Connection::from_transport(endpoint.clone(), transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::net::TcpListener;
    use std::time::Duration;
    use tether_core::ConnectionState;

    #[test]
    fn connects_to_a_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = Endpoint::tcp(listener.local_addr().unwrap().to_string());
        let client = TransportClient::new(ClientConfig::new(endpoint.clone()));

        let conn = client.connect().unwrap();
        assert_eq!(conn.state(), ConnectionState::Connected);
        assert_eq!(conn.endpoint(), &endpoint);
    }

    #[test]
    fn unresolvable_host_is_a_connection_error() {
        let config = ClientConfig::new(Endpoint::tcp("host.invalid:4444"))
            .with_connect_timeout(Duration::from_millis(200));
        let err = TransportClient::new(config).connect().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn missing_unix_socket_is_a_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::new(Endpoint::unix(dir.path().join("nobody.sock")));
        let err = TransportClient::new(config).connect().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.io_error().is_some());
    }
}
