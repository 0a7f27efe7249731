// Endpoint dispatch: pick the backend that matches an Endpoint
use crate::tcp::{TcpTransport, TcpTransportListener};
use crate::traits::{Transport, TransportListener};
use crate::unix::{UnixSocketTransport, UnixTransportListener};
use std::io::Result;
use tether_core::{Endpoint, TransportOptions};

/// Unconnected transport for `endpoint`; call `connect()` on it.
pub fn transport_for(endpoint: &Endpoint, options: &TransportOptions) -> Box<dyn Transport> {
    match endpoint {
        Endpoint::Tcp(addr) => Box::new(TcpTransport::with_options(addr, options.clone())),
        Endpoint::Unix(path) => Box::new(UnixSocketTransport::with_options(path, options.clone())),
    }
}

pub fn connect_endpoint(endpoint: &Endpoint, options: &TransportOptions) -> Result<Box<dyn Transport>> {
    let mut transport = transport_for(endpoint, options);
    transport.connect()?;
    Ok(transport)
}

pub enum EndpointListener {
    Tcp(TcpTransportListener),
    Unix(UnixTransportListener),
}

impl EndpointListener {
    pub fn new(endpoint: &Endpoint) -> Self {
        match endpoint {
            Endpoint::Tcp(addr) => EndpointListener::Tcp(TcpTransportListener::new(addr)),
            Endpoint::Unix(path) => EndpointListener::Unix(UnixTransportListener::new(path)),
        }
    }

    pub fn bind_endpoint(endpoint: &Endpoint) -> Result<Self> {
        let mut listener = Self::new(endpoint);
        listener.bind()?;
        Ok(listener)
    }

    /// Endpoint clients should dial; TCP port 0 is replaced by the bound port.
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        match self {
            EndpointListener::Tcp(l) => Ok(Endpoint::Tcp(l.local_addr()?.to_string())),
            EndpointListener::Unix(l) => Ok(Endpoint::Unix(l.socket_path().to_path_buf())),
        }
    }
}

impl TransportListener for EndpointListener {
    type Connection = Box<dyn Transport>;

    fn bind(&mut self) -> Result<()> {
        match self {
            EndpointListener::Tcp(l) => l.bind(),
            EndpointListener::Unix(l) => l.bind(),
        }
    }

    fn accept(&mut self) -> Result<Box<dyn Transport>> {
        match self {
            EndpointListener::Tcp(l) => Ok(Box::new(l.accept()?)),
            EndpointListener::Unix(l) => Ok(Box::new(l.accept()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn echo_once(mut listener: EndpointListener) -> thread::JoinHandle<EndpointListener> {
        thread::spawn(move || {
            let mut conn = listener.accept().unwrap();
            let mut buf = [0u8; 32];
            let n = conn.receive(&mut buf).unwrap();
            conn.send(&buf[..n]).unwrap();
            listener
        })
    }

    fn exchange(endpoint: &Endpoint) {
        let mut transport = connect_endpoint(endpoint, &TransportOptions::default()).unwrap();
        assert!(transport.is_connected());
        transport.send(b"dispatch").unwrap();
        let mut buf = [0u8; 32];
        let n = transport.receive(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"dispatch");
    }

    #[test]
    fn tcp_port_zero_resolves_to_bound_port() {
        let listener = EndpointListener::bind_endpoint(&Endpoint::tcp("127.0.0.1:0")).unwrap();
        let endpoint = listener.local_endpoint().unwrap();
        assert_ne!(endpoint, Endpoint::tcp("127.0.0.1:0"));

        let server = echo_once(listener);
        exchange(&endpoint);
        server.join().unwrap();
    }

    #[test]
    fn unix_endpoint_dispatches_to_unix_backend() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Endpoint::unix(dir.path().join("dispatch.sock"));
        let listener = EndpointListener::bind_endpoint(&endpoint).unwrap();
        assert_eq!(listener.local_endpoint().unwrap(), endpoint);

        let server = echo_once(listener);
        exchange(&endpoint);
        server.join().unwrap();
    }

    #[test]
    fn transport_for_starts_unconnected() {
        let transport = transport_for(&Endpoint::default(), &TransportOptions::default());
        assert!(!transport.is_connected());
    }
}
