// TCP transport implementation
use crate::traits::{not_bound, not_connected, Transport, TransportListener};
use nix::sys::socket::{setsockopt, sockopt};
use std::io::{Error, ErrorKind, Read, Result, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use tether_core::TransportOptions;
use tracing::{debug, trace};

pub struct TcpTransport {
    address: String,
    options: TransportOptions,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(address: &str) -> Self {
        Self::with_options(address, TransportOptions::default())
    }

    pub fn with_options(address: &str, options: TransportOptions) -> Self {
        TcpTransport {
            address: address.to_string(),
            options,
            stream: None,
        }
    }

    /// Wrap an already established stream (listener side).
    pub fn from_stream(stream: TcpStream) -> Self {
        let address = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_default();
        TcpTransport {
            address,
            options: TransportOptions::default(),
            stream: Some(stream),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        match self.stream {
            Some(ref stream) => stream.local_addr(),
            None => Err(not_connected()),
        }
    }

    /// Set socket send buffer size (SO_SNDBUF)
    pub fn set_send_buffer_size(&self, size: usize) -> Result<()> {
        if let Some(ref stream) = self.stream {
            setsockopt(stream, sockopt::SndBuf, &size).map_err(Error::from)?;
        }
        Ok(())
    }

    /// Set socket receive buffer size (SO_RCVBUF)
    pub fn set_recv_buffer_size(&self, size: usize) -> Result<()> {
        if let Some(ref stream) = self.stream {
            setsockopt(stream, sockopt::RcvBuf, &size).map_err(Error::from)?;
        }
        Ok(())
    }

    fn open(&self) -> Result<TcpStream> {
        let mut last_err = None;

        // Try every resolved address, like TcpStream::connect does
        for addr in self.address.to_socket_addrs()? {
            let attempt = match self.options.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    trace!(%addr, error = %e, "tcp connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("{} did not resolve to any address", self.address),
            )
        }))
    }

    fn apply_options(&self) -> Result<()> {
        let stream = self.stream.as_ref().ok_or_else(not_connected)?;
        stream.set_read_timeout(self.options.read_timeout)?;
        stream.set_write_timeout(self.options.write_timeout)?;
        stream.set_nodelay(self.options.nodelay)?;
        if let Some(size) = self.options.send_buffer_size {
            self.set_send_buffer_size(size)?;
        }
        if let Some(size) = self.options.recv_buffer_size {
            self.set_recv_buffer_size(size)?;
        }
        Ok(())
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, data: &[u8]) -> Result<usize> {
        if let Some(ref mut stream) = self.stream {
            stream.write(data)
        } else {
            Err(not_connected())
        }
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        if let Some(ref mut stream) = self.stream {
            stream.read(buf)
        } else {
            Err(not_connected())
        }
    }

    fn connect(&mut self) -> Result<()> {
        self.stream = Some(self.open()?);
        if let Err(e) = self.apply_options() {
            self.stream = None;
            return Err(e);
        }
        debug!(address = %self.address, "tcp connected");
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            // Peer may already be gone; the socket is released on drop either way
            match stream.shutdown(Shutdown::Both) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotConnected => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

pub struct TcpTransportListener {
    address: String,
    listener: Option<TcpListener>,
}

impl TcpTransportListener {
    pub fn new(address: &str) -> Self {
        TcpTransportListener {
            address: address.to_string(),
            listener: None,
        }
    }

    /// Actual bound address; resolves port 0 to the port the OS picked.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        match self.listener {
            Some(ref listener) => listener.local_addr(),
            None => Err(not_bound()),
        }
    }
}

impl TransportListener for TcpTransportListener {
    type Connection = TcpTransport;

    fn bind(&mut self) -> Result<()> {
        let listener = TcpListener::bind(&self.address)?;
        debug!(address = %self.address, "tcp listener bound");
        self.listener = Some(listener);
        Ok(())
    }

    fn accept(&mut self) -> Result<TcpTransport> {
        match self.listener {
            Some(ref listener) => {
                let (stream, peer) = listener.accept()?;
                trace!(%peer, "tcp connection accepted");
                Ok(TcpTransport::from_stream(stream))
            }
            None => Err(not_bound()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn bound_listener() -> TcpTransportListener {
        let mut listener = TcpTransportListener::new("127.0.0.1:0");
        listener.bind().unwrap();
        listener
    }

    #[test]
    fn io_before_connect_is_not_connected() {
        let mut transport = TcpTransport::new("127.0.0.1:1");
        assert!(!transport.is_connected());
        assert_eq!(transport.send(b"x").unwrap_err().kind(), ErrorKind::NotConnected);
        let mut buf = [0u8; 4];
        assert_eq!(transport.receive(&mut buf).unwrap_err().kind(), ErrorKind::NotConnected);
    }

    #[test]
    fn connect_send_receive_against_listener() {
        let mut listener = bound_listener();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let mut conn = listener.accept().unwrap();
            let mut buf = [0u8; 16];
            let n = conn.receive(&mut buf).unwrap();
            conn.send(&buf[..n]).unwrap();
        });

        let options = TransportOptions {
            connect_timeout: Some(Duration::from_secs(2)),
            read_timeout: Some(Duration::from_secs(5)),
            nodelay: true,
            send_buffer_size: Some(32 * 1024),
            ..TransportOptions::default()
        };
        let mut transport = TcpTransport::with_options(&addr.to_string(), options);
        transport.connect().unwrap();
        assert!(transport.is_connected());
        assert_eq!(transport.send(b"ping").unwrap(), 4);

        let mut buf = [0u8; 16];
        let n = transport.receive(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ping");

        server.join().unwrap();
        transport.disconnect().unwrap();
        assert!(!transport.is_connected());
        // Second disconnect has nothing left to release
        transport.disconnect().unwrap();
    }

    #[test]
    fn connect_to_closed_port_fails() {
        let addr = {
            let listener = bound_listener();
            listener.local_addr().unwrap()
        };
        let mut transport = TcpTransport::new(&addr.to_string());
        assert!(transport.connect().is_err());
        assert!(!transport.is_connected());
    }

    #[test]
    fn accept_before_bind_fails() {
        let mut listener = TcpTransportListener::new("127.0.0.1:0");
        assert!(listener.local_addr().is_err());
        assert!(listener.accept().is_err());
    }
}
