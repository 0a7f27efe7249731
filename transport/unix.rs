// Unix socket transport implementation (blocking stream sockets)
use crate::traits::{not_bound, not_connected, Transport, TransportListener};
use nix::sys::socket::{setsockopt, sockopt};
use std::io::{Error, ErrorKind, Read, Result, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use tether_core::TransportOptions;
use tracing::{debug, trace};

pub struct UnixSocketTransport {
    socket_path: PathBuf,
    options: TransportOptions,
    stream: Option<UnixStream>,
}

impl UnixSocketTransport {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self::with_options(socket_path, TransportOptions::default())
    }

    pub fn with_options(socket_path: impl AsRef<Path>, options: TransportOptions) -> Self {
        UnixSocketTransport {
            socket_path: socket_path.as_ref().to_path_buf(),
            options,
            stream: None,
        }
    }

    pub fn from_stream(socket_path: impl AsRef<Path>, stream: UnixStream) -> Self {
        UnixSocketTransport {
            socket_path: socket_path.as_ref().to_path_buf(),
            options: TransportOptions::default(),
            stream: Some(stream),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
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

    fn apply_options(&self) -> Result<()> {
        let stream = self.stream.as_ref().ok_or_else(not_connected)?;
        // Blocking mode: callers get the unbounded-wait default unless timeouts are set
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(self.options.read_timeout)?;
        stream.set_write_timeout(self.options.write_timeout)?;
        if let Some(size) = self.options.send_buffer_size {
            self.set_send_buffer_size(size)?;
        }
        if let Some(size) = self.options.recv_buffer_size {
            self.set_recv_buffer_size(size)?;
        }
        Ok(())
    }
}

impl Transport for UnixSocketTransport {
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
        // UnixStream has no connect_timeout; a local socket either accepts or refuses at once
        self.stream = Some(UnixStream::connect(&self.socket_path)?);
        if let Err(e) = self.apply_options() {
            self.stream = None;
            return Err(e);
        }
        debug!(path = %self.socket_path.display(), "unix socket connected");
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            match stream.shutdown(std::net::Shutdown::Both) {
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

pub struct UnixTransportListener {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
}

impl UnixTransportListener {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        UnixTransportListener {
            socket_path: socket_path.as_ref().to_path_buf(),
            listener: None,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl TransportListener for UnixTransportListener {
    type Connection = UnixSocketTransport;

    fn bind(&mut self) -> Result<()> {
        // Remove old socket if exists
        match std::fs::remove_file(&self.socket_path) {
            Ok(()) => trace!(path = %self.socket_path.display(), "removed stale socket"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        let listener = UnixListener::bind(&self.socket_path)?;
        debug!(path = %self.socket_path.display(), "unix listener bound");
        self.listener = Some(listener);
        Ok(())
    }

    fn accept(&mut self) -> Result<UnixSocketTransport> {
        match self.listener {
            Some(ref listener) => {
                let (stream, _) = listener.accept()?;
                trace!(path = %self.socket_path.display(), "unix connection accepted");
                Ok(UnixSocketTransport::from_stream(&self.socket_path, stream))
            }
            None => Err(not_bound()),
        }
    }
}

impl Drop for UnixTransportListener {
    fn drop(&mut self) {
        if self.listener.take().is_some() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn round_trip_over_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peer.sock");

        let mut listener = UnixTransportListener::new(&path);
        listener.bind().unwrap();

        let server = thread::spawn(move || {
            let mut conn = listener.accept().unwrap();
            let mut buf = [0u8; 8];
            let n = conn.receive(&mut buf).unwrap();
            conn.send(&buf[..n]).unwrap();
            // Returned so the socket file outlives the client's read
            listener
        });

        let options = TransportOptions {
            send_buffer_size: Some(16 * 1024),
            ..TransportOptions::default()
        };
        let mut transport = UnixSocketTransport::with_options(&path, options);
        transport.connect().unwrap();
        assert_eq!(transport.send(b"hello").unwrap(), 5);

        let mut buf = [0u8; 8];
        let n = transport.receive(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");

        transport.disconnect().unwrap();
        assert!(!transport.is_connected());
        drop(server.join().unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn bind_replaces_stale_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.sock");
        std::fs::write(&path, b"").unwrap();

        let mut listener = UnixTransportListener::new(&path);
        listener.bind().unwrap();
        assert!(UnixStream::connect(&path).is_ok());
    }

    #[test]
    fn connect_without_listener_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = UnixSocketTransport::new(dir.path().join("absent.sock"));
        assert!(transport.connect().is_err());
        assert!(!transport.is_connected());
    }
}
