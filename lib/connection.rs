// Connection handle: one open stream, its state machine and bounded I/O
use std::fmt;
use std::io;

use tether_core::{ConnectionState, Endpoint};
use tether_transport::Transport;
use tracing::{debug, trace, warn};

use crate::error::{Error, Operation, Result};

/// One established connection, exclusively owned by whoever called `connect`.
///
/// All I/O takes `&mut self`, so a handle cannot be driven from two callers
/// at once. Any I/O failure closes the handle for good; dropping it closes it
/// too.
pub struct Connection {
    endpoint: Endpoint,
    // None once closed: the OS resource is released as soon as we leave Connected
    transport: Option<Box<dyn Transport>>,
    eof: bool,
}

impl Connection {
    /// Adopt a transport that is already connected.
    pub fn from_transport(endpoint: Endpoint, transport: Box<dyn Transport>) -> Result<Self> {
        if !transport.is_connected() {
            return Err(Error::invalid_argument(format!(
                "transport for {} is not connected",
                endpoint
            )));
        }
        Ok(Connection {
            endpoint,
            transport: Some(transport),
            eof: false,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        if self.transport.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Closed
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// True once a `receive` has reported end-of-stream.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Write up to `length` bytes of `data`; returns how many the transport took.
    ///
    /// A short count is not an error. Callers that need every byte delivered
    /// loop, or use [`Connection::send_all`].
    pub fn send(&mut self, data: &[u8], length: usize) -> Result<usize> {
        let transport = self.transport.as_mut().ok_or(Error::ConnectionClosed)?;
        if length > data.len() {
            return Err(Error::invalid_argument(format!(
                "send length {} exceeds payload of {} bytes",
                length,
                data.len()
            )));
        }
        if length == 0 {
            return Ok(0);
        }

        let result = loop {
            match transport.send(&data[..length]) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };

        match result {
            Ok(n) => {
                trace!(endpoint = %self.endpoint, requested = length, written = n, "send");
                Ok(n)
            }
            Err(e) => Err(self.fail(Operation::Send, e)),
        }
    }

    /// Read at most `max_length` bytes into `buf[..max_length]`.
    ///
    /// `Ok(0)` with `max_length > 0` means the peer closed its write side. Bytes
    /// of `buf` past the returned count are left as they were.
    pub fn receive(&mut self, buf: &mut [u8], max_length: usize) -> Result<usize> {
        let transport = self.transport.as_mut().ok_or(Error::ConnectionClosed)?;
        if max_length > buf.len() {
            return Err(Error::invalid_argument(format!(
                "receive length {} exceeds buffer of {} bytes",
                max_length,
                buf.len()
            )));
        }
        if max_length == 0 {
            return Ok(0);
        }

        let result = loop {
            match transport.receive(&mut buf[..max_length]) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };

        match result {
            Ok(0) => {
                debug!(endpoint = %self.endpoint, "peer closed its write side");
                self.eof = true;
                Ok(0)
            }
            Ok(n) => {
                trace!(endpoint = %self.endpoint, max = max_length, read = n, "receive");
                Ok(n)
            }
            Err(e) => Err(self.fail(Operation::Receive, e)),
        }
    }

    /// Keep sending until all of `data` is accepted.
    pub fn send_all(&mut self, data: &[u8]) -> Result<usize> {
        let mut written = 0;
        while written < data.len() {
            let remaining = &data[written..];
            match self.send(remaining, remaining.len())? {
                0 => {
                    let err = io::Error::new(io::ErrorKind::WriteZero, "transport accepted no bytes");
                    return Err(self.fail(Operation::Send, err));
                }
                n => written += n,
            }
        }
        Ok(written)
    }

    /// Release the connection. Closing an already closed handle does nothing.
    pub fn close(&mut self) {
        if self.release() {
            debug!(endpoint = %self.endpoint, "connection closed");
        }
    }

    fn fail(&mut self, op: Operation, source: io::Error) -> Error {
        warn!(endpoint = %self.endpoint, %op, error = %source, "transport failure, closing connection");
        self.release();
        Error::Transport { op, source }
    }

    fn release(&mut self) -> bool {
        match self.transport.take() {
            Some(mut transport) => {
                if let Err(e) = transport.disconnect() {
                    debug!(endpoint = %self.endpoint, error = %e, "disconnect reported an error");
                }
                true
            }
            None => false,
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .field("eof", &self.eof)
            .finish()
    }
}
