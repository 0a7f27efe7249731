// Transport abstraction - allows pluggable stream backends
use std::io::Result;

/// A blocking byte stream to one remote peer.
///
/// `send` and `receive` have `Write::write` / `Read::read` semantics: they may
/// transfer fewer bytes than offered, and `receive` returning `Ok(0)` for a
/// non-empty buffer means the peer closed its write side.
pub trait Transport: Send {
    fn send(&mut self, data: &[u8]) -> Result<usize>;
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn connect(&mut self) -> Result<()>;
    fn disconnect(&mut self) -> Result<()>;
    fn is_connected(&self) -> bool;
}

pub trait TransportListener: Send {
    type Connection: Transport;

    fn bind(&mut self) -> Result<()>;
    fn accept(&mut self) -> Result<Self::Connection>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, data: &[u8]) -> Result<usize> {
        (**self).send(data)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).receive(buf)
    }

    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

pub(crate) fn not_connected() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::NotConnected, "Not connected")
}

pub(crate) fn not_bound() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::NotConnected, "Listener not bound")
}
