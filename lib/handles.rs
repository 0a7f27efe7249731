// Integer handle surface over Connection, for drivers that pass plain descriptors around
use std::fmt;
use std::io;

use tether_core::ConnectionState;
use tracing::debug;

use crate::client::TransportClient;
use crate::connection::Connection;
use crate::error::{Error, Result};

// Handles start well above the descriptors a process usually holds (stdio, logs)
pub const BASE_HANDLE: i32 = 1000;
pub const DEFAULT_HANDLE_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(i32);

impl Handle {
    pub fn from_raw(raw: i32) -> Self {
        Handle(raw)
    }

    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Table of connections addressed by integer handle.
///
/// Handles are never reissued: a closed connection stays in its slot so a
/// stale handle keeps failing with `ConnectionClosed` instead of reaching a
/// newer connection. Capacity therefore bounds the total number of connects.
pub struct HandleTable {
    client: TransportClient,
    base: i32,
    capacity: usize,
    slots: Vec<Connection>,
}

impl HandleTable {
    pub fn new(client: TransportClient) -> Self {
        Self::with_limits(client, BASE_HANDLE, DEFAULT_HANDLE_CAPACITY)
    }

    pub fn with_limits(client: TransportClient, base: i32, capacity: usize) -> Self {
        HandleTable {
            client,
            base,
            capacity,
            slots: Vec::new(),
        }
    }

    pub fn client(&self) -> &TransportClient {
        &self.client
    }

    /// Number of handles issued so far, open or closed.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|c| c.is_connected()).count()
    }

    pub fn connect(&mut self) -> Result<Handle> {
        let index = self.slots.len();
        if index >= self.capacity {
            return Err(self.exhausted(format!("handle table exhausted ({} handles)", self.capacity)));
        }
        // Reject an unrepresentable id before any socket is opened
        let handle = match i32::try_from(index).ok().and_then(|i| self.base.checked_add(i)) {
            Some(raw) => Handle(raw),
            None => return Err(self.exhausted(format!("handle id {} + {} overflows", self.base, index))),
        };

        let conn = self.client.connect()?;
        self.slots.push(conn);
        debug!(%handle, endpoint = %self.client.endpoint(), "handle issued");
        Ok(handle)
    }

    pub fn send(&mut self, handle: Handle, data: &[u8], length: usize) -> Result<usize> {
        self.get_mut(handle)?.send(data, length)
    }

    pub fn receive(&mut self, handle: Handle, buf: &mut [u8], max_length: usize) -> Result<usize> {
        self.get_mut(handle)?.receive(buf, max_length)
    }

    /// Close `handle`. Closing a closed handle is a no-op.
    pub fn close(&mut self, handle: Handle) -> Result<()> {
        self.get_mut(handle)?.close();
        Ok(())
    }

    pub fn state(&self, handle: Handle) -> Option<ConnectionState> {
        self.index(handle).map(|i| self.slots[i].state())
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Connection> {
        match self.index(handle) {
            Some(i) => Ok(&mut self.slots[i]),
            None => Err(Error::invalid_argument(format!("unknown handle {}", handle))),
        }
    }

    fn exhausted(&self, reason: String) -> Error {
        Error::Connection {
            endpoint: self.client.endpoint().clone(),
            source: io::Error::new(io::ErrorKind::Other, reason),
        }
    }

    fn index(&self, handle: Handle) -> Option<usize> {
        let offset = handle.0.checked_sub(self.base)?;
        let index = usize::try_from(offset).ok()?;
        (index < self.slots.len()).then_some(index)
    }
}

impl fmt::Debug for HandleTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HandleTable")
            .field("endpoint", self.client.endpoint())
            .field("base", &self.base)
            .field("capacity", &self.capacity)
            .field("issued", &self.slots.len())
            .finish()
    }
}
