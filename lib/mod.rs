// lib: tether transport client - one blocking stream connection per handle
//
// Typical session (mirrors a C driver doing connect/send/recv on one socket):
//
//     let client = TransportClient::new(ClientConfig::new("127.0.0.1:4444".parse()?));
//     let mut conn = client.connect()?;
//     conn.send(b"hello", 5)?;
//     let n = conn.receive(&mut buf, 5)?;

// Re-export configuration and endpoint types
pub use tether_core::*;

// Re-export transport abstractions
pub use tether_transport::{Transport, TransportListener};

pub mod error;
pub mod connection;
pub mod client;
pub mod handles;

pub use error::{Error, ErrorKind, Operation, Result};
pub use connection::Connection;
pub use client::TransportClient;
pub use handles::{Handle, HandleTable, BASE_HANDLE, DEFAULT_HANDLE_CAPACITY};
