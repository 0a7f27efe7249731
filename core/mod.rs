// Core module: endpoint, lifecycle and configuration types (NO I/O dependencies)
pub mod types;
pub mod config;

pub use types::*;
pub use config::*;
