//! Driver and transport registries plus the connection lifecycle.
//!
//! A [`SystemContext`] owns three registries: installed drivers keyed by
//! protocol code, installed transports keyed by transport code, and live
//! connections. `connect` resolves a driver and a transport, opens a link and
//! registers the session; `disconnect` closes the link and unregisters it.
//! Read and write batches are packaged against a live connection with
//! [`build_read_request`] and [`build_write_request`].

pub mod callbacks;
pub mod config;
pub mod connection;
pub mod connection_registry;
pub mod connection_string;
mod connector;
pub mod error;
pub mod registry;
pub mod request;
pub mod system;

#[cfg(test)]
mod test_support;

pub use callbacks::Callbacks;
pub use config::SystemConfig;
pub use connection::{Capabilities, ConnectRequest, Connection, ConnectionState};
pub use connection_registry::{ConnectionHandle, ConnectionRegistry, VacantEntry};
pub use connection_string::{address_component, ConnectionString, ConnectionStringError};
pub use error::{CoreError, RegistryKind, Result};
pub use registry::{CodeRegistry, DriverRegistry, Registered, TransportRegistry};
pub use request::{
    build_read_request, build_write_request, CapabilityError, ReadRequest, WriteItem,
    WriteRequest,
};
pub use system::{ShutdownReport, SystemContext};
