//! Protocol-agnostic runtime for PLC drivers.
//!
//! plc4rs keeps track of installed protocol drivers and transports, opens and
//! closes connections through them, and packages read and write batches for a
//! driver's execution loop. Protocol codecs and physical transports plug in
//! from outside.
//!
//! # Crate Structure
//!
//! - [`transport`] - Transport plugin contract and the in-memory loopback transport
//! - [`driver`] - Driver plugin contract, items and values
//! - [`core`] - Registries, connection lifecycle, request builders and callbacks
//!
//! ```
//! use std::sync::Arc;
//!
//! use plc4rs::core::{Callbacks, ConnectRequest, SystemContext};
//! use plc4rs::driver::{AddressParseError, Driver};
//! use plc4rs::transport::LoopbackTransport;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let system = SystemContext::init(Callbacks::new());
//! let driver = Driver::new("modbus", "Modbus", "loopback", |address: &str| {
//!     Ok::<_, AddressParseError>(address.to_string())
//! })?;
//! system.register_driver(driver)?;
//! system.register_transport(Arc::new(LoopbackTransport::new()))?;
//!
//! let request = ConnectRequest::new("modbus://1.2.3.4", "modbus", "", "1.2.3.4:502", "");
//! let connection = system.connect(request).await?;
//! assert_eq!(system.connection_count(), 1);
//!
//! system.disconnect(connection.handle()).await?;
//! assert_eq!(system.connection_count(), 0);
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use plc4rs_transport::*;
}

/// Re-export driver types.
pub mod driver {
    pub use plc4rs_driver::*;
}

/// Re-export registry and lifecycle types.
pub mod core {
    pub use plc4rs_core::*;
}
