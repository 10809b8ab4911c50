//! Transport plugin contract for plc4rs.
//!
//! A transport moves raw bytes between this process and a field device over
//! some physical or network medium. Transports are registered once per
//! transport code and open one [`TransportLink`] per connection:
//! - [`Transport`] is the registered factory (`open`)
//! - [`TransportLink`] is the live session (`send`, `receive`, `close`)
//!
//! This is the lowest layer of plc4rs. Concrete network and serial transports
//! live outside this workspace; [`LoopbackTransport`] is the in-process
//! implementation used for testing and self-checks.

pub mod error;
pub mod loopback;
pub mod traits;

pub use error::{Result, TransportError};
pub use loopback::{LoopbackConfig, LoopbackLink, LoopbackTransport, LOOPBACK};
pub use traits::{Transport, TransportLink};
