//! Driver plugin contract for plc4rs.
//!
//! A driver teaches the runtime one industrial protocol. Within this crate
//! that means exactly one thing: turning a protocol-specific address string
//! into an opaque [`Item`] that read and write requests can refer to.
//!
//! Frame encoding and decoding live in the protocol crates themselves.

pub mod driver;
pub mod error;
pub mod item;
pub mod value;

pub use driver::{is_valid_code, AddressParser, Driver, DriverId};
pub use error::{AddressParseError, DriverError, Result};
pub use item::{Item, ItemId};
pub use value::{ByteOrder, PlcValue};
