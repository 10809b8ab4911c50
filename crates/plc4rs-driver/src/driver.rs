use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::error::{AddressParseError, DriverError, Result};
use crate::item::Item;

/// Protocol-specific address syntax.
///
/// A parser validates an address string and returns its canonical form.
/// Implemented per protocol; plain closures work too.
pub trait AddressParser: Send + Sync {
    fn parse(&self, address: &str) -> std::result::Result<String, AddressParseError>;
}

impl<F> AddressParser for F
where
    F: Fn(&str) -> std::result::Result<String, AddressParseError> + Send + Sync,
{
    fn parse(&self, address: &str) -> std::result::Result<String, AddressParseError> {
        self(address)
    }
}

static NEXT_DRIVER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Driver`] definition.
///
/// Every [`Driver::new`] call yields a fresh id; clones share it. Two drivers
/// for the same protocol code never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverId(u64);

impl DriverId {
    pub(crate) fn next() -> Self {
        Self(NEXT_DRIVER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "driver-{}", self.0)
    }
}

/// An installed protocol driver. Immutable once constructed.
#[derive(Clone)]
pub struct Driver {
    id: DriverId,
    protocol_code: Arc<str>,
    protocol_name: String,
    default_transport_code: String,
    parser: Arc<dyn AddressParser>,
}

impl Driver {
    /// Describe a driver.
    ///
    /// `protocol_code` and `default_transport_code` must be non-empty and
    /// consist of ASCII alphanumerics, `-` or `_`.
    pub fn new(
        protocol_code: impl Into<String>,
        protocol_name: impl Into<String>,
        default_transport_code: impl Into<String>,
        parser: impl AddressParser + 'static,
    ) -> Result<Self> {
        let protocol_code = protocol_code.into();
        let default_transport_code = default_transport_code.into();
        validate_code("protocol code", &protocol_code)?;
        validate_code("default transport code", &default_transport_code)?;

        Ok(Self {
            id: DriverId::next(),
            protocol_code: Arc::from(protocol_code),
            protocol_name: protocol_name.into(),
            default_transport_code,
            parser: Arc::new(parser),
        })
    }

    pub fn id(&self) -> DriverId {
        self.id
    }

    pub fn protocol_code(&self) -> &str {
        &self.protocol_code
    }

    pub fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    pub fn default_transport_code(&self) -> &str {
        &self.default_transport_code
    }

    /// Turn an address string into an item owned by this driver's protocol.
    pub fn parse_address(&self, address: &str) -> Result<Item> {
        let canonical = self
            .parser
            .parse(address)
            .map_err(|source| DriverError::AddressParse {
                protocol_code: self.protocol_code.to_string(),
                source,
            })?;
        trace!(protocol_code = %self.protocol_code, address, canonical = %canonical, "address parsed");
        Ok(Item::new(self.id, Arc::clone(&self.protocol_code), canonical))
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("id", &self.id)
            .field("protocol_code", &self.protocol_code)
            .field("protocol_name", &self.protocol_name)
            .field("default_transport_code", &self.default_transport_code)
            .finish_non_exhaustive()
    }
}

/// Returns true if `code` is a valid protocol or transport code.
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty()
        && code
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn validate_code(what: &str, code: &str) -> Result<()> {
    if is_valid_code(code) {
        Ok(())
    } else {
        Err(DriverError::InvalidDefinition(format!(
            "{what} '{code}' must be non-empty ASCII alphanumerics, '-' or '_'"
        )))
    }
}
