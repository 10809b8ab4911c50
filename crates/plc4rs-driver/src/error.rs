/// A driver rejected an address string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address '{address}': {reason}")]
pub struct AddressParseError {
    /// The address as supplied by the caller.
    pub address: String,
    /// Driver-specific explanation.
    pub reason: String,
}

impl AddressParseError {
    pub fn new(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur in driver operations.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The driver's address parser rejected the address.
    #[error("address parse failed for protocol '{protocol_code}': {source}")]
    AddressParse {
        protocol_code: String,
        source: AddressParseError,
    },

    /// A driver was described with an empty or malformed code.
    #[error("invalid driver definition: {0}")]
    InvalidDefinition(String),
}

pub type Result<T> = std::result::Result<T, DriverError>;
