use std::fmt;
use std::time::Duration;

use crate::connection::ConnectionState;
use crate::connection_registry::ConnectionHandle;
use crate::connection_string::ConnectionStringError;
use crate::request::CapabilityError;

/// Which registry an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Driver,
    Transport,
    Connection,
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegistryKind::Driver => "driver",
            RegistryKind::Transport => "transport",
            RegistryKind::Connection => "connection",
        })
    }
}

/// Errors that can occur in registry and connection operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A driver or transport with this code is already installed.
    #[error("{kind} '{code}' is already registered")]
    DuplicateRegistration { kind: RegistryKind, code: String },

    /// The code is empty or contains characters other than ASCII
    /// alphanumerics, `-` or `_`.
    #[error("{kind} code '{code}' is invalid")]
    InvalidCode { kind: RegistryKind, code: String },

    /// The registry reached its configured size limit.
    #[error("{kind} registry is full ({max} entries)")]
    CapacityExceeded { kind: RegistryKind, max: usize },

    /// Growing a registry failed to allocate.
    #[error("allocation failed while growing {0} registry")]
    AllocationFailed(RegistryKind),

    /// No driver, transport or live connection matches.
    #[error("{kind} '{key}' not found")]
    NotFound { kind: RegistryKind, key: String },

    /// Driver-level failure, including rejected addresses.
    #[error(transparent)]
    Driver(#[from] plc4rs_driver::DriverError),

    /// The connection does not permit the requested operation.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// An item was minted by a driver other than the connection's own.
    #[error("item '{address}' was not parsed by this connection's driver (item protocol '{item_protocol}', connection protocol '{connection_protocol}')")]
    ForeignItem {
        address: String,
        item_protocol: String,
        connection_protocol: String,
    },

    /// The lifecycle transition is not allowed from the current state.
    #[error("connection {handle} is {state}")]
    InvalidState {
        handle: ConnectionHandle,
        state: ConnectionState,
    },

    /// The connection string is malformed.
    #[error(transparent)]
    ConnectionString(#[from] ConnectionStringError),

    /// Delegated transport I/O failed.
    #[error("transport failure: {0}")]
    Transport(#[from] plc4rs_transport::TransportError),

    /// Delegated transport I/O did not complete in time.
    #[error("transport operation timed out after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl CoreError {
    /// True for failures of delegated transport work.
    ///
    /// After such a failure the connection is left in its pre-operation state.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            CoreError::Transport(_) | CoreError::Timeout(_) | CoreError::Cancelled
        )
    }

    /// True when a driver rejected an address.
    pub fn is_address_parse(&self) -> bool {
        matches!(
            self,
            CoreError::Driver(plc4rs_driver::DriverError::AddressParse { .. })
        )
    }

    pub(crate) fn not_found(kind: RegistryKind, key: impl fmt::Display) -> Self {
        CoreError::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
