use std::fmt;
use std::io;

use plc4rs::core::CoreError;
use plc4rs::driver::DriverError;
use plc4rs::transport::TransportError;

// Process exit codes. Stable across releases; scripts depend on them.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn core_error(context: &str, err: CoreError) -> CliError {
    match err {
        CoreError::Transport(err) => transport_error(context, err),
        CoreError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        CoreError::Cancelled => CliError::new(FAILURE, format!("{context}: {err}")),
        CoreError::ConnectionString(_)
        | CoreError::InvalidCode { .. }
        | CoreError::ForeignItem { .. }
        | CoreError::Driver(DriverError::AddressParse { .. }) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        CoreError::Capability(_) => CliError::new(USAGE, format!("{context}: {err}")),
        CoreError::NotFound { .. }
        | CoreError::DuplicateRegistration { .. }
        | CoreError::CapacityExceeded { .. }
        | CoreError::InvalidState { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
