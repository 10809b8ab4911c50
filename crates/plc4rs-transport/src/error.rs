/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The device could not be reached with the given connect information.
    #[error("failed to open link to {target}: {reason}")]
    Open { target: String, reason: String },

    /// The link could not be torn down cleanly.
    #[error("failed to close link: {0}")]
    Close(String),

    /// An I/O error occurred on the link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connect information is not understood by this transport.
    #[error("invalid connect information '{info}': {reason}")]
    InvalidConnectInformation { info: String, reason: String },

    /// The link has been closed.
    #[error("link closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
