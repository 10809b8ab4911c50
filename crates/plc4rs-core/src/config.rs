use std::time::Duration;

/// Limits and timeouts for a [`SystemContext`](crate::SystemContext).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemConfig {
    /// Maximum number of installed drivers.
    pub max_drivers: usize,
    /// Maximum number of installed transports.
    pub max_transports: usize,
    /// Maximum number of live connections.
    pub max_connections: usize,
    /// Upper bound for a transport handshake during `connect`.
    pub connect_timeout: Duration,
    /// Upper bound for a transport teardown during `disconnect`.
    pub disconnect_timeout: Duration,
    /// Upper bound for a single `send` or `receive` on a live connection.
    pub io_timeout: Duration,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            max_drivers: 64,
            max_transports: 64,
            max_connections: 1024,
            connect_timeout: Duration::from_secs(10),
            disconnect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(30),
        }
    }
}
