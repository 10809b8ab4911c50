use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use plc4rs_driver::{Driver, Item};
use plc4rs_transport::TransportLink;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::connection_registry::ConnectionHandle;
use crate::error::{CoreError, Result};

/// Lifecycle state of a connection.
///
/// ```text
/// Pending -> Connecting -> Connected -> Disconnecting -> Closed
///                 |            ^              |
///                 v            +--------------+ (teardown failed)
///               Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Pending,
    Connecting,
    Connected,
    Disconnecting,
    Closed,
    Failed,
}

impl ConnectionState {
    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Pending, Connecting)
                | (Connecting, Connected)
                | (Connecting, Failed)
                | (Connected, Disconnecting)
                | (Disconnecting, Closed)
                | (Disconnecting, Connected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Pending => "pending",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations a connection permits. Declared by the caller at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub reading: bool,
    pub writing: bool,
    pub subscriptions: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            reading: true,
            writing: true,
            subscriptions: true,
        }
    }

    pub fn read_only() -> Self {
        Self {
            reading: true,
            ..Self::default()
        }
    }
}

/// Parameters of a connect call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub connection_string: String,
    pub protocol_code: String,
    /// Empty selects the driver's default transport.
    pub transport_code: String,
    pub transport_connect_information: String,
    pub parameters: String,
    pub capabilities: Capabilities,
}

impl ConnectRequest {
    /// Describe a connection with every capability enabled.
    pub fn new(
        connection_string: impl Into<String>,
        protocol_code: impl Into<String>,
        transport_code: impl Into<String>,
        transport_connect_information: impl Into<String>,
        parameters: impl Into<String>,
    ) -> Self {
        Self {
            connection_string: connection_string.into(),
            protocol_code: protocol_code.into(),
            transport_code: transport_code.into(),
            transport_connect_information: transport_connect_information.into(),
            parameters: parameters.into(),
            capabilities: Capabilities::all(),
        }
    }

    /// Override declared capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// A live session binding one driver and one transport link.
///
/// Connections exist only while registered; `disconnect` is the single way out.
/// Lifecycle transitions and link I/O are serialized per connection.
pub struct Connection {
    handle: ConnectionHandle,
    connection_string: String,
    protocol_code: String,
    transport_code: String,
    transport_connect_information: String,
    parameters: String,
    driver: Arc<Driver>,
    capabilities: Capabilities,
    state: Mutex<ConnectionState>,
    link: tokio::sync::Mutex<Option<Box<dyn TransportLink>>>,
    /// Fired by a teardown to evict in-flight link I/O from the lock.
    interrupt: Mutex<CancellationToken>,
    io_timeout: Duration,
}

impl Connection {
    /// Build a connected session. `request.transport_code` must already be resolved.
    pub(crate) fn new(
        handle: ConnectionHandle,
        request: ConnectRequest,
        driver: Arc<Driver>,
        link: Box<dyn TransportLink>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            handle,
            connection_string: request.connection_string,
            protocol_code: request.protocol_code,
            transport_code: request.transport_code,
            transport_connect_information: request.transport_connect_information,
            parameters: request.parameters,
            driver,
            capabilities: request.capabilities,
            state: Mutex::new(ConnectionState::Connected),
            link: tokio::sync::Mutex::new(Some(link)),
            interrupt: Mutex::new(CancellationToken::new()),
            io_timeout,
        }
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn protocol_code(&self) -> &str {
        &self.protocol_code
    }

    /// Resolved transport code (the driver default when none was requested).
    pub fn transport_code(&self) -> &str {
        &self.transport_code
    }

    pub fn transport_connect_information(&self) -> &str {
        &self.transport_connect_information
    }

    pub fn parameters(&self) -> &str {
        &self.parameters
    }

    pub fn driver(&self) -> &Arc<Driver> {
        &self.driver
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn supports_reading(&self) -> bool {
        self.capabilities.reading
    }

    pub fn supports_writing(&self) -> bool {
        self.capabilities.writing
    }

    pub fn supports_subscriptions(&self) -> bool {
        self.capabilities.subscriptions
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Parse an address with this connection's driver.
    pub fn parse_address(&self, address: &str) -> Result<Item> {
        Ok(self.driver.parse_address(address)?)
    }

    /// Transmit bytes over the transport link.
    ///
    /// Bounded by the configured I/O timeout. A concurrent `disconnect`
    /// interrupts the call with `Cancelled`.
    pub async fn send(&self, data: Bytes, cancel: &CancellationToken) -> Result<()> {
        let io = async {
            let mut guard = self.link.lock().await;
            let link = self.live_link(&mut guard)?;
            trace!(handle = %self.handle, bytes = data.len(), "send");
            link.send(data).await.map_err(CoreError::from)
        };
        self.interruptible(cancel, io).await
    }

    /// Receive the next chunk from the transport link.
    ///
    /// Holds the connection's lifecycle lock while waiting. The wait ends when
    /// data arrives, `cancel` fires, the I/O timeout elapses or a `disconnect`
    /// interrupts it.
    pub async fn receive(&self, cancel: &CancellationToken) -> Result<Bytes> {
        let io = async {
            let mut guard = self.link.lock().await;
            let link = self.live_link(&mut guard)?;
            link.receive().await.map_err(CoreError::from)
        };
        let data = self.interruptible(cancel, io).await?;
        trace!(handle = %self.handle, bytes = data.len(), "receive");
        Ok(data)
    }

    async fn interruptible<T, F>(&self, cancel: &CancellationToken, io: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let interrupt = self.interrupt.lock().clone();
        tokio::select! {
            biased;
            _ = interrupt.cancelled() => Err(CoreError::Cancelled),
            outcome = within(self.io_timeout, cancel, io) => outcome?,
        }
    }

    /// Evict in-flight link I/O so a teardown can take the lock.
    pub(crate) fn interrupt_io(&self) {
        self.interrupt.lock().cancel();
    }

    /// Let link I/O run again once a teardown is over.
    pub(crate) fn resume_io(&self) {
        let mut interrupt = self.interrupt.lock();
        if interrupt.is_cancelled() {
            *interrupt = CancellationToken::new();
        }
    }

    /// Lock the link for a lifecycle transition.
    pub(crate) async fn lock_link(
        &self,
    ) -> tokio::sync::MutexGuard<'_, Option<Box<dyn TransportLink>>> {
        self.link.lock().await
    }

    /// Move along a lifecycle edge.
    pub(crate) fn transition(&self, next: ConnectionState) -> Result<()> {
        let mut state = self.state.lock();
        if !state.can_transition_to(next) {
            return Err(CoreError::InvalidState {
                handle: self.handle,
                state: *state,
            });
        }
        let current = *state;
        trace!(handle = %self.handle, from = %current, to = %next, "transition");
        *state = next;
        Ok(())
    }

    /// The link of a connected session, or `InvalidState`.
    pub(crate) fn live_link<'a>(
        &self,
        guard: &'a mut Option<Box<dyn TransportLink>>,
    ) -> Result<&'a mut Box<dyn TransportLink>> {
        let state = self.state();
        match guard.as_mut() {
            Some(link) if state == ConnectionState::Connected => Ok(link),
            _ => Err(CoreError::InvalidState {
                handle: self.handle,
                state,
            }),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("handle", &self.handle)
            .field("connection_string", &self.connection_string)
            .field("protocol_code", &self.protocol_code)
            .field("transport_code", &self.transport_code)
            .field("capabilities", &self.capabilities)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Await `work` for at most `limit`, giving up early on cancellation.
pub(crate) async fn within<F: Future>(
    limit: Duration,
    cancel: &CancellationToken,
    work: F,
) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CoreError::Cancelled),
        outcome = tokio::time::timeout(limit, work) => outcome.map_err(|_| CoreError::Timeout(limit)),
    }
}

/// Run delegated transport work bounded by `limit` and `cancel`.
pub(crate) async fn bounded<T, F>(limit: Duration, cancel: &CancellationToken, work: F) -> Result<T>
where
    F: Future<Output = plc4rs_transport::Result<T>>,
{
    within(limit, cancel, work).await?.map_err(CoreError::from)
}
