use std::sync::Arc;

use parking_lot::RwLock;
use plc4rs_driver::Driver;
use plc4rs_transport::Transport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::callbacks::Callbacks;
use crate::config::SystemConfig;
use crate::connection::{Capabilities, ConnectRequest, Connection};
use crate::connection_registry::{ConnectionHandle, ConnectionRegistry};
use crate::connection_string::ConnectionString;
use crate::connector;
use crate::error::{CoreError, RegistryKind, Result};
use crate::registry::{DriverRegistry, TransportRegistry};

/// Outcome of [`SystemContext::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownReport {
    /// Connections closed cleanly.
    pub disconnected: usize,
    /// Connections whose transport refused to close; unregistered anyway.
    pub abandoned: usize,
}

/// Top-level owner of the driver, transport and connection registries.
///
/// All operations take `&self`; share the context behind an `Arc` to use it
/// from several tasks. Registry guards are never held across an await.
pub struct SystemContext {
    pub(crate) config: SystemConfig,
    drivers: RwLock<DriverRegistry>,
    transports: RwLock<TransportRegistry>,
    pub(crate) connections: RwLock<ConnectionRegistry>,
    callbacks: Callbacks,
}

impl SystemContext {
    /// Create a context with default limits.
    pub fn init(callbacks: Callbacks) -> Self {
        Self::with_config(SystemConfig::default(), callbacks)
    }

    pub fn with_config(config: SystemConfig, callbacks: Callbacks) -> Self {
        debug!(?config, "system context initialized");
        Self {
            drivers: RwLock::new(DriverRegistry::with_limit(config.max_drivers)),
            transports: RwLock::new(TransportRegistry::with_limit(config.max_transports)),
            connections: RwLock::new(ConnectionRegistry::with_limit(config.max_connections)),
            config,
            callbacks,
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Install a driver and report the outcome through the driver-load hooks.
    pub fn register_driver(&self, driver: Driver) -> Result<Arc<Driver>> {
        let driver = Arc::new(driver);
        let registered = self.drivers.write().register(Arc::clone(&driver));
        match registered {
            Ok(()) => {
                self.callbacks.driver_loaded(&driver);
                Ok(driver)
            }
            Err(err) => {
                warn!(protocol = driver.protocol_code(), error = %err, "driver load failed");
                self.callbacks.driver_load_failed(driver.protocol_code(), &err);
                Err(err)
            }
        }
    }

    /// Remove a driver. Live connections keep using their copy.
    pub fn unregister_driver(&self, protocol_code: &str) -> Option<Arc<Driver>> {
        self.drivers.write().unregister(protocol_code)
    }

    pub fn driver(&self, protocol_code: &str) -> Option<Arc<Driver>> {
        self.drivers.read().lookup(protocol_code).cloned()
    }

    /// Installed protocol codes, most recently registered first.
    pub fn drivers(&self) -> Vec<String> {
        owned(self.drivers.read().codes())
    }

    /// Install a transport. Its code follows the same rules as protocol codes.
    pub fn register_transport(&self, transport: Arc<dyn Transport>) -> Result<()> {
        let registered = self.transports.write().register(Arc::clone(&transport));
        if let Err(err) = &registered {
            warn!(transport = transport.transport_code(), error = %err, "transport registration failed");
        }
        registered
    }

    /// Remove a transport. Open links stay usable until disconnected.
    pub fn unregister_transport(&self, transport_code: &str) -> Option<Arc<dyn Transport>> {
        self.transports.write().unregister(transport_code)
    }

    pub fn transport(&self, transport_code: &str) -> Option<Arc<dyn Transport>> {
        self.transports.read().lookup(transport_code).cloned()
    }

    /// Installed transport codes, most recently registered first.
    pub fn transports(&self) -> Vec<String> {
        owned(self.transports.read().codes())
    }

    /// Open a connection. See [`connect_with_cancel`](Self::connect_with_cancel).
    pub async fn connect(&self, request: ConnectRequest) -> Result<Arc<Connection>> {
        self.connect_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Open a connection.
    ///
    /// Exactly one of the connect hooks fires per call. On failure nothing is
    /// registered. Cancelling `cancel` or exceeding the configured connect
    /// timeout aborts the transport handshake.
    pub async fn connect_with_cancel(
        &self,
        request: ConnectRequest,
        cancel: &CancellationToken,
    ) -> Result<Arc<Connection>> {
        let connection_string = request.connection_string.clone();
        match connector::establish(self, request, cancel).await {
            Ok(connection) => {
                self.callbacks.connected(&connection);
                Ok(connection)
            }
            Err(err) => {
                self.callbacks.connect_failed(&connection_string, &err);
                Err(err)
            }
        }
    }

    /// Parse a connection string and connect.
    ///
    /// A string without a transport code uses the driver's default transport.
    /// The transport address doubles as transport connect information.
    pub async fn connect_str(
        &self,
        connection_string: &str,
        capabilities: Capabilities,
        cancel: &CancellationToken,
    ) -> Result<Arc<Connection>> {
        let parsed = match ConnectionString::parse(connection_string) {
            Ok(parsed) => parsed,
            Err(err) => {
                let err = CoreError::from(err);
                self.callbacks.connect_failed(connection_string, &err);
                return Err(err);
            }
        };
        let request = ConnectRequest::new(
            connection_string,
            parsed.protocol_code(),
            parsed.transport_code().unwrap_or_default(),
            parsed.transport_address(),
            parsed.parameters(),
        )
        .with_capabilities(capabilities);
        self.connect_with_cancel(request, cancel).await
    }

    /// Close a connection. See [`disconnect_with_cancel`](Self::disconnect_with_cancel).
    pub async fn disconnect(&self, handle: ConnectionHandle) -> Result<()> {
        self.disconnect_with_cancel(handle, &CancellationToken::new())
            .await
    }

    /// Close a connection and remove it from the registry.
    ///
    /// Unknown handles fail with `NotFound` and fire no hook, as does losing
    /// a race against a concurrent disconnect of the same handle. Pending
    /// `send`/`receive` calls on the connection are interrupted. If the
    /// transport fails to close, or `cancel` fires first, the connection stays
    /// registered and connected, and the disconnect-failure hook fires.
    pub async fn disconnect_with_cancel(
        &self,
        handle: ConnectionHandle,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let Some(connection) = self.connection(handle) else {
            return Err(CoreError::not_found(RegistryKind::Connection, handle));
        };
        match connector::teardown(self, &connection, cancel).await {
            Ok(()) => {
                self.callbacks.disconnected(&connection);
                Ok(())
            }
            Err(err @ CoreError::NotFound { .. }) => {
                debug!(%handle, "connection closed by a concurrent disconnect");
                Err(err)
            }
            Err(err) => {
                self.callbacks.disconnect_failed(&connection, &err);
                Err(err)
            }
        }
    }

    pub fn connection(&self, handle: ConnectionHandle) -> Option<Arc<Connection>> {
        self.connections.read().get(handle).cloned()
    }

    /// Live connections, most recently connected first.
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.connections
            .read()
            .iter()
            .map(|(_, connection)| Arc::clone(connection))
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Forward a failure of a driver's I/O loop to the loop-failure hook.
    pub fn report_loop_failure(&self, reason: &str) {
        warn!(reason, "loop failure");
        self.callbacks.loop_failed(reason);
    }

    /// Disconnect every live connection, then clear the registries.
    ///
    /// Connections are closed in registry order. One whose transport refuses
    /// to close is unregistered anyway and its link dropped, so no session
    /// outlives the shutdown.
    pub async fn shutdown(&self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        let handles = self.connections.read().handles();
        for handle in handles {
            let Some(connection) = self.connection(handle) else {
                continue;
            };
            match self.disconnect(handle).await {
                Ok(()) => report.disconnected += 1,
                Err(CoreError::NotFound { .. }) => {}
                Err(_) => {
                    if connector::abandon(self, &connection).await {
                        report.abandoned += 1;
                    }
                }
            }
        }

        self.transports.write().clear();
        self.drivers.write().clear();
        info!(
            disconnected = report.disconnected,
            abandoned = report.abandoned,
            "system context shut down"
        );
        report
    }
}

impl Default for SystemContext {
    fn default() -> Self {
        Self::init(Callbacks::default())
    }
}

impl std::fmt::Debug for SystemContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemContext")
            .field("config", &self.config)
            .field("drivers", &self.drivers())
            .field("transports", &self.transports())
            .field("connections", &self.connection_count())
            .finish_non_exhaustive()
    }
}

fn owned(codes: Vec<&str>) -> Vec<String> {
    codes.into_iter().map(str::to_string).collect()
}
