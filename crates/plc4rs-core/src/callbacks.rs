use std::fmt;
use std::sync::Arc;

use plc4rs_driver::Driver;

use crate::connection::Connection;
use crate::error::CoreError;

type DriverHook = Box<dyn Fn(&Driver) + Send + Sync>;
type CodeFailureHook = Box<dyn Fn(&str, &CoreError) + Send + Sync>;
type ConnectedHook = Box<dyn Fn(&Arc<Connection>) + Send + Sync>;
type ConnectionHook = Box<dyn Fn(&Connection) + Send + Sync>;
type ConnectionFailureHook = Box<dyn Fn(&Connection, &CoreError) + Send + Sync>;
type ReasonHook = Box<dyn Fn(&str) + Send + Sync>;

/// Lifecycle notifications of a [`SystemContext`](crate::SystemContext).
///
/// Every hook is optional; events without a hook are dropped. Hooks run
/// synchronously on the task that caused the event and must not block.
///
/// ```
/// use plc4rs_core::Callbacks;
///
/// let callbacks = Callbacks::new()
///     .on_connect_success(|conn| println!("connected {}", conn.handle()))
///     .on_connect_failure(|cs, err| eprintln!("{cs}: {err}"));
/// # drop(callbacks);
/// ```
#[derive(Default)]
pub struct Callbacks {
    driver_load_success: Option<DriverHook>,
    driver_load_failure: Option<CodeFailureHook>,
    connect_success: Option<ConnectedHook>,
    connect_failure: Option<CodeFailureHook>,
    disconnect_success: Option<ConnectionHook>,
    disconnect_failure: Option<ConnectionFailureHook>,
    loop_failure: Option<ReasonHook>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_driver_load_success(mut self, hook: impl Fn(&Driver) + Send + Sync + 'static) -> Self {
        self.driver_load_success = Some(Box::new(hook));
        self
    }

    /// Receives the protocol code of the rejected driver.
    #[must_use]
    pub fn on_driver_load_failure(
        mut self,
        hook: impl Fn(&str, &CoreError) + Send + Sync + 'static,
    ) -> Self {
        self.driver_load_failure = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_connect_success(
        mut self,
        hook: impl Fn(&Arc<Connection>) + Send + Sync + 'static,
    ) -> Self {
        self.connect_success = Some(Box::new(hook));
        self
    }

    /// Receives the connection string of the failed attempt.
    #[must_use]
    pub fn on_connect_failure(
        mut self,
        hook: impl Fn(&str, &CoreError) + Send + Sync + 'static,
    ) -> Self {
        self.connect_failure = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_disconnect_success(
        mut self,
        hook: impl Fn(&Connection) + Send + Sync + 'static,
    ) -> Self {
        self.disconnect_success = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_disconnect_failure(
        mut self,
        hook: impl Fn(&Connection, &CoreError) + Send + Sync + 'static,
    ) -> Self {
        self.disconnect_failure = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_loop_failure(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.loop_failure = Some(Box::new(hook));
        self
    }

    pub(crate) fn driver_loaded(&self, driver: &Driver) {
        if let Some(hook) = &self.driver_load_success {
            hook(driver);
        }
    }

    pub(crate) fn driver_load_failed(&self, protocol_code: &str, err: &CoreError) {
        if let Some(hook) = &self.driver_load_failure {
            hook(protocol_code, err);
        }
    }

    pub(crate) fn connected(&self, connection: &Arc<Connection>) {
        if let Some(hook) = &self.connect_success {
            hook(connection);
        }
    }

    pub(crate) fn connect_failed(&self, connection_string: &str, err: &CoreError) {
        if let Some(hook) = &self.connect_failure {
            hook(connection_string, err);
        }
    }

    pub(crate) fn disconnected(&self, connection: &Connection) {
        if let Some(hook) = &self.disconnect_success {
            hook(connection);
        }
    }

    pub(crate) fn disconnect_failed(&self, connection: &Connection, err: &CoreError) {
        if let Some(hook) = &self.disconnect_failure {
            hook(connection, err);
        }
    }

    pub(crate) fn loop_failed(&self, reason: &str) {
        if let Some(hook) = &self.loop_failure {
            hook(reason);
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("driver_load_success", &self.driver_load_success.is_some())
            .field("driver_load_failure", &self.driver_load_failure.is_some())
            .field("connect_success", &self.connect_success.is_some())
            .field("connect_failure", &self.connect_failure.is_some())
            .field("disconnect_success", &self.disconnect_success.is_some())
            .field("disconnect_failure", &self.disconnect_failure.is_some())
            .field("loop_failure", &self.loop_failure.is_some())
            .finish()
    }
}
