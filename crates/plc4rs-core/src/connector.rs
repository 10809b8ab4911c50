use std::sync::Arc;

use plc4rs_transport::TransportLink;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::{bounded, within, ConnectRequest, Connection, ConnectionState};
use crate::connection_string::address_component;
use crate::error::{CoreError, RegistryKind, Result};
use crate::system::SystemContext;

/// Progress of one connect attempt before it owns a registry slot.
struct Attempt {
    connection_string: String,
    state: ConnectionState,
}

impl Attempt {
    fn start(connection_string: &str) -> Self {
        let mut attempt = Self {
            connection_string: connection_string.to_string(),
            state: ConnectionState::Pending,
        };
        attempt.advance(ConnectionState::Connecting);
        attempt
    }

    fn advance(&mut self, next: ConnectionState) {
        debug_assert!(self.state.can_transition_to(next));
        debug!(
            connection_string = %self.connection_string,
            from = %self.state,
            to = %next,
            "connect attempt"
        );
        self.state = next;
    }

    fn fail(mut self, err: CoreError) -> CoreError {
        self.advance(ConnectionState::Failed);
        warn!(connection_string = %self.connection_string, error = %err, "connect failed");
        err
    }
}

/// Resolve driver and transport, open a link and register the session.
///
/// On any failure nothing is registered and no link stays open.
pub(crate) async fn establish(
    system: &SystemContext,
    mut request: ConnectRequest,
    cancel: &CancellationToken,
) -> Result<Arc<Connection>> {
    let attempt = Attempt::start(&request.connection_string);

    let Some(driver) = system.driver(&request.protocol_code) else {
        return Err(attempt.fail(CoreError::not_found(
            RegistryKind::Driver,
            &request.protocol_code,
        )));
    };

    if request.transport_code.is_empty() {
        request.transport_code = driver.default_transport_code().to_string();
    }
    let Some(transport) = system.transport(&request.transport_code) else {
        return Err(attempt.fail(CoreError::not_found(
            RegistryKind::Transport,
            &request.transport_code,
        )));
    };

    if let Err(err) = driver.parse_address(address_component(&request.connection_string)) {
        return Err(attempt.fail(err.into()));
    }

    // Skip the handshake when there is no room for the result.
    {
        let connections = system.connections.read();
        if connections.len() >= system.config.max_connections {
            return Err(attempt.fail(CoreError::CapacityExceeded {
                kind: RegistryKind::Connection,
                max: system.config.max_connections,
            }));
        }
    }

    let opened = bounded(
        system.config.connect_timeout,
        cancel,
        transport.open(&request.transport_connect_information),
    )
    .await;
    let link = match opened {
        Ok(link) => link,
        Err(err) => return Err(attempt.fail(err)),
    };

    let linked = {
        let mut connections = system.connections.write();
        match connections.vacant_entry() {
            Ok(entry) => {
                let connection = Arc::new(Connection::new(
                    entry.handle(),
                    request,
                    driver,
                    link,
                    system.config.io_timeout,
                ));
                entry.insert(Arc::clone(&connection));
                Ok(connection)
            }
            Err(err) => Err((err, link)),
        }
    };

    match linked {
        Ok(connection) => {
            let mut attempt = attempt;
            attempt.advance(ConnectionState::Connected);
            info!(
                handle = %connection.handle(),
                protocol = connection.protocol_code(),
                transport = connection.transport_code(),
                "connected"
            );
            Ok(connection)
        }
        Err((err, link)) => {
            release(link).await;
            Err(attempt.fail(err))
        }
    }
}

/// Close the link and unregister the session.
///
/// In-flight link I/O is interrupted first. Waiting for the lock and closing
/// the link are both bounded by the disconnect timeout and `cancel`. A failed
/// close leaves the connection registered and connected. A session that a
/// concurrent teardown already closed is reported as `NotFound`.
pub(crate) async fn teardown(
    system: &SystemContext,
    connection: &Connection,
    cancel: &CancellationToken,
) -> Result<()> {
    connection.interrupt_io();
    let outcome = close_and_unlink(system, connection, cancel).await;
    connection.resume_io();
    match &outcome {
        Err(CoreError::NotFound { .. }) | Ok(()) => {}
        Err(err) => warn!(handle = %connection.handle(), error = %err, "disconnect failed"),
    }
    outcome
}

async fn close_and_unlink(
    system: &SystemContext,
    connection: &Connection,
    cancel: &CancellationToken,
) -> Result<()> {
    let limit = system.config.disconnect_timeout;
    let mut guard = within(limit, cancel, connection.lock_link()).await?;
    if connection.state() == ConnectionState::Closed {
        return Err(CoreError::not_found(
            RegistryKind::Connection,
            connection.handle(),
        ));
    }
    connection.transition(ConnectionState::Disconnecting)?;

    let closed = match guard.as_mut() {
        Some(link) => bounded(limit, cancel, link.close()).await,
        None => Ok(()),
    };

    match closed {
        Ok(()) => {
            guard.take();
            system.connections.write().remove(connection.handle());
            connection.transition(ConnectionState::Closed)?;
            info!(handle = %connection.handle(), "disconnected");
            Ok(())
        }
        Err(err) => {
            connection.transition(ConnectionState::Connected)?;
            Err(err)
        }
    }
}

/// Unregister a session whose transport refused to close, dropping its link.
///
/// Returns whether this call unlinked the session. If the lifecycle lock
/// cannot be taken within the disconnect timeout, the session is unlinked
/// without it and its link is dropped by whoever releases the lock last.
pub(crate) async fn abandon(system: &SystemContext, connection: &Connection) -> bool {
    connection.interrupt_io();
    let locked =
        tokio::time::timeout(system.config.disconnect_timeout, connection.lock_link()).await;
    let unlinked = match locked {
        Ok(mut guard) => {
            if connection.transition(ConnectionState::Disconnecting).is_ok() {
                guard.take();
                let unlinked = system.connections.write().remove(connection.handle()).is_some();
                // Disconnecting -> Closed is always allowed.
                let _ = connection.transition(ConnectionState::Closed);
                unlinked
            } else {
                false
            }
        }
        Err(_) => system.connections.write().remove(connection.handle()).is_some(),
    };
    connection.resume_io();
    if unlinked {
        warn!(handle = %connection.handle(), "connection abandoned");
    }
    unlinked
}

async fn release(mut link: Box<dyn TransportLink>) {
    if let Err(err) = link.close().await {
        debug!(error = %err, "closing unused link failed");
    }
}
