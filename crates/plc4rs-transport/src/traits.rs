use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// A registered transport plugin.
///
/// One instance is installed per transport code. It acts as a factory: every
/// connection that names this transport gets its own [`TransportLink`] from
/// [`Transport::open`]. Implementations must not block the calling task; any
/// slow I/O belongs inside the returned future.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Unique transport code, e.g. `tcp` or `serial`.
    fn transport_code(&self) -> &str;

    /// Open a link to the device described by `connect_information`.
    ///
    /// The format of `connect_information` is owned by the transport
    /// (`host:port` for network transports, a device path for serial ones).
    async fn open(&self, connect_information: &str) -> Result<Box<dyn TransportLink>>;
}

/// A live byte link opened by a [`Transport`].
///
/// Callers hold a link exclusively (`&mut self`), so implementations need no
/// internal locking for ordering between `send` and `receive`.
#[async_trait]
pub trait TransportLink: Send {
    /// Transmit the whole buffer.
    ///
    /// Partial writes are retried inside the link; the future resolves only
    /// once every byte was handed to the medium, or with an error.
    async fn send(&mut self, data: Bytes) -> Result<()>;

    /// Receive the next available chunk of bytes.
    ///
    /// Chunks are never empty. Message boundaries are not preserved. Resolves
    /// with [`TransportError::Closed`](crate::TransportError::Closed) once the
    /// link has been closed.
    async fn receive(&mut self) -> Result<Bytes>;

    /// Tear the link down. Closing an already closed link is a no-op.
    async fn close(&mut self) -> Result<()>;
}

impl std::fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("transport_code", &self.transport_code())
            .finish()
    }
}

impl std::fmt::Debug for dyn TransportLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportLink").finish_non_exhaustive()
    }
}
