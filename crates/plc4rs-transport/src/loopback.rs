use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{Transport, TransportLink};

/// Default transport code of the loopback transport.
pub const LOOPBACK: &str = "loopback";

/// Behavior switches for [`LoopbackTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopbackConfig {
    /// When true, `open` fails as if the device were unreachable.
    pub refuse_connections: bool,
    /// When true, `close` fails and the link stays open.
    pub fail_close: bool,
    /// When true, sent bytes are handed back by `receive`. Otherwise they are discarded.
    pub echo: bool,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            refuse_connections: false,
            fail_close: false,
            echo: true,
        }
    }
}

/// In-process transport backed by a channel.
///
/// Every opened link is independent. The transport keeps a count of links that
/// are currently open so callers can check that nothing leaks.
pub struct LoopbackTransport {
    code: String,
    config: LoopbackConfig,
    open_links: Arc<AtomicUsize>,
}

impl LoopbackTransport {
    /// Create a loopback transport registered under [`LOOPBACK`].
    pub fn new() -> Self {
        Self::with_code(LOOPBACK)
    }

    /// Create a loopback transport registered under a custom code.
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            config: LoopbackConfig::default(),
            open_links: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Override behavior config.
    #[must_use]
    pub fn with_config(mut self, config: LoopbackConfig) -> Self {
        self.config = config;
        self
    }

    /// Behavior config.
    pub fn config(&self) -> &LoopbackConfig {
        &self.config
    }

    /// Number of links opened by this transport that are not closed yet.
    pub fn open_links(&self) -> usize {
        self.open_links.load(Ordering::SeqCst)
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn transport_code(&self) -> &str {
        &self.code
    }

    async fn open(&self, connect_information: &str) -> Result<Box<dyn TransportLink>> {
        if self.config.refuse_connections {
            return Err(TransportError::Open {
                target: connect_information.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.open_links.fetch_add(1, Ordering::SeqCst);
        debug!(transport = %self.code, target = connect_information, "loopback link opened");

        Ok(Box::new(LoopbackLink {
            tx: Some(tx),
            rx,
            config: self.config,
            open_links: Arc::clone(&self.open_links),
        }))
    }
}

/// A link opened by [`LoopbackTransport`].
pub struct LoopbackLink {
    tx: Option<mpsc::UnboundedSender<Bytes>>,
    rx: mpsc::UnboundedReceiver<Bytes>,
    config: LoopbackConfig,
    open_links: Arc<AtomicUsize>,
}

impl LoopbackLink {
    fn is_closed(&self) -> bool {
        self.tx.is_none()
    }
}

#[async_trait]
impl TransportLink for LoopbackLink {
    async fn send(&mut self, data: Bytes) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        if data.is_empty() || !self.config.echo {
            return Ok(());
        }
        tx.send(data).map_err(|_| TransportError::Closed)
    }

    async fn receive(&mut self) -> Result<Bytes> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.rx.recv().await.ok_or(TransportError::Closed)
    }

    async fn close(&mut self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        if self.config.fail_close {
            return Err(TransportError::Close("loopback configured to fail close".to_string()));
        }

        self.tx = None;
        self.rx.close();
        self.open_links.fetch_sub(1, Ordering::SeqCst);
        debug!("loopback link closed");
        Ok(())
    }
}

impl Drop for LoopbackLink {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            self.open_links.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
