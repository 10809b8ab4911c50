use std::sync::Arc;

use plc4rs_driver::{Item, PlcValue};

use crate::connection::{Connection, ConnectionState};
use crate::error::{CoreError, Result};

/// A request kind the connection was not opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    #[error("connection does not support reading")]
    ReadingUnsupported,
    #[error("connection does not support writing")]
    WritingUnsupported,
}

/// A batch of items to read from one connection.
#[derive(Debug, Clone)]
pub struct ReadRequest {
    connection: Arc<Connection>,
    items: Vec<Item>,
}

impl ReadRequest {
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Items in request order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }
}

/// One item/value pair of a [`WriteRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriteItem {
    pub item: Item,
    pub value: PlcValue,
}

/// A batch of item/value pairs to write over one connection.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    connection: Arc<Connection>,
    items: Vec<WriteItem>,
}

impl WriteRequest {
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Pairs in request order.
    pub fn items(&self) -> &[WriteItem] {
        &self.items
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }
}

/// Package a read batch.
///
/// The connection must be connected and opened for reading, and every item
/// must come from the connection's driver. Nothing escapes on failure.
pub fn build_read_request(
    connection: &Arc<Connection>,
    items: impl IntoIterator<Item = Item>,
) -> Result<ReadRequest> {
    if !connection.supports_reading() {
        return Err(CapabilityError::ReadingUnsupported.into());
    }
    ensure_live(connection)?;

    let items: Vec<Item> = items.into_iter().collect();
    for item in &items {
        ensure_same_driver(connection, item)?;
    }

    Ok(ReadRequest {
        connection: Arc::clone(connection),
        items,
    })
}

/// Package a write batch, preserving input order.
pub fn build_write_request(
    connection: &Arc<Connection>,
    items: impl IntoIterator<Item = (Item, PlcValue)>,
) -> Result<WriteRequest> {
    if !connection.supports_writing() {
        return Err(CapabilityError::WritingUnsupported.into());
    }
    ensure_live(connection)?;

    let items: Vec<WriteItem> = items
        .into_iter()
        .map(|(item, value)| WriteItem { item, value })
        .collect();
    for write in &items {
        ensure_same_driver(connection, &write.item)?;
    }

    Ok(WriteRequest {
        connection: Arc::clone(connection),
        items,
    })
}

fn ensure_live(connection: &Connection) -> Result<()> {
    match connection.state() {
        ConnectionState::Connected => Ok(()),
        state => Err(CoreError::InvalidState {
            handle: connection.handle(),
            state,
        }),
    }
}

fn ensure_same_driver(connection: &Connection, item: &Item) -> Result<()> {
    if item.driver_id() == connection.driver().id() {
        Ok(())
    } else {
        Err(CoreError::ForeignItem {
            address: item.address().to_string(),
            item_protocol: item.protocol_code().to_string(),
            connection_protocol: connection.protocol_code().to_string(),
        })
    }
}
