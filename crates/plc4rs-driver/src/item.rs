use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::driver::DriverId;

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an [`Item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl ItemId {
    fn next() -> Self {
        Self(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item-{}", self.0)
    }
}

/// An addressable value within a connected device.
///
/// Items are only minted by [`Driver::parse_address`](crate::Driver::parse_address).
/// Cloning is cheap and preserves identity: two items compare equal only if
/// they come from the same parse call.
#[derive(Clone)]
pub struct Item {
    inner: Arc<ItemInner>,
}

struct ItemInner {
    id: ItemId,
    driver: DriverId,
    protocol_code: Arc<str>,
    address: String,
}

impl Item {
    pub(crate) fn new(driver: DriverId, protocol_code: Arc<str>, address: String) -> Self {
        Self {
            inner: Arc::new(ItemInner {
                id: ItemId::next(),
                driver,
                protocol_code,
                address,
            }),
        }
    }

    pub fn id(&self) -> ItemId {
        self.inner.id
    }

    /// Identity of the driver that produced this item.
    pub fn driver_id(&self) -> DriverId {
        self.inner.driver
    }

    /// Protocol code of the driver that produced this item.
    pub fn protocol_code(&self) -> &str {
        &self.inner.protocol_code
    }

    /// Canonical address as returned by the driver's parser.
    pub fn address(&self) -> &str {
        &self.inner.address
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Item {}

impl std::hash::Hash for Item {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("id", &self.inner.id)
            .field("driver", &self.inner.driver)
            .field("protocol_code", &self.inner.protocol_code)
            .field("address", &self.inner.address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_identity() {
        let item = Item::new(DriverId::next(), Arc::from("modbus"), "holding:1".to_string());
        let clone = item.clone();
        assert_eq!(item, clone);
        assert_eq!(item.id(), clone.id());
    }

    #[test]
    fn same_address_parsed_twice_is_distinct() {
        let driver = DriverId::next();
        let protocol: Arc<str> = Arc::from("modbus");
        let first = Item::new(driver, Arc::clone(&protocol), "holding:1".to_string());
        let second = Item::new(driver, protocol, "holding:1".to_string());
        assert_ne!(first, second);
        assert!(second.id() > first.id());
        assert_eq!(first.driver_id(), second.driver_id());
    }
}
