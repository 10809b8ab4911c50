use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::SystemConfig;
use crate::connection::Connection;
use crate::error::{CoreError, RegistryKind, Result};

/// Stable handle to a registry entry.
///
/// Handles are generation-checked: once an entry is removed its handle never
/// resolves again, even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionHandle {
    index: u32,
    generation: u32,
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}.{}", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

struct Node<T> {
    value: T,
    prev: Option<u32>,
    next: Option<u32>,
}

/// Ordered collection of live connections.
///
/// A doubly-linked list threaded through a slot arena: insertion at the head
/// and removal by handle are O(1), iteration runs most-recent-first, and
/// removed slots are recycled.
pub struct ConnectionRegistry<T = Arc<Connection>> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    head: Option<u32>,
    len: usize,
    max_entries: usize,
}

/// A reserved position in a [`ConnectionRegistry`].
///
/// Nothing changes in the registry until [`VacantEntry::insert`] is called.
pub struct VacantEntry<'a, T> {
    registry: &'a mut ConnectionRegistry<T>,
    handle: ConnectionHandle,
}

impl<T> ConnectionRegistry<T> {
    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            len: 0,
            max_entries,
        }
    }

    /// Reserve room for one entry.
    ///
    /// Fails with `CapacityExceeded` at the configured limit and with
    /// `AllocationFailed` if the arena cannot grow.
    pub fn vacant_entry(&mut self) -> Result<VacantEntry<'_, T>> {
        if self.len >= self.max_entries {
            return Err(CoreError::CapacityExceeded {
                kind: RegistryKind::Connection,
                max: self.max_entries,
            });
        }

        let handle = match self.free.last() {
            Some(&index) => ConnectionHandle {
                index,
                generation: self.slots[index as usize].generation,
            },
            None => {
                let index = u32::try_from(self.slots.len())
                    .map_err(|_| CoreError::AllocationFailed(RegistryKind::Connection))?;
                self.slots
                    .try_reserve(1)
                    .map_err(|_| CoreError::AllocationFailed(RegistryKind::Connection))?;
                // Room for every slot in the free list, so `remove` never allocates.
                let free_room = self.slots.len() + 1 - self.free.len();
                self.free
                    .try_reserve(free_room)
                    .map_err(|_| CoreError::AllocationFailed(RegistryKind::Connection))?;
                ConnectionHandle {
                    index,
                    generation: 0,
                }
            }
        };

        Ok(VacantEntry {
            registry: self,
            handle,
        })
    }

    /// Insert at the head of the list.
    pub fn insert(&mut self, value: T) -> Result<ConnectionHandle> {
        Ok(self.vacant_entry()?.insert(value))
    }

    /// Unlink an entry. Stale or unknown handles yield `None`.
    pub fn remove(&mut self, handle: ConnectionHandle) -> Option<T> {
        let index = handle.index;
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);

        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        if let Some(next) = node.next {
            self.node_mut(next).prev = node.prev;
        }

        self.free.push(index);
        self.len -= 1;
        debug!(%handle, remaining = self.len, "connection unlinked");
        Some(node.value)
    }

    pub fn get(&self, handle: ConnectionHandle) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_ref().map(|node| &node.value)
    }

    pub fn contains(&self, handle: ConnectionHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Entries, most recently inserted first.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            registry: self,
            cursor: self.head,
        }
    }

    /// Snapshot of current handles, most recently inserted first.
    ///
    /// The snapshot stays usable while entries are inserted or removed;
    /// handles removed in the meantime simply stop resolving.
    pub fn handles(&self) -> Vec<ConnectionHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn node_mut(&mut self, index: u32) -> &mut Node<T> {
        match self.slots[index as usize].node.as_mut() {
            Some(node) => node,
            None => unreachable!("linked slot {index} is vacant"),
        }
    }
}

impl<T> Default for ConnectionRegistry<T> {
    fn default() -> Self {
        Self::with_limit(SystemConfig::default().max_connections)
    }
}

impl<T> VacantEntry<'_, T> {
    /// Handle the entry will have once inserted.
    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    pub fn insert(self, value: T) -> ConnectionHandle {
        let registry = self.registry;
        let handle = self.handle;
        let index = handle.index;
        let old_head = registry.head;

        let node = Node {
            value,
            prev: None,
            next: old_head,
        };
        if registry.free.last() == Some(&index) {
            registry.free.pop();
            registry.slots[index as usize].node = Some(node);
        } else {
            registry.slots.push(Slot {
                generation: handle.generation,
                node: Some(node),
            });
        }

        if let Some(head) = old_head {
            registry.node_mut(head).prev = Some(index);
        }
        registry.head = Some(index);
        registry.len += 1;
        debug!(%handle, live = registry.len, "connection linked");
        handle
    }
}

/// Iterator over `(handle, entry)` pairs, most recent first.
pub struct Iter<'a, T> {
    registry: &'a ConnectionRegistry<T>,
    cursor: Option<u32>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (ConnectionHandle, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let slot = &self.registry.slots[index as usize];
        let node = slot.node.as_ref()?;
        self.cursor = node.next;
        Some((
            ConnectionHandle {
                index,
                generation: slot.generation,
            },
            &node.value,
        ))
    }
}
