use std::sync::Arc;

use plc4rs_driver::{is_valid_code, Driver};
use plc4rs_transport::Transport;
use tracing::debug;

use crate::config::SystemConfig;
use crate::error::{CoreError, RegistryKind, Result};

/// Something installed in a [`CodeRegistry`] under a unique code.
pub trait Registered {
    fn code(&self) -> &str;
}

impl Registered for Driver {
    fn code(&self) -> &str {
        self.protocol_code()
    }
}

impl Registered for dyn Transport {
    fn code(&self) -> &str {
        self.transport_code()
    }
}

/// Code-keyed registry of installed plugins.
///
/// Iteration order is most-recently-registered first. Lookups are linear;
/// registries hold a handful of installed plugins.
pub struct CodeRegistry<T: ?Sized> {
    kind: RegistryKind,
    entries: Vec<Arc<T>>,
    max_entries: usize,
}

/// Installed protocol drivers, keyed by protocol code.
pub type DriverRegistry = CodeRegistry<Driver>;

/// Installed transports, keyed by transport code.
pub type TransportRegistry = CodeRegistry<dyn Transport>;

impl DriverRegistry {
    /// Create an empty driver registry holding at most `max_entries` drivers.
    pub fn with_limit(max_entries: usize) -> Self {
        Self::empty(RegistryKind::Driver, max_entries)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_limit(SystemConfig::default().max_drivers)
    }
}

impl TransportRegistry {
    /// Create an empty transport registry holding at most `max_entries` transports.
    pub fn with_limit(max_entries: usize) -> Self {
        Self::empty(RegistryKind::Transport, max_entries)
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::with_limit(SystemConfig::default().max_transports)
    }
}

impl<T: ?Sized + Registered> CodeRegistry<T> {
    fn empty(kind: RegistryKind, max_entries: usize) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            max_entries,
        }
    }

    /// Install an entry.
    ///
    /// Fails without touching the registry if the code is malformed, the
    /// code is taken, the configured limit is reached, or the backing
    /// storage cannot grow.
    pub fn register(&mut self, entry: Arc<T>) -> Result<()> {
        if !is_valid_code(entry.code()) {
            return Err(CoreError::InvalidCode {
                kind: self.kind,
                code: entry.code().to_string(),
            });
        }
        if self.contains(entry.code()) {
            return Err(CoreError::DuplicateRegistration {
                kind: self.kind,
                code: entry.code().to_string(),
            });
        }
        if self.entries.len() >= self.max_entries {
            return Err(CoreError::CapacityExceeded {
                kind: self.kind,
                max: self.max_entries,
            });
        }
        self.entries
            .try_reserve(1)
            .map_err(|_| CoreError::AllocationFailed(self.kind))?;

        debug!(kind = %self.kind, code = entry.code(), "registered");
        self.entries.push(entry);
        Ok(())
    }

    /// Find an entry by code.
    pub fn lookup(&self, code: &str) -> Option<&Arc<T>> {
        self.iter().find(|entry| entry.code() == code)
    }

    /// Remove an entry by code. Unknown codes are ignored.
    pub fn unregister(&mut self, code: &str) -> Option<Arc<T>> {
        let index = self.entries.iter().position(|entry| entry.code() == code)?;
        debug!(kind = %self.kind, code, "unregistered");
        Some(self.entries.remove(index))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.iter().any(|entry| entry.code() == code)
    }

    /// Entries, most recently registered first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.entries.iter().rev()
    }

    /// Installed codes, most recently registered first.
    pub fn codes(&self) -> Vec<&str> {
        self.iter().map(|entry| entry.code()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use plc4rs_driver::AddressParseError;
    use plc4rs_transport::LoopbackTransport;

    use super::*;

    fn driver(code: &str) -> Arc<Driver> {
        Arc::new(
            Driver::new(code, code.to_uppercase(), "tcp", |a: &str| {
                Ok::<_, AddressParseError>(a.to_string())
            })
            .unwrap(),
        )
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = DriverRegistry::default();
        registry.register(driver("modbus")).unwrap();

        let found = registry.lookup("modbus").unwrap();
        assert_eq!(found.protocol_name(), "MODBUS");
        assert!(registry.lookup("s7").is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected_without_mutation() {
        let mut registry = DriverRegistry::default();
        registry.register(driver("modbus")).unwrap();

        let err = registry.register(driver("modbus")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::DuplicateRegistration {
                kind: RegistryKind::Driver,
                ref code,
            } if code == "modbus"
        ));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.codes(), vec!["modbus"]);
    }

    #[test]
    fn iteration_is_most_recent_first() {
        let mut registry = DriverRegistry::default();
        for code in ["modbus", "s7", "ads"] {
            registry.register(driver(code)).unwrap();
        }
        assert_eq!(registry.codes(), vec!["ads", "s7", "modbus"]);

        registry.unregister("s7");
        assert_eq!(registry.codes(), vec!["ads", "modbus"]);
    }

    #[test]
    fn unregister_unknown_is_noop() {
        let mut registry = DriverRegistry::default();
        registry.register(driver("modbus")).unwrap();

        assert!(registry.unregister("s7").is_none());
        assert_eq!(registry.len(), 1);

        let removed = registry.unregister("modbus").unwrap();
        assert_eq!(removed.protocol_code(), "modbus");
        assert!(registry.is_empty());
    }

    #[test]
    fn capacity_limit_is_enforced() {
        let mut registry = DriverRegistry::with_limit(1);
        registry.register(driver("modbus")).unwrap();

        assert!(matches!(
            registry.register(driver("s7")),
            Err(CoreError::CapacityExceeded {
                kind: RegistryKind::Driver,
                max: 1
            })
        ));
        assert_eq!(registry.codes(), vec!["modbus"]);
    }

    #[test]
    fn transport_registry_follows_same_contract() {
        let mut registry = TransportRegistry::default();
        registry
            .register(Arc::new(LoopbackTransport::with_code("tcp")))
            .unwrap();
        registry
            .register(Arc::new(LoopbackTransport::with_code("serial")))
            .unwrap();

        assert_eq!(registry.kind(), RegistryKind::Transport);
        assert_eq!(registry.codes(), vec!["serial", "tcp"]);
        assert!(matches!(
            registry.register(Arc::new(LoopbackTransport::with_code("tcp"))),
            Err(CoreError::DuplicateRegistration {
                kind: RegistryKind::Transport,
                ..
            })
        ));
        assert_eq!(registry.lookup("tcp").unwrap().transport_code(), "tcp");
    }

    #[test]
    fn malformed_transport_codes_are_rejected() {
        let mut registry = TransportRegistry::default();
        for code in ["", "tcp:502", "raw socket"] {
            let err = registry
                .register(Arc::new(LoopbackTransport::with_code(code)))
                .unwrap_err();
            assert!(matches!(
                err,
                CoreError::InvalidCode {
                    kind: RegistryKind::Transport,
                    code: ref rejected,
                } if rejected == code
            ));
        }
        assert!(registry.is_empty());
    }
}
