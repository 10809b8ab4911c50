use std::sync::Arc;

use parking_lot::Mutex;
use plc4rs_driver::{AddressParseError, Driver};

use crate::callbacks::Callbacks;

/// Driver accepting any non-empty address without whitespace.
pub(crate) fn address_driver(protocol_code: &str, default_transport: &str) -> Driver {
    Driver::new(
        protocol_code,
        protocol_code.to_uppercase(),
        default_transport,
        |address: &str| {
            if address.is_empty() || address.contains(char::is_whitespace) {
                Err(AddressParseError::new(address, "expected a single token"))
            } else {
                Ok(address.to_string())
            }
        },
    )
    .expect("test driver should be valid")
}

/// Collects hook invocations as `"<event> <subject>"` strings.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub(crate) fn callbacks(&self) -> Callbacks {
        let push = |events: &Arc<Mutex<Vec<String>>>| {
            let events = Arc::clone(events);
            move |event: String| events.lock().push(event)
        };
        let driver_loaded = push(&self.events);
        let driver_load_failed = push(&self.events);
        let connected = push(&self.events);
        let connect_failed = push(&self.events);
        let disconnected = push(&self.events);
        let disconnect_failed = push(&self.events);
        let loop_failed = push(&self.events);

        Callbacks::new()
            .on_driver_load_success(move |d| driver_loaded(format!("driver-loaded {}", d.protocol_code())))
            .on_driver_load_failure(move |code, _| driver_load_failed(format!("driver-load-failed {code}")))
            .on_connect_success(move |c| connected(format!("connected {}", c.connection_string())))
            .on_connect_failure(move |cs, _| connect_failed(format!("connect-failed {cs}")))
            .on_disconnect_success(move |c| disconnected(format!("disconnected {}", c.connection_string())))
            .on_disconnect_failure(move |c, _| {
                disconnect_failed(format!("disconnect-failed {}", c.connection_string()))
            })
            .on_loop_failure(move |reason| loop_failed(format!("loop-failed {reason}")))
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Number of recorded events of one kind.
    pub(crate) fn count(&self, event: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|recorded| recorded.split(' ').next() == Some(event))
            .count()
    }
}
