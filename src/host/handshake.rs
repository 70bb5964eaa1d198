use parking_lot::{Condvar, Mutex};

use crate::bus::NotificationBus;

/// Single-slot, single-waiter input rendezvous.
///
/// The invocation worker calls [`request_input`](Self::request_input) and
/// blocks until the caller-facing side calls [`supply`](Self::supply). A value
/// supplied while nobody waits is buffered for the next request; a second
/// supply before it is consumed replaces it.
///
/// There is no timeout. A request that is never answered blocks its worker
/// forever; the caller decides when a human has answered.
pub struct InputHandshake {
    slot: Mutex<Slot>,
    ready: Condvar,
    bus: NotificationBus,
}

#[derive(Default)]
struct Slot {
    value: Option<String>,
    waiting: usize,
}

impl InputHandshake {
    pub fn new(bus: NotificationBus) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            ready: Condvar::new(),
            bus,
        }
    }

    /// Fire a prompt notification, then block until a value is supplied.
    pub fn request_input(&self, prompt: &str) -> String {
        tracing::debug!(prompt, "input requested");
        self.bus.prompt(prompt);

        let mut slot = self.slot.lock();
        slot.waiting += 1;
        loop {
            if let Some(value) = slot.value.take() {
                slot.waiting -= 1;
                tracing::debug!("input received");
                return value;
            }
            self.ready.wait(&mut slot);
        }
    }

    /// Store `value` and release one blocked waiter. Absent becomes empty.
    pub fn supply(&self, value: Option<String>) {
        let waiting = {
            let mut slot = self.slot.lock();
            if slot.value.is_some() {
                tracing::debug!("replacing unconsumed buffered input");
            }
            slot.value = Some(value.unwrap_or_default());
            slot.waiting
        };
        if waiting == 0 {
            tracing::debug!("input buffered for next prompt");
        }
        self.ready.notify_one();
    }

    /// Number of threads currently blocked in `request_input`.
    pub fn waiting(&self) -> usize {
        self.slot.lock().waiting
    }

    pub fn has_buffered_input(&self) -> bool {
        self.slot.lock().value.is_some()
    }
}
