//! Notification bus: one-directional fan-out of bridge events to the caller.
//!
//! Delivery is best-effort and isolated per subscriber. A panicking
//! subscriber is logged and skipped; it never reaches the invocation worker.
//! Subscribers are snapshotted before delivery so no lock is held while a
//! subscriber runs, which lets a subscriber call back into the bridge.

mod stream;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

pub use stream::{ChannelObserver, EventStream};

/// Events delivered to the external caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    Output(String),
    Error(String),
    Prompt(String),
    ResultReady,
    InvocationCompleted,
}

impl BridgeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::Output(_) => "output",
            BridgeEvent::Error(_) => "error",
            BridgeEvent::Prompt(_) => "prompt",
            BridgeEvent::ResultReady => "result_ready",
            BridgeEvent::InvocationCompleted => "invocation_completed",
        }
    }

    fn deliver_to(&self, observer: &dyn BridgeObserver) {
        match self {
            BridgeEvent::Output(text) => observer.on_output(text),
            BridgeEvent::Error(text) => observer.on_error(text),
            BridgeEvent::Prompt(text) => observer.on_prompt(text),
            BridgeEvent::ResultReady => observer.on_result_ready(),
            BridgeEvent::InvocationCompleted => observer.on_invocation_completed(),
        }
    }
}

/// Subscriber interface. Every method defaults to doing nothing.
pub trait BridgeObserver: Send + Sync {
    fn on_output(&self, _text: &str) {}

    fn on_error(&self, _text: &str) {}

    /// The running script is blocked until the caller supplies input.
    fn on_prompt(&self, _prompt: &str) {}

    /// The last result may now be pulled.
    fn on_result_ready(&self) {}

    /// Fires exactly once per submitted invocation.
    fn on_invocation_completed(&self) {}
}

/// Handle returned by [`NotificationBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone, Default)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriptionId, Arc<dyn BridgeObserver>)>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn BridgeObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.subscribers.write().push((id, observer));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    pub fn output(&self, text: &str) {
        self.publish(&BridgeEvent::Output(text.to_string()));
    }

    pub fn error(&self, text: &str) {
        self.publish(&BridgeEvent::Error(text.to_string()));
    }

    pub fn prompt(&self, text: &str) {
        self.publish(&BridgeEvent::Prompt(text.to_string()));
    }

    pub fn result_ready(&self) {
        self.publish(&BridgeEvent::ResultReady);
    }

    pub fn invocation_completed(&self) {
        self.publish(&BridgeEvent::InvocationCompleted);
    }

    /// Deliver `event` to every current subscriber, in subscription order.
    pub fn publish(&self, event: &BridgeEvent) {
        let subscribers: Vec<Arc<dyn BridgeObserver>> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in subscribers {
            let delivered = catch_unwind(AssertUnwindSafe(|| event.deliver_to(observer.as_ref())));
            if delivered.is_err() {
                tracing::warn!(event = event.name(), "subscriber panicked; notification dropped");
            }
        }
    }
}
