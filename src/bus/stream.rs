use std::sync::Arc;

use tokio::sync::mpsc;

use crate::bus::{BridgeEvent, BridgeObserver, NotificationBus, SubscriptionId};

/// Observer that forwards every event into an unbounded channel.
///
/// Sending never blocks. If the receiver has been dropped the event is
/// discarded.
#[derive(Clone, Debug)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<BridgeEvent>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::UnboundedSender<BridgeEvent>) -> Self {
        Self { sender }
    }

    fn forward(&self, event: BridgeEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("event stream receiver gone; event dropped");
        }
    }
}

impl BridgeObserver for ChannelObserver {
    fn on_output(&self, text: &str) {
        self.forward(BridgeEvent::Output(text.to_string()));
    }

    fn on_error(&self, text: &str) {
        self.forward(BridgeEvent::Error(text.to_string()));
    }

    fn on_prompt(&self, text: &str) {
        self.forward(BridgeEvent::Prompt(text.to_string()));
    }

    fn on_result_ready(&self) {
        self.forward(BridgeEvent::ResultReady);
    }

    fn on_invocation_completed(&self) {
        self.forward(BridgeEvent::InvocationCompleted);
    }
}

/// Receiving end of a bus subscription.
///
/// Dropping the stream unsubscribes it.
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<BridgeEvent>,
    bus: NotificationBus,
    subscription: SubscriptionId,
}

impl EventStream {
    pub fn subscribe(bus: &NotificationBus) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscription = bus.subscribe(Arc::new(ChannelObserver::new(sender)));
        Self {
            receiver,
            bus: bus.clone(),
            subscription,
        }
    }

    pub async fn recv(&mut self) -> Option<BridgeEvent> {
        self.receiver.recv().await
    }

    /// Blocks the current thread. Panics if called from inside an async runtime.
    pub fn blocking_recv(&mut self) -> Option<BridgeEvent> {
        self.receiver.blocking_recv()
    }

    pub fn try_recv(&mut self) -> Option<BridgeEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.subscription);
    }
}
