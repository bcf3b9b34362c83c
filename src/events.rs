//! Lifecycle event broadcast.
//!
//! A closed set of events over a broadcast channel, replacing ad-hoc
//! subscribe-once notification. Emission never blocks; receivers that lag
//! past the channel capacity miss old events, which is acceptable for
//! edge-triggered lifecycle observation.

use tokio::sync::broadcast;

/// Observable pool lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEvent {
    /// The shared resource finished opening.
    Opened,
    /// The shared resource finished closing.
    Closed,
    /// The queue is empty and no slot is running a job.
    Idle,
}

pub(crate) struct EventBus {
    tx: broadcast::Sender<PoolEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(32);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.tx.subscribe()
    }

    /// Emit an event. A send error only means nobody is subscribed.
    pub(crate) fn emit(&self, event: PoolEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!(?event, "no subscribers for pool event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_subscribers() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(PoolEvent::Opened);
        bus.emit(PoolEvent::Idle);

        assert_eq!(rx.recv().await.unwrap(), PoolEvent::Opened);
        assert_eq!(rx.recv().await.unwrap(), PoolEvent::Idle);
    }

    #[test]
    fn emit_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.emit(PoolEvent::Closed);
    }
}
