// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed event bus for change notifications.
//!
//! The store publishes a [`ChangeEvent`] after every successful conversation
//! or message insert. Subscribers treat events as triggers only: no payload is
//! applied to displayed state directly, because the broadcast channel delivers
//! at-least-once with possible lag. Consumers always re-query the store.

pub mod event;

pub use event::{ChangeEvent, ChangeKind};

use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Default broadcast capacity when none is configured.
pub const DEFAULT_CAPACITY: usize = 256;

/// What a subscription yields: either a concrete event, or notice that the
/// receiver fell behind and events were dropped.
///
/// Both cases mean the same thing to a consumer: something changed, re-query.
#[derive(Debug, Clone)]
pub enum Signal {
    /// A change event within the subscription's scope.
    Changed(ChangeEvent),
    /// The receiver lagged; this many events were skipped.
    Lagged(u64),
}

/// Cloneable handle to the in-process change-notification channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    /// Create a bus with the given broadcast capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Having no subscribers is not an error; the event is simply dropped.
    pub fn publish(&self, event: ChangeEvent) {
        trace!(kind = %event.kind, conversation_id = %event.conversation_id, "publishing change event");
        if self.tx.send(event).is_err() {
            trace!("no subscribers, event dropped");
        }
    }

    /// Subscribe to every event on the bus.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            scope: None,
        }
    }

    /// Subscribe to events involving the given identity only.
    ///
    /// Events for conversations the identity is not a party to are filtered
    /// out before delivery.
    pub fn subscribe_scoped(&self, identity_id: &str) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            scope: Some(identity_id.to_string()),
        }
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A live subscription. Released by dropping it; the broadcast receiver is
/// detached from the channel on drop.
pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
    scope: Option<String>,
}

impl Subscription {
    /// Receive the next in-scope signal.
    ///
    /// Returns `None` once the bus is closed (all senders dropped). A lagged
    /// receiver yields [`Signal::Lagged`] rather than an error, since the
    /// consumer's reaction is the same either way.
    pub async fn recv(&mut self) -> Option<Signal> {
        loop {
            match self.rx.recv().await {
                Ok(event) => match &self.scope {
                    Some(identity_id) if !event.involves(identity_id) => continue,
                    _ => return Some(Signal::Changed(event)),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "subscription lagged, treating as changed");
                    return Some(Signal::Lagged(skipped));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_event(conversation_id: &str, consumer: &str, operator: &str) -> ChangeEvent {
        ChangeEvent::new(
            ChangeKind::MessageInserted,
            conversation_id,
            consumer,
            operator,
        )
    }

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = EventBus::new(8);
        let mut sub = bus.subscribe();

        bus.publish(message_event("c1", "u1", "op1"));

        match sub.recv().await {
            Some(Signal::Changed(event)) => {
                assert_eq!(event.conversation_id, "c1");
                assert_eq!(event.kind, ChangeKind::MessageInserted);
            }
            other => panic!("expected Changed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn scoped_subscription_filters_other_identities() {
        let bus = EventBus::new(8);
        let mut sub = bus.subscribe_scoped("op1");

        // Not involving op1; must be skipped.
        bus.publish(message_event("c-other", "u9", "op9"));
        // Involving op1; must be delivered.
        bus.publish(message_event("c1", "u1", "op1"));

        match sub.recv().await {
            Some(Signal::Changed(event)) => assert_eq!(event.conversation_id, "c1"),
            other => panic!("expected Changed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn lagged_receiver_gets_lagged_signal() {
        let bus = EventBus::new(1);
        let mut sub = bus.subscribe();

        // Overflow the single-slot channel.
        bus.publish(message_event("c1", "u1", "op1"));
        bus.publish(message_event("c2", "u1", "op1"));
        bus.publish(message_event("c3", "u1", "op1"));

        match sub.recv().await {
            Some(Signal::Lagged(skipped)) => assert!(skipped >= 1),
            other => panic!("expected Lagged, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recv_returns_none_when_bus_dropped() {
        let bus = EventBus::new(8);
        let mut sub = bus.subscribe();
        drop(bus);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new(8);
        bus.publish(message_event("c1", "u1", "op1"));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
