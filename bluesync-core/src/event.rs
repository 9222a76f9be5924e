//! Observable synchronizer events
//!
//! Events fan out over a `tokio::sync::broadcast` channel. Delivery order
//! within one subscriber matches notification processing order; the
//! reconciler collects pending events while it holds the registry lock and
//! the bus sends them only after the lock is released, so subscriber
//! callbacks can never re-enter the registry under its own lock.

use tokio::sync::broadcast;

use bluesync_transport::PropertyMap;

use crate::model::Address;

/// An event emitted by the synchronizer
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A device path was created; fires once per distinct path-creation,
    /// never on a property refresh
    DeviceObserved {
        /// Canonical device address
        address: Address,
        /// Property bag carried by the creating notification
        properties: PropertyMap,
    },
    /// A device entity was removed from the graph
    DeviceVanished {
        /// Canonical device address
        address: Address,
    },
    /// A protocol-consistency violation was absorbed
    ///
    /// The synchronizer keeps running; this is a report, not a failure.
    SyncError {
        /// Human-readable description of the violation
        description: String,
    },
}

/// Fan-out bus for [`SyncEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` undelivered events per
    /// subscriber; lagging subscribers lose oldest events first
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Emit events in order; called only with the registry lock released
    pub fn emit_all(&self, events: Vec<SyncEvent>) {
        for event in events {
            // No subscribers is fine; events are best-effort observability.
            let _ = self.tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_delivered_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let first = Address::parse("AA:BB:CC:DD:EE:FF").unwrap();
        let second = Address::parse("11:22:33:44:55:66").unwrap();
        bus.emit_all(vec![
            SyncEvent::DeviceObserved {
                address: first.clone(),
                properties: PropertyMap::new(),
            },
            SyncEvent::DeviceVanished {
                address: second.clone(),
            },
        ]);

        assert!(matches!(
            rx.try_recv().unwrap(),
            SyncEvent::DeviceObserved { address, .. } if address == first
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            SyncEvent::DeviceVanished { address } if address == second
        ));
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.emit_all(vec![SyncEvent::SyncError {
            description: "nobody listening".to_string(),
        }]);
    }
}
