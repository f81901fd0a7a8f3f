//! Subscription channel for observers outside the patch (editors, live
//! value displays). Events are keyed by a port's notification name.

use crate::port::{notification_name, ConnectionStatus, PortId};
use crate::{NodeId, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Events published as ports change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PortEvent {
    ValueChanged {
        notification_name: String,
        port_id: PortId,
        node_id: Option<NodeId>,
        value: Value,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        notification_name: String,
        port_id: PortId,
        node_id: Option<NodeId>,
        status: ConnectionStatus,
        timestamp: DateTime<Utc>,
    },
}

impl PortEvent {
    pub fn value_changed(port_id: PortId, node_id: Option<NodeId>, value: Value) -> Self {
        PortEvent::ValueChanged {
            notification_name: notification_name(port_id),
            port_id,
            node_id,
            value,
            timestamp: Utc::now(),
        }
    }

    pub fn status_changed(
        port_id: PortId,
        node_id: Option<NodeId>,
        status: ConnectionStatus,
    ) -> Self {
        PortEvent::StatusChanged {
            notification_name: notification_name(port_id),
            port_id,
            node_id,
            status,
            timestamp: Utc::now(),
        }
    }

    pub fn notification_name(&self) -> &str {
        match self {
            PortEvent::ValueChanged { notification_name, .. }
            | PortEvent::StatusChanged { notification_name, .. } => notification_name,
        }
    }

    pub fn port_id(&self) -> PortId {
        match self {
            PortEvent::ValueChanged { port_id, .. } | PortEvent::StatusChanged { port_id, .. } => {
                *port_id
            }
        }
    }
}

/// Broadcast bus carrying every port event of a patch
pub struct EventBus {
    sender: broadcast::Sender<PortEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }

    pub fn emit(&self, event: PortEvent) {
        let _ = self.sender.send(event);
    }

    /// Receive every event regardless of port
    pub fn subscribe_all(&self) -> broadcast::Receiver<PortEvent> {
        self.sender.subscribe()
    }

    /// Receive the events of the port with this notification name
    pub fn subscribe(&self, notification_name: impl Into<String>) -> PortSubscription {
        PortSubscription {
            notification_name: notification_name.into(),
            receiver: self.sender.subscribe(),
        }
    }
}

/// Filtered view over the bus for a single port
pub struct PortSubscription {
    notification_name: String,
    receiver: broadcast::Receiver<PortEvent>,
}

impl PortSubscription {
    pub fn notification_name(&self) -> &str {
        &self.notification_name
    }

    /// Next matching event already published, without waiting
    pub fn try_next(&mut self) -> Option<PortEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.notification_name() == self.notification_name => {
                    return Some(event)
                }
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Subscription {} lagged by {} events",
                        self.notification_name,
                        skipped
                    );
                    continue;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain every matching event published so far
    pub fn drain(&mut self) -> Vec<PortEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Wait for the next matching event. `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<PortEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.notification_name() == self.notification_name => {
                    return Some(event)
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Subscription {} lagged by {} events",
                        self.notification_name,
                        skipped
                    );
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_subscription_filters_by_notification_name() {
        let bus = EventBus::new(16);
        let watched = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut sub = bus.subscribe(notification_name(watched));

        bus.emit(PortEvent::value_changed(other, None, Value::Number(1.0)));
        bus.emit(PortEvent::value_changed(watched, None, Value::Number(2.0)));
        bus.emit(PortEvent::status_changed(watched, None, ConnectionStatus::Connected));

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.port_id() == watched));
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn test_has_subscribers() {
        let bus = EventBus::new(0);
        assert!(!bus.has_subscribers());
        let _sub = bus.subscribe("x");
        assert!(bus.has_subscribers());
    }
}
