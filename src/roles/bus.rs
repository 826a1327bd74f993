use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::identity::Role;

/// Identifies one open session view ("tab").
pub type TabId = Uuid;

const DEFAULT_CAPACITY: usize = 16;

/// One-shot notice that a tab applied a role change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChangeEvent {
    pub old_role: Option<Role>,
    pub new_role: Role,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub origin: TabId,
}

impl RoleChangeEvent {
    pub fn new(origin: TabId, old_role: Option<Role>, new_role: Role) -> Self {
        Self { old_role, new_role, timestamp: Utc::now().timestamp_millis(), origin }
    }
}

/// Cross-tab broadcast of role changes.
///
/// Delivery is at-least-once to subscribers that are listening when the event
/// is published; a subscriber created later, or one that falls more than the
/// channel capacity behind, misses it and catches up on its next poll.
///
/// The bus lives in one process. Watchers in separate processes that share a
/// credential file never hear each other; each one reaches the new role
/// through its own poll.
#[derive(Debug, Clone)]
pub struct RoleBus {
    tx: broadcast::Sender<RoleChangeEvent>,
}

impl Default for RoleBus {
    fn default() -> Self { Self::with_capacity(DEFAULT_CAPACITY) }
}

impl RoleBus {
    pub fn new() -> Self { Self::default() }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Fire `event` to every current subscriber. Nothing is retained for
    /// later subscribers. Returns how many subscribers it reached.
    pub fn publish(&self, event: RoleChangeEvent) -> usize { self.tx.send(event).unwrap_or(0) }

    pub fn subscribe(&self) -> RoleSubscription { RoleSubscription { rx: self.tx.subscribe() } }

    pub fn subscriber_count(&self) -> usize { self.tx.receiver_count() }
}

pub struct RoleSubscription {
    rx: broadcast::Receiver<RoleChangeEvent>,
}

impl RoleSubscription {
    /// Next event, skipping over any this subscriber lagged past.
    /// `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<RoleChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(ev) => return Some(ev),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(target: "prolens::roles", "role bus subscriber missed {} event(s)", n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant; `None` when nothing is pending.
    pub fn try_recv(&mut self) -> Option<RoleChangeEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(ev) => return Some(ev),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_every_current_subscriber() {
        let bus = RoleBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        let ev = RoleChangeEvent::new(Uuid::new_v4(), Some(Role::Renter), Role::Employee);
        assert_eq!(bus.publish(ev.clone()), 2);
        assert_eq!(a.recv().await, Some(ev.clone()));
        assert_eq!(b.recv().await, Some(ev));
    }

    #[tokio::test]
    async fn late_subscribers_miss_earlier_events() {
        let bus = RoleBus::new();
        assert_eq!(bus.publish(RoleChangeEvent::new(Uuid::new_v4(), None, Role::Admin)), 0);
        let mut late = bus.subscribe();
        assert!(late.try_recv().is_none());
    }

    #[tokio::test]
    async fn lagging_subscriber_keeps_newest() {
        let bus = RoleBus::with_capacity(1);
        let mut sub = bus.subscribe();
        let origin = Uuid::new_v4();
        bus.publish(RoleChangeEvent::new(origin, None, Role::Renter));
        bus.publish(RoleChangeEvent::new(origin, None, Role::Admin));
        assert_eq!(sub.recv().await.map(|e| e.new_role), Some(Role::Admin));
    }

    #[test]
    fn event_wire_shape() {
        let ev = RoleChangeEvent::new(Uuid::nil(), Some(Role::Renter), Role::Employee);
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["oldRole"], "renter");
        assert_eq!(v["newRole"], "employee");
        assert!(v["timestamp"].as_i64().unwrap() > 0);
    }
}
