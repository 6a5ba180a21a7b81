//! Change notifications for history and milestones.

use serde::Serialize;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The snapshot history changed; `count` is its new length.
    HistoryUpdated { count: usize },
    HistoryCleared,
    /// Milestones were newly unlocked.
    MilestonesUpdated { unlocked: Vec<String> },
}

/// Fan-out channel for [`EngineEvent`]s.
///
/// Subscribers that fall behind by more than the channel capacity miss the
/// oldest events (`RecvError::Lagged`).
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Send to every current subscriber. Returns how many received it.
    pub fn publish(&self, event: EngineEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                tracing::debug!(?event, "no event subscribers");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(EngineEvent::HistoryCleared), 0);
    }

    #[test]
    fn subscribers_receive_in_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(EngineEvent::HistoryUpdated { count: 1 });
        bus.publish(EngineEvent::HistoryCleared);
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::HistoryUpdated { count: 1 });
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::HistoryCleared);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_value(EngineEvent::MilestonesUpdated {
            unlocked: vec!["regular".into()],
        })
        .unwrap();
        assert_eq!(json["type"], "milestones_updated");
        assert_eq!(json["unlocked"][0], "regular");
    }
}
