//! Ordered event bus for [`SimEvent`] notifications.
//!
//! Events are delivered synchronously, in publication order, to every
//! listener in registration order. Cascade rebellions are published inside
//! the frame that caused them, so a listener always sees a rebellion
//! before the cascade it triggered.
//!
//! The bus also keeps the current frame's events, a capped history, and a
//! [`broadcast`] channel for consumers on other tasks (a UI bridge, for
//! instance) that must never block the frame loop.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use hearthguard_types::{EventId, SimEvent};

/// Maximum number of events kept in the history.
pub const MAX_HISTORY: usize = 4096;

/// Capacity of the broadcast channel.
///
/// A subscriber that falls behind by more than this many events receives
/// a [`broadcast::error::RecvError::Lagged`] and skips ahead.
const BROADCAST_CAPACITY: usize = 1024;

/// A published event with its frame and a unique ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Unique, time-ordered ID.
    pub id: EventId,
    /// Frame the event was published in.
    pub frame: u64,
    /// The event.
    pub event: SimEvent,
}

/// Synchronous observer of simulation events.
pub trait EventListener: Send {
    /// Called once per event, in publication order.
    fn on_event(&mut self, frame: u64, event: &SimEvent);
}

/// Logs every event at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl EventListener for TracingListener {
    fn on_event(&mut self, frame: u64, event: &SimEvent) {
        debug!(frame, kind = event.kind(), ?event, "Simulation event");
    }
}

/// Publishes events to listeners and records them.
pub struct EventBus {
    listeners: Vec<Box<dyn EventListener>>,
    frame_events: Vec<SimEvent>,
    history: Vec<RecordedEvent>,
    tx: broadcast::Sender<RecordedEvent>,
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("frame_events", &self.frame_events.len())
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// An empty bus with no listeners.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            listeners: Vec::new(),
            frame_events: Vec::new(),
            history: Vec::new(),
            tx,
        }
    }

    /// Register a listener. Listeners are called in registration order.
    pub fn register(&mut self, listener: Box<dyn EventListener>) {
        self.listeners.push(listener);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Subscribe to the broadcast stream.
    pub fn subscribe(&self) -> broadcast::Receiver<RecordedEvent> {
        self.tx.subscribe()
    }

    /// Forget the previous frame's events.
    pub fn begin_frame(&mut self) {
        self.frame_events.clear();
    }

    /// Publish one event.
    pub fn publish(&mut self, frame: u64, event: SimEvent) {
        trace!(frame, kind = event.kind(), "Publishing event");
        for listener in &mut self.listeners {
            listener.on_event(frame, &event);
        }

        let recorded = RecordedEvent {
            id: EventId::new(),
            frame,
            event,
        };
        // Err only means nobody is subscribed.
        let _ = self.tx.send(recorded.clone());

        self.frame_events.push(recorded.event.clone());
        self.history.push(recorded);
        if self.history.len() > MAX_HISTORY {
            let drain_count = self.history.len().saturating_sub(MAX_HISTORY);
            self.history.drain(..drain_count);
        }
    }

    /// Publish events in order.
    pub fn publish_all(&mut self, frame: u64, events: impl IntoIterator<Item = SimEvent>) {
        for event in events {
            self.publish(frame, event);
        }
    }

    /// Events published since the last [`begin_frame`](Self::begin_frame).
    pub fn frame_events(&self) -> &[SimEvent] {
        &self.frame_events
    }

    /// The most recent events, oldest first, capped at [`MAX_HISTORY`].
    pub fn history(&self) -> &[RecordedEvent] {
        &self.history
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use std::sync::{Arc, Mutex};

    use hearthguard_types::EntityId;

    use super::*;

    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<(&'static str, &'static str)>>>,
    }

    impl EventListener for Recorder {
        fn on_event(&mut self, _frame: u64, event: &SimEvent) {
            if let Ok(mut log) = self.log.lock() {
                log.push((self.tag, event.kind()));
            }
        }
    }

    #[test]
    fn delivers_in_publication_then_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.register(Box::new(Recorder {
            tag: "first",
            log: Arc::clone(&log),
        }));
        bus.register(Box::new(Recorder {
            tag: "second",
            log: Arc::clone(&log),
        }));

        let villager = EntityId::new();
        bus.publish_all(
            1,
            [
                SimEvent::RebellionStarted { villager },
                SimEvent::VillagerRebelled {
                    villager,
                    role: hearthguard_types::Role::Captain,
                },
            ],
        );

        let log = log.lock().map(|l| l.clone()).unwrap_or_default();
        assert_eq!(
            log,
            vec![
                ("first", "rebellion_started"),
                ("second", "rebellion_started"),
                ("first", "villager_rebelled"),
                ("second", "villager_rebelled"),
            ]
        );
    }

    #[test]
    fn frame_events_reset_but_history_persists() {
        let mut bus = EventBus::new();
        bus.publish(1, SimEvent::NightBegan { day: 1 });
        assert_eq!(bus.frame_events().len(), 1);

        bus.begin_frame();
        assert!(bus.frame_events().is_empty());
        bus.publish(2, SimEvent::DayBegan { day: 2 });

        assert_eq!(bus.frame_events(), &[SimEvent::DayBegan { day: 2 }]);
        assert_eq!(bus.history().len(), 2);
        assert_eq!(bus.history().first().map(|r| r.frame), Some(1));
    }

    #[test]
    fn history_is_capped() {
        let mut bus = EventBus::new();
        for day in 0..(MAX_HISTORY + 10) {
            bus.publish(0, SimEvent::DayBegan {
                day: u32::try_from(day).unwrap_or(u32::MAX),
            });
        }
        assert_eq!(bus.history().len(), MAX_HISTORY);
        assert_eq!(
            bus.history().first().map(|r| r.event.clone()),
            Some(SimEvent::DayBegan { day: 10 })
        );
    }

    #[tokio::test]
    async fn subscribers_receive_broadcasts() {
        let mut bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(7, SimEvent::PlayerDied);
        let received = rx.recv().await.ok();
        assert_eq!(received.map(|r| (r.frame, r.event)), Some((7, SimEvent::PlayerDied)));
    }
}
