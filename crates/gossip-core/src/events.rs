// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The Event Bus: a bounded intake queue drained by a single broadcaster
//! task that fans each [`Event`] out to every subscriber, dropping any
//! subscriber whose per-send write deadline expires.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Wire-level event type discriminant: `0=CHANGE_STATE`, `1=UPDATE_VALUE`,
/// `2=END` (reserved, never emitted by this engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum EventType {
    ChangeState = 0,
    UpdateValue = 1,
    End = 2,
}

/// `{from, type, data}` — the JSON shape an external consumer (dashboard,
/// HTTP/WS layer) expects, so an `Event` can be forwarded unchanged.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub from: String,
    #[serde(rename = "type", serialize_with = "serialize_event_type")]
    pub kind: EventType,
    pub data: serde_json::Value,
}

fn serialize_event_type<S: serde::Serializer>(kind: &EventType, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u8(*kind as u8)
}

impl Event {
    pub fn change_state(from: impl Into<String>, state: u8) -> Self {
        Self {
            from: from.into(),
            kind: EventType::ChangeState,
            data: serde_json::json!(state),
        }
    }

    pub fn update_value(from: impl Into<String>, value: f64) -> Self {
        Self {
            from: from.into(),
            kind: EventType::UpdateValue,
            data: serde_json::json!(format!("{:.2}", value)),
        }
    }
}

const SUBSCRIBER_QUEUE_CAPACITY: usize = 64;

struct BusConfig {
    subscriber_write_deadline: Duration,
    broadcaster_interval: Duration,
}

/// Cheap-to-clone handle to the running Event Bus. Every agent holds one
/// (via [`Simulation`](crate::simulation::Simulation)) to publish events;
/// external observers call [`EventBus::subscribe`] to receive them.
#[derive(Clone)]
pub struct EventBus {
    intake_tx: async_channel::Sender<Event>,
    /// A second handle onto the intake queue, used only by [`EventBus::drain`].
    /// `async_channel` receivers are themselves MPMC, so this races the
    /// broadcaster for whatever is still queued — acceptable since draining
    /// only runs as part of a reset, when no consumer cares about fidelity.
    intake_rx: async_channel::Receiver<Event>,
    subscribers: Arc<DashMap<u64, mpsc::Sender<Event>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    /// Build the bus and spawn its broadcaster task. The returned
    /// `JoinHandle` is for tests/shutdown bookkeeping; dropping it does not
    /// stop the broadcaster (it keeps running until the bus itself is
    /// dropped and the intake channel closes).
    pub fn spawn(
        capacity: usize,
        subscriber_write_deadline_ms: u64,
        broadcaster_interval_ms: u64,
    ) -> (Self, JoinHandle<()>) {
        let (intake_tx, intake_rx) = async_channel::bounded(capacity);
        let subscribers: Arc<DashMap<u64, mpsc::Sender<Event>>> = Arc::new(DashMap::new());
        let config = BusConfig {
            subscriber_write_deadline: Duration::from_millis(subscriber_write_deadline_ms),
            broadcaster_interval: Duration::from_millis(broadcaster_interval_ms),
        };

        let bus = Self {
            intake_tx,
            intake_rx: intake_rx.clone(),
            subscribers: Arc::clone(&subscribers),
            next_id: Arc::new(AtomicU64::new(0)),
        };

        let handle = tokio::spawn(broadcaster_loop(intake_rx, subscribers, config));
        (bus, handle)
    }

    /// Drop every event currently queued for broadcast without forwarding
    /// it to any subscriber (used by `reset`/`clear`).
    pub fn drain(&self) {
        while self.intake_rx.try_recv().is_ok() {}
    }

    /// Publish an event onto the intake queue. Best-effort: a full queue
    /// means the publisher cooperatively waits, same backpressure as the
    /// Medium.
    pub async fn publish(&self, event: Event) {
        let _ = self.intake_tx.send(event).await;
    }

    /// Attach a new subscriber. Returns a receiver the caller polls for
    /// events; the subscriber is dropped from the bus the first time a
    /// send to it exceeds the write deadline or its receiver is dropped.
    pub fn subscribe(&self) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(id, tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

async fn broadcaster_loop(
    intake_rx: async_channel::Receiver<Event>,
    subscribers: Arc<DashMap<u64, mpsc::Sender<Event>>>,
    config: BusConfig,
) {
    while let Ok(event) = intake_rx.recv().await {
        let targets: Vec<(u64, mpsc::Sender<Event>)> = subscribers
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();

        for (id, sender) in targets {
            let deadline = tokio::time::timeout(
                config.subscriber_write_deadline,
                sender.send(event.clone()),
            )
            .await;
            match deadline {
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    tracing::debug!(subscriber = id, "subscriber channel closed, dropping");
                    subscribers.remove(&id);
                }
                Err(_) => {
                    tracing::warn!(subscriber = id, "subscriber write deadline exceeded, dropping");
                    subscribers.remove(&id);
                }
            }
        }

        tokio::time::sleep(config.broadcaster_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let (bus, _handle) = EventBus::spawn(10, 200, 1);
        let mut rx = bus.subscribe();
        bus.publish(Event::change_state("agent-1", 1)).await;
        let ev = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ev.from, "agent-1");
    }

    #[tokio::test]
    async fn blocked_subscriber_is_dropped_others_keep_receiving() {
        let (bus, _handle) = EventBus::spawn(10, 50, 1);
        let blocked_rx = bus.subscribe();
        let mut live_rx = bus.subscribe();

        // Fill the blocked subscriber's queue without draining it so the
        // next send to it times out.
        for i in 0..SUBSCRIBER_QUEUE_CAPACITY + 1 {
            bus.publish(Event::change_state("x", (i % 2) as u8)).await;
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(bus.subscriber_count(), 1, "blocked subscriber should have been dropped");

        // The live subscriber (which we're about to drain) should still
        // have events queued for it.
        let mut seen = 0;
        while tokio::time::timeout(Duration::from_millis(50), live_rx.recv())
            .await
            .ok()
            .flatten()
            .is_some()
        {
            seen += 1;
        }
        assert!(seen > 0);

        drop(blocked_rx);
    }

    #[test]
    fn event_serializes_type_as_integer() {
        let ev = Event::update_value("a", 1.5);
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], 1);
        assert_eq!(json["data"], "1.50");
    }
}
