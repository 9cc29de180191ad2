//! In-process notification bus: fans out rendered frames to every
//! subscribed server-sent-event client, numbering them as it goes.
//!
//! The counter is process-local and resets on restart, by design (the
//! `InitialEvent` frame is what clients resync against, not a persisted
//! sequence).

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};
use tokio_stream::wrappers::BroadcastStream;

use crate::frame::{Frame, StoreWrite};

/// The interface the store publishes write signals through, so that the
/// store stays unaware the bus (or any other subscriber, like a test
/// recorder) exists. [`NotificationBus`] is the production implementation.
#[async_trait]
pub trait StoreWriteSink: Send + Sync {
    async fn notify(&self, write: StoreWrite);
}

/// Bounded broadcast capacity: how many frames a lagging subscriber can fall
/// behind before it starts missing them. The bus makes no stronger promise
/// than best-effort delivery; a lagged subscriber is expected to re-query
/// the store on reconnect rather than replay.
const CHANNEL_CAPACITY: usize = 1024;

pub struct NotificationBus {
    counter: Mutex<u64>,
    sender: broadcast::Sender<Frame>,
}

impl NotificationBus {
    pub fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            counter: Mutex::new(0),
            sender,
        }
    }

    /// Publishes a store-write signal, assigning it the next frame id.
    /// Returns the rendered frame for callers that want to log or test
    /// against it; delivery itself is fire-and-forget (no subscribers is
    /// not an error).
    pub async fn publish(&self, write: StoreWrite) -> Frame {
        let mut counter = self.counter.lock().await;
        *counter += 1;
        let frame = Frame::from_store_write(&write, *counter);
        drop(counter);
        let _ = self.sender.send(frame.clone());
        frame
    }

    /// Subscribes a new listener, returning the `InitialEvent` frame to
    /// write immediately plus a stream of subsequent frames.
    pub async fn subscribe(&self) -> (Frame, BroadcastStream<Frame>) {
        let counter = *self.counter.lock().await;
        let receiver = self.sender.subscribe();
        (Frame::initial(counter), BroadcastStream::new(receiver))
    }

    pub async fn current_counter(&self) -> u64 {
        *self.counter.lock().await
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreWriteSink for NotificationBus {
    async fn notify(&self, write: StoreWrite) {
        self.publish(write).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ims_core::{EventId, IncidentNumber};
    use tokio_stream::StreamExt;

    fn incident_write(n: u32) -> StoreWrite {
        StoreWrite::Incident {
            event: EventId::new("2024").unwrap(),
            number: IncidentNumber::new(n).unwrap(),
        }
    }

    #[tokio::test]
    async fn subscribe_before_any_publish_sees_zero() {
        let bus = NotificationBus::new();
        let (initial, _stream) = bus.subscribe().await;
        assert_eq!(initial.id, 0);
    }

    #[tokio::test]
    async fn frame_ids_strictly_increase() {
        let bus = NotificationBus::new();
        let (_initial, mut stream) = bus.subscribe().await;

        bus.publish(incident_write(1)).await;
        bus.publish(incident_write(2)).await;

        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn late_subscriber_gets_current_counter() {
        let bus = NotificationBus::new();
        bus.publish(incident_write(1)).await;
        bus.publish(incident_write(2)).await;

        let (initial, _stream) = bus.subscribe().await;
        assert_eq!(initial.id, bus.current_counter().await);
        assert_eq!(initial.id, 2);
    }

    #[tokio::test]
    async fn each_publish_delivers_to_every_live_subscriber() {
        let bus = NotificationBus::new();
        let (_i1, mut s1) = bus.subscribe().await;
        let (_i2, mut s2) = bus.subscribe().await;

        bus.publish(incident_write(1)).await;

        let f1 = s1.next().await.unwrap().unwrap();
        let f2 = s2.next().await.unwrap().unwrap();
        assert_eq!(f1.id, f2.id);
    }
}
