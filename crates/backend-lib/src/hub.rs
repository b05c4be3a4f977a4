// ============================
// chat-backend-lib/src/hub.rs
// ============================
//! Broadcast hub: per-room subscriber sets and fan-out of newly appended
//! message batches. Payloads are handed over pre-serialized, so every
//! subscriber of a room receives identical bytes.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// Identifies one live connection inside the hub.
pub type ConnId = Uuid;

/// A pre-serialized server event, shared between all subscriber queues.
pub type Frame = Arc<str>;

/// One room's subscriber entry: the sending half of a session's outbound
/// queue. The owning session holds the receiving half; once it drops the
/// receiver, deliveries fail and the entry is pruned.
type Subscriber = (ConnId, mpsc::Sender<Frame>);

pub struct BroadcastHub {
    subscribers: DashMap<String, Vec<Subscriber>>,
    // Held across append+publish so that per-room delivery order matches
    // append completion order.
    order: DashMap<String, Arc<Mutex<()>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            order: DashMap::new(),
        }
    }

    /// The per-room publish-order lock. A publisher acquires it before
    /// appending to the room's log and releases it after `publish` returns.
    pub fn order_lock(&self, room_id: &str) -> Arc<Mutex<()>> {
        self.order.entry(room_id.to_string()).or_default().clone()
    }

    /// Subscribe a connection to a room. Idempotent.
    pub fn subscribe(&self, room_id: &str, conn_id: ConnId, tx: mpsc::Sender<Frame>) {
        let mut subs = self.subscribers.entry(room_id.to_string()).or_default();
        if !subs.iter().any(|(id, _)| *id == conn_id) {
            subs.push((conn_id, tx));
        }
    }

    /// Remove a connection's subscription to a room. Unknown entries are a
    /// no-op.
    pub fn unsubscribe(&self, room_id: &str, conn_id: ConnId) {
        if let Some(mut subs) = self.subscribers.get_mut(room_id) {
            subs.retain(|(id, _)| *id != conn_id);
        }
    }

    /// Remove every subscription held by a connection. Called on disconnect,
    /// before the session's queue receiver is dropped.
    pub fn unsubscribe_all(&self, conn_id: ConnId) {
        for mut subs in self.subscribers.iter_mut() {
            subs.retain(|(id, _)| *id != conn_id);
        }
    }

    /// Number of live subscribers of a room.
    pub fn subscriber_count(&self, room_id: &str) -> usize {
        self.subscribers
            .get(room_id)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// Deliver `frame` to the outbound queue of every current subscriber of
    /// the room, the originating session included. A subscriber that closed
    /// its queue concurrently is pruned; the delivery is a no-op, not a
    /// fault.
    pub async fn publish(&self, room_id: &str, frame: Frame) {
        // Snapshot the membership, then send without holding the map lock:
        // a full queue blocks until the session drains it, and we must not
        // stall unrelated subscribe/unsubscribe calls meanwhile.
        let targets: Vec<Subscriber> = match self.subscribers.get(room_id) {
            Some(subs) => subs.clone(),
            None => return,
        };

        let mut closed = Vec::new();
        for (conn_id, tx) in &targets {
            if tx.send(frame.clone()).await.is_err() {
                closed.push(*conn_id);
            }
        }

        for conn_id in closed {
            self.unsubscribe(room_id, conn_id);
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(s: &str) -> Frame {
        Arc::from(s)
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers_including_sender() {
        let hub = BroadcastHub::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        hub.subscribe("wasm", a, tx_a);
        hub.subscribe("wasm", b, tx_b);

        hub.publish("wasm", frame("payload")).await;

        // Identical bytes on both queues; the sender (a) is a subscriber too.
        assert_eq!(&*rx_a.recv().await.unwrap(), "payload");
        assert_eq!(&*rx_b.recv().await.unwrap(), "payload");
    }

    #[tokio::test]
    async fn test_publish_scoped_to_room() {
        let hub = BroadcastHub::new();
        let (tx, mut rx) = mpsc::channel(8);
        hub.subscribe("db", Uuid::new_v4(), tx);

        hub.publish("wasm", frame("elsewhere")).await;
        hub.publish("db", frame("here")).await;

        assert_eq!(&*rx.recv().await.unwrap(), "here");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_per_subscriber_fifo() {
        let hub = BroadcastHub::new();
        let (tx, mut rx) = mpsc::channel(8);
        hub.subscribe("db", Uuid::new_v4(), tx);

        for i in 0..5 {
            hub.publish("db", frame(&format!("msg {i}"))).await;
        }
        for i in 0..5 {
            assert_eq!(&*rx.recv().await.unwrap(), &format!("msg {i}"));
        }
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let hub = BroadcastHub::new();
        let (tx, mut rx) = mpsc::channel(8);
        let conn = Uuid::new_v4();

        hub.subscribe("beast", conn, tx.clone());
        hub.subscribe("beast", conn, tx);
        assert_eq!(hub.subscriber_count("beast"), 1);

        hub.publish("beast", frame("once")).await;
        assert_eq!(&*rx.recv().await.unwrap(), "once");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_is_noop() {
        let hub = BroadcastHub::new();
        hub.unsubscribe("beast", Uuid::new_v4());
        hub.unsubscribe_all(Uuid::new_v4());
        assert_eq!(hub.subscriber_count("beast"), 0);
    }

    #[tokio::test]
    async fn test_publish_to_closed_session_is_noop_and_prunes() {
        let hub = BroadcastHub::new();
        let (tx_gone, rx_gone) = mpsc::channel(8);
        let (tx_live, mut rx_live) = mpsc::channel(8);
        let gone = Uuid::new_v4();

        hub.subscribe("async", gone, tx_gone);
        hub.subscribe("async", Uuid::new_v4(), tx_live);

        // The session closed without unsubscribing first; the race must not
        // affect other subscribers.
        drop(rx_gone);
        hub.publish("async", frame("still delivered")).await;

        assert_eq!(&*rx_live.recv().await.unwrap(), "still delivered");
        assert_eq!(hub.subscriber_count("async"), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_all_removes_every_room() {
        let hub = BroadcastHub::new();
        let conn = Uuid::new_v4();
        for room in ["beast", "async", "db", "wasm"] {
            let (tx, _rx) = mpsc::channel(8);
            hub.subscribe(room, conn, tx);
        }

        hub.unsubscribe_all(conn);
        for room in ["beast", "async", "db", "wasm"] {
            assert_eq!(hub.subscriber_count(room), 0);
        }
    }
}
