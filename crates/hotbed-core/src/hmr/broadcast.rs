//! Fan-out of update payloads to connected clients.
//!
//! Each client owns a bounded channel. Publishing never waits: a client
//! whose buffer is full, or whose receiver is gone, is dropped from the
//! registry and everyone else still gets the message.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use super::engine::UpdateDecision;
use super::payload::UpdatePayload;

pub type ClientId = usize;

/// Why a client stopped receiving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryFailure {
    #[error("client buffer is full")]
    Saturated,
    #[error("client disconnected")]
    Closed,
}

/// Outcome of one publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    /// Clients removed during this publish, sorted by id.
    pub dropped: Vec<(ClientId, DeliveryFailure)>,
}

#[derive(Debug)]
pub struct Broadcaster {
    // A single lock around the whole fan-out keeps every client seeing
    // payloads in the same order.
    clients: Mutex<FxHashMap<ClientId, mpsc::Sender<String>>>,
    next_id: AtomicUsize,
    buffer: usize,
}

impl Broadcaster {
    /// `buffer` is the number of undelivered payloads a client may lag
    /// behind before it is dropped.
    pub fn new(buffer: usize) -> Self {
        Self {
            clients: Mutex::new(FxHashMap::default()),
            next_id: AtomicUsize::new(0),
            buffer: buffer.max(1),
        }
    }

    /// Register a client. The `connected` payload is already queued on the
    /// returned receiver.
    pub fn connect(&self) -> (ClientId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Fresh channel with capacity >= 1, so this cannot fail.
        let _ = tx.try_send(UpdatePayload::Connected.to_json());
        self.clients.lock().insert(id, tx);
        debug!(client = id, "hmr client connected");
        (id, rx)
    }

    pub fn disconnect(&self, id: ClientId) -> bool {
        let removed = self.clients.lock().remove(&id).is_some();
        if removed {
            debug!(client = id, "hmr client disconnected");
        }
        removed
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Deliver one payload to every client.
    pub fn publish(&self, payload: &UpdatePayload) -> PublishReport {
        let message = payload.to_json();
        let mut clients = self.clients.lock();
        let mut report = PublishReport::default();

        for (id, tx) in clients.iter() {
            match tx.try_send(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => report.dropped.push((*id, DeliveryFailure::Saturated)),
                Err(TrySendError::Closed(_)) => report.dropped.push((*id, DeliveryFailure::Closed)),
            }
        }

        report.dropped.sort_by_key(|(id, _)| *id);
        for (id, reason) in &report.dropped {
            clients.remove(id);
            warn!(client = id, "dropping hmr client: {}", reason);
        }

        debug!(
            kind = payload.kind(),
            delivered = report.delivered,
            dropped = report.dropped.len(),
            "published"
        );
        report
    }

    /// Publish every payload of a decision, in order.
    pub fn publish_decision(&self, decision: &UpdateDecision) -> Vec<PublishReport> {
        decision
            .payloads()
            .iter()
            .map(|payload| self.publish(payload))
            .collect()
    }

    /// Send an application-defined event.
    pub fn send_custom(&self, id: impl Into<String>, payload: serde_json::Value) -> PublishReport {
        self.publish(&UpdatePayload::Custom {
            id: id.into(),
            payload,
        })
    }

    /// Disconnect everyone. Receivers see their stream end.
    pub fn close_all(&self) {
        self.clients.lock().clear();
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_queues_connected() {
        let broadcaster = Broadcaster::new(4);
        let (_, mut rx) = broadcaster.connect();
        assert_eq!(rx.try_recv().unwrap(), r#"{"type":"connected"}"#);
    }

    #[test]
    fn saturated_client_is_dropped_others_keep_receiving() {
        let broadcaster = Broadcaster::new(2);
        let (slow, _slow_rx) = broadcaster.connect();
        let (_, mut fast_rx) = broadcaster.connect();
        // Drain so the fast client always has room.
        fast_rx.try_recv().unwrap();

        // The slow client already holds `connected`; one more fills it.
        let first = broadcaster.publish(&UpdatePayload::FullReload { path: None });
        assert_eq!(first.delivered, 2);
        fast_rx.try_recv().unwrap();

        let second = broadcaster.publish(&UpdatePayload::FullReload { path: None });
        assert_eq!(second.delivered, 1);
        assert_eq!(second.dropped, vec![(slow, DeliveryFailure::Saturated)]);
        assert_eq!(broadcaster.client_count(), 1);
        assert!(fast_rx.try_recv().is_ok());
    }

    #[test]
    fn closed_client_is_dropped() {
        let broadcaster = Broadcaster::new(8);
        let (id, rx) = broadcaster.connect();
        drop(rx);

        let report = broadcaster.publish(&UpdatePayload::StyleRemove { id: "x".into() });
        assert_eq!(report.dropped, vec![(id, DeliveryFailure::Closed)]);
        assert_eq!(broadcaster.client_count(), 0);
    }

    #[test]
    fn payloads_arrive_in_publish_order() {
        let broadcaster = Broadcaster::new(16);
        let (_, mut rx) = broadcaster.connect();
        rx.try_recv().unwrap();

        for n in 0..5 {
            broadcaster.send_custom("tick", serde_json::json!(n));
        }
        for n in 0..5 {
            let msg: UpdatePayload = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(
                msg,
                UpdatePayload::Custom {
                    id: "tick".into(),
                    payload: serde_json::json!(n),
                }
            );
        }
    }
}
