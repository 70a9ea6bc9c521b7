use std::sync::Arc;

use dashmap::DashMap;
use eventhub_core::types::ConnId;
use eventhub_protocol::{Broadcast, Envelope};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Outbound half of one push-channel connection. The connection task owns the
/// receiver and writes every frame it gets to the socket in order.
pub type ClientSender = mpsc::Sender<Arc<str>>;

/// Live set of push-channel connections.
///
/// Constructed once at startup and shared by the `/ws` handler (register /
/// unregister) and the workflow gate (broadcast). Keyed by connection id, so
/// registering the same connection twice keeps a single entry.
#[derive(Default)]
pub struct ClientRegistry {
    clients: DashMap<ConnId, ClientSender>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: ConnId, tx: ClientSender) {
        self.clients.insert(id.clone(), tx);
        info!(conn_id = %id, clients = self.clients.len(), "ws client registered");
    }

    /// No-op when `id` is not registered.
    pub fn unregister(&self, id: &ConnId) {
        if self.clients.remove(id).is_some() {
            info!(conn_id = %id, clients = self.clients.len(), "ws client unregistered");
        }
    }

    pub fn count(&self) -> usize {
        self.clients.len()
    }

    /// Serialize once, queue the same text on every connection, evict any
    /// connection whose queue is closed or full. Returns the delivered count.
    pub fn send_envelope(&self, envelope: &Envelope) -> usize {
        let text: Arc<str> = match envelope.to_json() {
            Ok(json) => json.into(),
            Err(e) => {
                warn!(kind = %envelope.kind, error = %e, "failed to serialize envelope");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for entry in self.clients.iter() {
            match entry.value().try_send(Arc::clone(&text)) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(conn_id = %entry.key(), kind = %envelope.kind, error = %e, "ws send failed, evicting client");
                    failed.push(entry.key().clone());
                }
            }
        }
        // removal must wait until the iterator's shard locks are released
        for id in &failed {
            self.clients.remove(id);
        }

        debug!(kind = %envelope.kind, delivered, evicted = failed.len(), "broadcast complete");
        delivered
    }

    /// Drop every connection. Each connection task sees its queue close and
    /// sends a close frame.
    pub fn close_all(&self) {
        let n = self.clients.len();
        self.clients.clear();
        info!(clients = n, "ws registry closed");
    }
}

impl Broadcast for ClientRegistry {
    fn broadcast(&self, envelope: Envelope) -> usize {
        self.send_envelope(&envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventhub_protocol::envelope::DeletedPayload;
    use eventhub_protocol::NotificationKind;

    fn deleted(id: &str) -> Envelope {
        Envelope::new(NotificationKind::EventDeleted, DeletedPayload { id: id.into() })
    }

    #[test]
    fn register_is_idempotent() {
        let reg = ClientRegistry::new();
        let (tx, mut rx) = mpsc::channel(8);
        let id = ConnId::from("c1");
        reg.register(id.clone(), tx.clone());
        reg.register(id, tx);
        assert_eq!(reg.count(), 1);

        assert_eq!(reg.broadcast(deleted("e1")), 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unregister_absent_is_noop() {
        let reg = ClientRegistry::new();
        reg.unregister(&ConnId::from("ghost"));
        assert_eq!(reg.count(), 0);
    }

    #[test]
    fn failing_client_is_evicted_and_others_still_receive() {
        let reg = ClientRegistry::new();
        let (good_tx, mut good_rx) = mpsc::channel(8);
        let (dead_tx, dead_rx) = mpsc::channel(8);
        drop(dead_rx);
        reg.register(ConnId::from("good"), good_tx);
        reg.register(ConnId::from("dead"), dead_tx);

        assert_eq!(reg.broadcast(deleted("e1")), 1);
        assert_eq!(reg.count(), 1);
        let text = good_rx.try_recv().unwrap();
        assert!(text.contains("EVENT_DELETED"));

        assert_eq!(reg.broadcast(deleted("e2")), 1);
        assert!(good_rx.try_recv().unwrap().contains("e2"));
    }

    #[test]
    fn full_queue_counts_as_failure() {
        let reg = ClientRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        reg.register(ConnId::from("slow"), tx);
        assert_eq!(reg.broadcast(deleted("e1")), 1);
        assert_eq!(reg.broadcast(deleted("e2")), 0);
        assert_eq!(reg.count(), 0);
    }

    #[test]
    fn per_client_order_follows_call_order() {
        let reg = ClientRegistry::new();
        let (tx, mut rx) = mpsc::channel(8);
        reg.register(ConnId::from("c"), tx);
        for id in ["a", "b", "c"] {
            reg.broadcast(deleted(id));
        }
        let got: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|t| {
                let v: serde_json::Value = serde_json::from_str(&t).unwrap();
                v["payload"]["id"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(got, vec!["a", "b", "c"]);
    }

    #[test]
    fn all_clients_get_identical_bytes() {
        let reg = ClientRegistry::new();
        let (a_tx, mut a_rx) = mpsc::channel(8);
        let (b_tx, mut b_rx) = mpsc::channel(8);
        reg.register(ConnId::from("a"), a_tx);
        reg.register(ConnId::from("b"), b_tx);
        reg.broadcast(deleted("e1"));
        let a = a_rx.try_recv().unwrap();
        let b = b_rx.try_recv().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn close_all_closes_queues() {
        let reg = ClientRegistry::new();
        let (tx, mut rx) = mpsc::channel::<Arc<str>>(8);
        reg.register(ConnId::from("c"), tx);
        reg.close_all();
        assert_eq!(reg.count(), 0);
        assert!(matches!(rx.try_recv(), Err(mpsc::error::TryRecvError::Disconnected)));
    }
}
