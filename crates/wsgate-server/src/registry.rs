use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;

use wsgate_core::errors::PushError;
use wsgate_core::ConnectionId;

/// A registered client socket: the write-side queue plus metadata. The
/// writer pump holds the receiving half; everything else enqueues through
/// here.
pub struct Connection {
    pub id: ConnectionId,
    tx: mpsc::Sender<String>,
    connected: AtomicBool,
    pub established_at: DateTime<Utc>,
}

impl Connection {
    fn new(id: ConnectionId, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            tx,
            connected: AtomicBool::new(true),
            established_at: Utc::now(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    /// Queue a text frame for the writer pump. At-most-once: a full or
    /// closed queue drops the frame and reports the failure.
    pub fn enqueue(&self, text: String) -> Result<(), PushError> {
        if !self.is_connected() {
            return Err(PushError::WriteFailed);
        }
        match self.tx.try_send(text) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!(
                    connection_id = %self.id,
                    msg_len = msg.len(),
                    "send queue full, dropping frame"
                );
                Err(PushError::WriteFailed)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PushError::WriteFailed),
        }
    }
}

/// In-memory mapping from connection identifier to its open socket.
///
/// Owned by the relay server and shared by `Arc`, never a process-wide
/// global, so multiple relay instances (e.g. under test) do not interfere.
/// Not persisted across restarts.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Arc<Connection>>,
    max_send_queue: usize,
}

impl ConnectionRegistry {
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            connections: DashMap::new(),
            max_send_queue,
        }
    }

    /// Insert or replace the entry for `id`, returning the connection and
    /// the receiver its writer pump drains.
    ///
    /// Replacement is last-writer-wins: the superseded socket is not closed
    /// and its pumps keep running until the peer goes away.
    pub fn register(&self, id: ConnectionId) -> (Arc<Connection>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        let conn = Arc::new(Connection::new(id.clone(), tx));
        if let Some(prev) = self.connections.insert(id.clone(), Arc::clone(&conn)) {
            if prev.is_connected() {
                tracing::warn!(connection_id = %id, "replacing live connection entry");
            }
        }
        (conn, rx)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(id).map(|e| Arc::clone(e.value()))
    }

    /// Idempotent; removing an absent id is a no-op.
    pub fn remove(&self, id: &ConnectionId) {
        if let Some((_, conn)) = self.connections.remove(id) {
            conn.mark_disconnected();
        }
    }

    /// Serialize-free delivery attempt: looks up the entry and queues the
    /// already-serialized text for its writer.
    pub fn send_to(&self, id: &ConnectionId, text: String) -> Result<(), PushError> {
        let conn = self.get(id).ok_or(PushError::NotFound)?;
        conn.enqueue(text)
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Identifiers of all currently registered connections.
    pub fn connection_ids(&self) -> Vec<String> {
        self.connections
            .iter()
            .map(|e| e.key().as_str().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ConnectionId {
        ConnectionId::from_raw(s)
    }

    #[test]
    fn register_and_remove() {
        let registry = ConnectionRegistry::new(32);
        assert_eq!(registry.count(), 0);

        let (_c1, _rx1) = registry.register(id("a"));
        let (_c2, _rx2) = registry.register(id("b"));
        assert_eq!(registry.count(), 2);

        registry.remove(&id("a"));
        assert_eq!(registry.count(), 1);
        assert!(registry.get(&id("a")).is_none());
        assert!(registry.get(&id("b")).is_some());
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = ConnectionRegistry::new(32);
        registry.remove(&id("never-registered"));
        let (_c, _rx) = registry.register(id("a"));
        registry.remove(&id("a"));
        registry.remove(&id("a"));
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn send_to_delivers_to_writer_queue() {
        let registry = ConnectionRegistry::new(32);
        let (_conn, mut rx) = registry.register(id("a"));

        registry.send_to(&id("a"), "hello".into()).unwrap();
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[test]
    fn send_to_unknown_id_is_not_found() {
        let registry = ConnectionRegistry::new(32);
        let err = registry.send_to(&id("ghost"), "x".into()).unwrap_err();
        assert_eq!(err, PushError::NotFound);
    }

    #[test]
    fn send_to_removed_id_is_not_found() {
        let registry = ConnectionRegistry::new(32);
        let (_c, _rx) = registry.register(id("a"));
        registry.remove(&id("a"));
        let err = registry.send_to(&id("a"), "x".into()).unwrap_err();
        assert_eq!(err, PushError::NotFound);
    }

    #[test]
    fn full_queue_reports_write_failed() {
        let registry = ConnectionRegistry::new(2);
        let (_c, _rx) = registry.register(id("a"));

        registry.send_to(&id("a"), "1".into()).unwrap();
        registry.send_to(&id("a"), "2".into()).unwrap();
        let err = registry.send_to(&id("a"), "3".into()).unwrap_err();
        assert_eq!(err, PushError::WriteFailed);
    }

    #[tokio::test]
    async fn reregistration_is_last_writer_wins() {
        let registry = ConnectionRegistry::new(32);
        let (first, mut first_rx) = registry.register(id("a"));
        let (_second, mut second_rx) = registry.register(id("a"));
        assert_eq!(registry.count(), 1);

        // Subsequent pushes land on the replacing entry.
        registry.send_to(&id("a"), "for-second".into()).unwrap();
        assert_eq!(second_rx.recv().await.unwrap(), "for-second");
        assert!(first_rx.try_recv().is_err());

        // The superseded connection is not closed by the replacement.
        assert!(first.is_connected());
        first.enqueue("still-open".into()).unwrap();
        assert_eq!(first_rx.recv().await.unwrap(), "still-open");
    }

    #[test]
    fn connection_ids_lists_open_connections() {
        let registry = ConnectionRegistry::new(32);
        let (_a, _rxa) = registry.register(id("a"));
        let (_b, _rxb) = registry.register(id("b"));

        let mut ids = registry.connection_ids();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn enqueue_after_mark_disconnected_fails() {
        let registry = ConnectionRegistry::new(32);
        let (conn, _rx) = registry.register(id("a"));
        conn.mark_disconnected();
        assert_eq!(conn.enqueue("x".into()).unwrap_err(), PushError::WriteFailed);
    }
}
