//! Registry of browsers connected to the reload endpoint.
//!
//! The registry owns the membership set behind a single async mutex. Broadcast
//! holds that lock for the whole send pass, so a client that registers before
//! the broadcast takes the lock is notified and one that unregisters first is
//! not. Clients whose send fails are closed and dropped during the same pass.

use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Literal payload telling a browser to reload the page
pub const RELOAD_MESSAGE: &str = "reload";

/// Handle returned by [`ClientRegistry::register`]
pub type ClientId = u64;

/// Write half of a reload connection.
pub trait ReloadClient: Send + 'static {
    /// Send a text message to the browser.
    fn send(&mut self, message: &str) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection. Errors are ignored since the peer is already gone.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Concurrency-safe set of reload clients
pub struct ClientRegistry<C> {
    clients: Mutex<HashMap<ClientId, C>>,
    next_id: AtomicU64,
}

impl<C: ReloadClient> Default for ClientRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ReloadClient> ClientRegistry<C> {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a client; later broadcasts reach it
    pub async fn register(&self, client: C) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut clients = self.clients.lock().await;
        clients.insert(id, client);
        info!("Browser connected (total: {})", clients.len());
        id
    }

    /// Remove a client. Removing an absent client is a no-op.
    pub async fn unregister(&self, id: ClientId) -> Option<C> {
        let mut clients = self.clients.lock().await;
        let removed = clients.remove(&id);
        if removed.is_some() {
            info!("Browser disconnected (total: {})", clients.len());
        }
        removed
    }

    /// Send `message` to every client, pruning the ones that fail.
    ///
    /// Returns how many clients were notified successfully.
    pub async fn broadcast(&self, message: &str) -> usize {
        let mut clients = self.clients.lock().await;

        let mut failed = Vec::new();
        for (id, client) in clients.iter_mut() {
            if let Err(e) = client.send(message).await {
                warn!("Error notifying client {id}: {e}");
                failed.push(*id);
            }
        }

        for id in failed {
            if let Some(client) = clients.remove(&id) {
                client.close().await;
            }
        }

        info!("Notified {} browser(s) to reload", clients.len());
        clients.len()
    }

    /// Number of connected clients
    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Whether no client is connected
    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LiveServeError;
    use tokio::sync::mpsc;

    /// Client that forwards messages into a channel and fails once the receiver is gone
    struct ChannelClient(mpsc::UnboundedSender<String>);

    impl ReloadClient for ChannelClient {
        async fn send(&mut self, message: &str) -> Result<()> {
            self.0
                .send(message.to_string())
                .map_err(|_| LiveServeError::from("receiver dropped"))
        }

        async fn close(self) {}
    }

    fn client() -> (ChannelClient, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelClient(tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[tokio::test]
    async fn test_broadcast_reaches_registered_client() {
        let registry = ClientRegistry::new();
        let (a, mut rx) = client();

        registry.register(a).await;
        assert_eq!(registry.broadcast(RELOAD_MESSAGE).await, 1);

        assert_eq!(drain(&mut rx), vec!["reload"]);
    }

    #[tokio::test]
    async fn test_unregistered_client_gets_exactly_one_message() {
        let registry = ClientRegistry::new();
        let (a, mut rx) = client();

        let id = registry.register(a).await;
        registry.broadcast(RELOAD_MESSAGE).await;
        assert!(registry.unregister(id).await.is_some());
        registry.broadcast(RELOAD_MESSAGE).await;

        assert_eq!(drain(&mut rx), vec!["reload"]);
    }

    #[tokio::test]
    async fn test_unregister_absent_client_is_noop() {
        let registry: ClientRegistry<ChannelClient> = ClientRegistry::new();
        assert!(registry.unregister(42).await.is_none());

        let (a, _rx) = client();
        let id = registry.register(a).await;
        assert!(registry.unregister(id).await.is_some());
        assert!(registry.unregister(id).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_client_is_pruned() {
        let registry = ClientRegistry::new();
        let (alive, mut alive_rx) = client();
        let (dead, dead_rx) = client();
        drop(dead_rx);

        registry.register(alive).await;
        let dead_id = registry.register(dead).await;
        assert_eq!(registry.len().await, 2);

        assert_eq!(registry.broadcast(RELOAD_MESSAGE).await, 1);
        assert_eq!(registry.len().await, 1);
        assert!(registry.unregister(dead_id).await.is_none());
        assert_eq!(drain(&mut alive_rx), vec!["reload"]);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let registry = ClientRegistry::new();
        let (a, _rx_a) = client();
        let (b, _rx_b) = client();

        let id_a = registry.register(a).await;
        let id_b = registry.register(b).await;
        assert_ne!(id_a, id_b);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_then_broadcast() {
        let registry = std::sync::Arc::new(ClientRegistry::new());

        let mut tasks = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..100 {
            let (c, rx) = client();
            receivers.push(rx);
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move { registry.register(c).await }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.len().await, 100);
        assert_eq!(registry.broadcast(RELOAD_MESSAGE).await, 100);

        for mut rx in receivers {
            assert_eq!(drain(&mut rx), vec!["reload"]);
        }
    }
}
