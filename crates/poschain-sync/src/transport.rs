//! Transport abstraction for the sync protocol.
//!
//! The protocol only needs a gossip topic: publish bytes to every current
//! subscriber, receive the next delivered payload, and enumerate peers.
//! Implementations may sit on libp2p gossipsub or anything with the same
//! delivery model. Delivery may be reordered or duplicated but never
//! corrupted, and a publisher receives its own messages back.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::SyncError;
use crate::messages::PeerId;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// A pub/sub transport that can join named topics.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Handle to a joined topic.
    type Topic: Topic;

    /// The local node's identity.
    fn local_peer_id(&self) -> PeerId;

    /// Join (and subscribe to) a topic.
    async fn join(&self, topic: &str) -> Result<Self::Topic>;
}

/// A joined gossip topic.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Topic: Send + Sync + 'static {
    /// Publish a payload to all current subscribers, including ourselves.
    async fn publish(&self, data: Bytes) -> Result<()>;

    /// Receive the next payload delivered on this topic.
    ///
    /// Returns the transport-level sender identity and the raw bytes.
    /// Fails with [`SyncError::TransportClosed`] once the subscription ends.
    /// Must be cancel-safe: dropping the future loses no message.
    async fn next_message(&self) -> Result<(PeerId, Bytes)>;

    /// Peers currently subscribed to the topic, excluding ourselves.
    async fn list_peers(&self) -> Result<Vec<PeerId>>;
}

/// A simple in-memory gossip network for testing.
///
/// Every subscriber of a topic has a bounded inbox. Publishing never blocks:
/// a full inbox drops the message, as a congested gossip mesh would.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{mpsc, Mutex, RwLock};

    /// Per-subscriber inbox capacity.
    pub const INBOX_CAPACITY: usize = 1024;

    type Inbox = mpsc::Sender<(PeerId, Bytes)>;

    /// Shared state for the memory network.
    pub struct MemoryNetwork {
        /// topic name -> subscriber -> inbox.
        topics: RwLock<HashMap<String, HashMap<PeerId, Inbox>>>,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Create a transport for `peer` attached to this network.
        pub fn transport(self: &Arc<Self>, peer: PeerId) -> MemoryTransport {
            MemoryTransport {
                peer,
                network: Arc::clone(self),
            }
        }

        /// Drop every subscription held by `peer`.
        ///
        /// The peer's topics report [`SyncError::TransportClosed`] once their
        /// inboxes drain.
        pub async fn disconnect(&self, peer: &PeerId) {
            let mut topics = self.topics.write().await;
            for subscribers in topics.values_mut() {
                subscribers.remove(peer);
            }
        }

        /// Current subscribers of a topic.
        pub async fn subscribers(&self, topic: &str) -> Vec<PeerId> {
            let topics = self.topics.read().await;
            topics
                .get(topic)
                .map(|subs| subs.keys().cloned().collect())
                .unwrap_or_default()
        }
    }

    impl Default for MemoryNetwork {
        fn default() -> Self {
            Self {
                topics: RwLock::new(HashMap::new()),
            }
        }
    }

    /// In-memory transport for one peer.
    pub struct MemoryTransport {
        peer: PeerId,
        network: Arc<MemoryNetwork>,
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        type Topic = MemoryTopic;

        fn local_peer_id(&self) -> PeerId {
            self.peer.clone()
        }

        async fn join(&self, topic: &str) -> Result<MemoryTopic> {
            let (tx, rx) = mpsc::channel(INBOX_CAPACITY);

            let mut topics = self.network.topics.write().await;
            let subscribers = topics.entry(topic.to_string()).or_default();
            if subscribers.contains_key(&self.peer) {
                return Err(SyncError::Transport(format!(
                    "{} already joined {}",
                    self.peer, topic
                )));
            }
            subscribers.insert(self.peer.clone(), tx);

            Ok(MemoryTopic {
                name: topic.to_string(),
                peer: self.peer.clone(),
                network: Arc::clone(&self.network),
                inbox: Mutex::new(rx),
            })
        }
    }

    /// A joined in-memory topic.
    pub struct MemoryTopic {
        name: String,
        peer: PeerId,
        network: Arc<MemoryNetwork>,
        inbox: Mutex<mpsc::Receiver<(PeerId, Bytes)>>,
    }

    impl MemoryTopic {
        /// Topic name.
        pub fn name(&self) -> &str {
            &self.name
        }
    }

    #[async_trait]
    impl Topic for MemoryTopic {
        async fn publish(&self, data: Bytes) -> Result<()> {
            let topics = self.network.topics.read().await;
            let subscribers = topics
                .get(&self.name)
                .filter(|subs| subs.contains_key(&self.peer))
                .ok_or(SyncError::TransportClosed)?;

            for (peer, inbox) in subscribers {
                if inbox.try_send((self.peer.clone(), data.clone())).is_err() {
                    tracing::warn!(topic = %self.name, to = %peer, "inbox unavailable, message dropped");
                }
            }
            Ok(())
        }

        async fn next_message(&self) -> Result<(PeerId, Bytes)> {
            let mut inbox = self.inbox.lock().await;
            inbox.recv().await.ok_or(SyncError::TransportClosed)
        }

        async fn list_peers(&self) -> Result<Vec<PeerId>> {
            let topics = self.network.topics.read().await;
            Ok(topics
                .get(&self.name)
                .map(|subs| subs.keys().filter(|p| *p != &self.peer).cloned().collect())
                .unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryNetwork;
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers_including_self() {
        let network = MemoryNetwork::new();
        let a = network.transport(PeerId::new("a")).join("t").await.unwrap();
        let b = network.transport(PeerId::new("b")).join("t").await.unwrap();

        a.publish(Bytes::from_static(b"hello")).await.unwrap();

        let (from_b, data_b) = b.next_message().await.unwrap();
        let (from_a, data_a) = a.next_message().await.unwrap();
        assert_eq!(from_b, PeerId::new("a"));
        assert_eq!(from_a, PeerId::new("a"));
        assert_eq!(data_a, data_b);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let network = MemoryNetwork::new();
        let a = network.transport(PeerId::new("a")).join("one").await.unwrap();
        let b = network.transport(PeerId::new("b")).join("two").await.unwrap();

        a.publish(Bytes::from_static(b"x")).await.unwrap();
        assert!(b.list_peers().await.unwrap().is_empty());

        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(50), b.next_message()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_list_peers_excludes_self() {
        let network = MemoryNetwork::new();
        let a = network.transport(PeerId::new("a")).join("t").await.unwrap();
        let _b = network.transport(PeerId::new("b")).join("t").await.unwrap();
        let _c = network.transport(PeerId::new("c")).join("t").await.unwrap();

        let mut peers = a.list_peers().await.unwrap();
        peers.sort();
        assert_eq!(peers, vec![PeerId::new("b"), PeerId::new("c")]);
    }

    #[tokio::test]
    async fn test_double_join_rejected() {
        let network = MemoryNetwork::new();
        let transport = network.transport(PeerId::new("a"));
        let _topic = transport.join("t").await.unwrap();
        assert!(matches!(
            transport.join("t").await,
            Err(SyncError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_disconnect_closes_topic() {
        let network = MemoryNetwork::new();
        let a = network.transport(PeerId::new("a")).join("t").await.unwrap();

        network.disconnect(&PeerId::new("a")).await;

        assert!(matches!(
            a.next_message().await,
            Err(SyncError::TransportClosed)
        ));
        assert!(matches!(
            a.publish(Bytes::from_static(b"x")).await,
            Err(SyncError::TransportClosed)
        ));
    }
}
