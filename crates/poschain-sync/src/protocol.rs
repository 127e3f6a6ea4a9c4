//! Sync protocol state machine.
//!
//! [`SyncProtocol`] owns the node's [`Ledger`] and its joined topic. It runs
//! the bootstrap exchange once, then handles one inbound message at a time.
//! Nothing else writes to the ledger, so every append and replace is
//! serialized by whoever drives the protocol.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{timeout_at, Instant};

use poschain_core::{Block, RejectReason, Transaction};
use poschain_ledger::Ledger;

use crate::error::Result;
use crate::messages::{Envelope, MessageType, PeerId, SyncMessage};
use crate::transport::Topic;

/// Configuration for sync behavior.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Pause before bootstrap so the gossip mesh can form.
    pub settle_delay: Duration,
    /// How long to collect index responses.
    pub index_timeout: Duration,
    /// How long to wait for the chosen peer's chain.
    pub chain_timeout: Duration,
    /// Period of steady-state index re-checks; `None` disables them.
    pub resync_interval: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            index_timeout: Duration::from_secs(5),
            chain_timeout: Duration::from_secs(10),
            resync_interval: None,
        }
    }
}

/// Notification that a remote block was appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAccepted {
    /// Envelope sender of the announcement.
    pub sender_id: PeerId,
    /// Index of the appended block.
    pub index: u64,
    /// Human-readable transaction.
    pub transaction: String,
}

/// What handling one inbound message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Not addressed to us, self-originated, or unsolicited.
    Ignored,
    /// Payload failed to decode; dropped.
    Malformed,
    /// We answered with a message of this type.
    Replied(MessageType),
    /// An announced block was appended.
    Appended { index: u64 },
    /// A received chain replaced ours.
    Replaced { length: usize },
    /// We asked a peer with a longer chain for it.
    RequestedChain { from: PeerId },
    /// A longer chain was noted; a chain request is already in flight.
    Deferred { from: PeerId },
    /// The ledger refused the block or chain.
    Rejected(RejectReason),
}

/// How bootstrap ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// No other subscribers on the topic.
    NoPeers,
    /// Peers exist but none answered in time.
    NoReplies,
    /// No peer reported a longer chain.
    UpToDate,
    /// The chosen peer's chain was adopted.
    Adopted { length: usize },
    /// The chosen peer's chain failed validation or was not longer.
    Rejected(RejectReason),
    /// The chosen peer did not send its chain in time.
    ChainTimedOut,
}

/// Result of a bootstrap run.
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    /// Peer count seen when bootstrap started.
    pub peers_expected: usize,
    /// Distinct peers that answered the index request.
    pub responses: usize,
    /// Peer chosen as chain source, with the length it reported.
    pub chosen: Option<(PeerId, u64)>,
    /// Local chain length before and after bootstrap.
    pub length_before: usize,
    pub length_after: usize,
    pub outcome: BootstrapOutcome,
}

/// Protocol state for one node on one topic.
pub struct SyncProtocol<T: Topic> {
    /// The joined topic.
    topic: T,
    /// Our identity on the topic.
    local: PeerId,
    /// The only copy of the chain.
    ledger: Ledger,
    /// Configuration.
    config: SyncConfig,
    /// Accepted remote blocks, for the UI.
    events: mpsc::Sender<BlockAccepted>,
    /// Notifications dropped because the consumer lagged.
    dropped_events: u64,
    /// Outstanding chain request and the instant it is abandoned.
    chain_request: Option<(PeerId, Instant)>,
    /// Longest chain reported since the last chain request went out.
    best_known: Option<(PeerId, u64)>,
}

impl<T: Topic> SyncProtocol<T> {
    /// Create a protocol instance over an already joined topic.
    pub fn new(
        topic: T,
        local: PeerId,
        ledger: Ledger,
        config: SyncConfig,
        events: mpsc::Sender<BlockAccepted>,
    ) -> Self {
        Self {
            topic,
            local,
            ledger,
            config,
            events,
            dropped_events: 0,
            chain_request: None,
            best_known: None,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn topic(&self) -> &T {
        &self.topic
    }

    pub fn local_peer_id(&self) -> &PeerId {
        &self.local
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Count of block notifications dropped because the consumer lagged.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    /// Peers on the topic, sorted.
    pub async fn list_peers(&self) -> Result<Vec<PeerId>> {
        let mut peers = self.topic.list_peers().await?;
        peers.sort();
        Ok(peers)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bootstrap
    // ─────────────────────────────────────────────────────────────────────────

    /// Discover the longest chain among current peers and adopt it.
    ///
    /// Only transport failures are returned as errors; timeouts and rejected
    /// chains end bootstrap with the best chain available locally.
    pub async fn bootstrap(&mut self) -> Result<BootstrapReport> {
        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        let length_before = self.ledger.length();
        let mut report = BootstrapReport {
            peers_expected: 0,
            responses: 0,
            chosen: None,
            length_before,
            length_after: length_before,
            outcome: BootstrapOutcome::NoPeers,
        };

        let peers = self.topic.list_peers().await?;
        report.peers_expected = peers.len();
        self.request_indices().await?;
        if peers.is_empty() {
            tracing::info!("no peers on topic, starting from local chain");
            return Ok(report);
        }

        let replies = self.collect_indices(peers.len()).await?;
        report.responses = replies.len();

        let local = self.ledger.length() as u64;
        let best = choose_longest(&replies);
        tracing::info!(
            expected = peers.len(),
            replies = replies.len(),
            local,
            best = ?best,
            "index collection finished"
        );

        report.outcome = match best {
            None => BootstrapOutcome::NoReplies,
            Some((_, reported)) if reported <= local => BootstrapOutcome::UpToDate,
            Some((peer, reported)) => {
                report.chosen = Some((peer.clone(), reported));
                let outcome = self.fetch_chain_from(&peer).await?;
                self.chain_request = None;
                // A later reply may have reported an even longer chain.
                self.request_best_known().await?;
                outcome
            }
        };
        report.length_after = self.ledger.length();
        Ok(report)
    }

    /// Broadcast an index request.
    pub async fn request_indices(&self) -> Result<()> {
        self.send(None, &SyncMessage::IndexRequest).await
    }

    /// Periodic gap check.
    ///
    /// Follows up on the longest chain noted in the previous round, then asks
    /// every peer for its length again.
    pub async fn resync(&mut self) -> Result<()> {
        self.request_best_known().await?;
        self.request_indices().await
    }

    /// Peer with an unanswered chain request, if it has not timed out.
    pub fn pending_chain_request(&self) -> Option<&PeerId> {
        match &self.chain_request {
            Some((peer, deadline)) if Instant::now() < *deadline => Some(peer),
            _ => None,
        }
    }

    fn note_longer(&mut self, peer: PeerId, reported: u64) {
        if self
            .best_known
            .as_ref()
            .map_or(true, |(_, best)| reported > *best)
        {
            self.best_known = Some((peer, reported));
        }
    }

    /// Ask for the longest noted chain, unless a request is in flight or we
    /// have caught up with it.
    async fn request_best_known(&mut self) -> Result<Option<PeerId>> {
        if self.pending_chain_request().is_some() {
            return Ok(None);
        }
        if let Some((peer, _)) = self.chain_request.take() {
            tracing::debug!(peer = %peer, "chain request expired");
        }

        let local = self.ledger.length() as u64;
        match self.best_known.take() {
            Some((peer, reported)) if reported > local => {
                tracing::info!(peer = %peer, reported, local, "requesting longer chain");
                self.send(Some(&peer), &SyncMessage::ChainRequest).await?;
                let deadline = Instant::now() + self.config.chain_timeout;
                self.chain_request = Some((peer.clone(), deadline));
                Ok(Some(peer))
            }
            _ => Ok(None),
        }
    }

    /// Collect index responses until `expected` distinct peers answered or
    /// the index timeout elapses. Replies are returned in arrival order.
    async fn collect_indices(&mut self, expected: usize) -> Result<Vec<(PeerId, u64)>> {
        let deadline = Instant::now() + self.config.index_timeout;
        let mut replies: Vec<(PeerId, u64)> = Vec::new();

        while replies.len() < expected {
            let (from, bytes) = match timeout_at(deadline, self.topic.next_message()).await {
                Ok(received) => received?,
                Err(_) => {
                    tracing::warn!(
                        expected,
                        received = replies.len(),
                        "index collection timed out"
                    );
                    break;
                }
            };

            let envelope = match Envelope::from_bytes(&bytes) {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::warn!(peer = %from, "dropping message: {}", e);
                    continue;
                }
            };

            if envelope.kind == MessageType::IndexResponse
                && envelope.intended_receiver.as_ref() == Some(&self.local)
                && envelope.sender_id != self.local
            {
                match envelope.decode() {
                    Ok(SyncMessage::IndexResponse { latest_index }) => {
                        if replies.iter().all(|(peer, _)| peer != &envelope.sender_id) {
                            tracing::debug!(peer = %envelope.sender_id, latest_index, "index response");
                            replies.push((envelope.sender_id, latest_index));
                        }
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(peer = %from, "dropping index response: {}", e),
                }
                continue;
            }

            self.dispatch(from, envelope).await?;
        }

        Ok(replies)
    }

    /// Ask `peer` for its chain and try to adopt it.
    async fn fetch_chain_from(&mut self, peer: &PeerId) -> Result<BootstrapOutcome> {
        self.send(Some(peer), &SyncMessage::ChainRequest).await?;

        let deadline = Instant::now() + self.config.chain_timeout;
        self.chain_request = Some((peer.clone(), deadline));
        loop {
            let (from, bytes) = match timeout_at(deadline, self.topic.next_message()).await {
                Ok(received) => received?,
                Err(_) => {
                    tracing::warn!(peer = %peer, "timed out waiting for chain");
                    return Ok(BootstrapOutcome::ChainTimedOut);
                }
            };

            let envelope = match Envelope::from_bytes(&bytes) {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::warn!(peer = %from, "dropping message: {}", e);
                    continue;
                }
            };

            let from_chosen = envelope.kind == MessageType::ChainResponse
                && &envelope.sender_id == peer
                && envelope.intended_receiver.as_ref() == Some(&self.local);
            if !from_chosen {
                self.dispatch(from, envelope).await?;
                continue;
            }

            match envelope.decode() {
                Ok(SyncMessage::ChainResponse(blocks)) => {
                    return Ok(match self.ledger.replace_with(blocks) {
                        Ok(()) => BootstrapOutcome::Adopted {
                            length: self.ledger.length(),
                        },
                        Err(reason) => {
                            tracing::warn!(peer = %peer, "rejected bootstrap chain: {}", reason);
                            BootstrapOutcome::Rejected(reason)
                        }
                    });
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(peer = %peer, "dropping chain response: {}", e),
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Steady state
    // ─────────────────────────────────────────────────────────────────────────

    /// Handle one raw payload from the transport.
    ///
    /// Protocol-level problems are logged and absorbed; only transport
    /// failures while replying are returned.
    pub async fn handle_inbound(&mut self, from: PeerId, bytes: Bytes) -> Result<Dispatch> {
        match Envelope::from_bytes(&bytes) {
            Ok(envelope) => self.dispatch(from, envelope).await,
            Err(e) => {
                tracing::warn!(peer = %from, "dropping message: {}", e);
                Ok(Dispatch::Malformed)
            }
        }
    }

    async fn dispatch(&mut self, from: PeerId, envelope: Envelope) -> Result<Dispatch> {
        if !envelope.is_for(&self.local) {
            return Ok(Dispatch::Ignored);
        }
        // Our own broadcasts come back to us; they were applied at publish time.
        if from == self.local || envelope.sender_id == self.local {
            return Ok(Dispatch::Ignored);
        }

        let message = match envelope.decode() {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(peer = %from, "dropping message: {}", e);
                return Ok(Dispatch::Malformed);
            }
        };
        if message.is_targeted() && envelope.is_broadcast() {
            return Ok(Dispatch::Ignored);
        }
        let sender = envelope.sender_id;

        match message {
            SyncMessage::IndexRequest => {
                let latest_index = self.ledger.length() as u64;
                self.send(Some(&sender), &SyncMessage::IndexResponse { latest_index })
                    .await?;
                tracing::debug!(peer = %sender, latest_index, "answered index request");
                Ok(Dispatch::Replied(MessageType::IndexResponse))
            }

            SyncMessage::IndexResponse { latest_index } => {
                if latest_index <= self.ledger.length() as u64 {
                    return Ok(Dispatch::Ignored);
                }
                self.note_longer(sender.clone(), latest_index);
                match self.request_best_known().await? {
                    Some(peer) => Ok(Dispatch::RequestedChain { from: peer }),
                    None => {
                        tracing::debug!(peer = %sender, latest_index, "chain request in flight, noted");
                        Ok(Dispatch::Deferred { from: sender })
                    }
                }
            }

            SyncMessage::BlockAnnounce(block) => {
                let index = block.index;
                let transaction = block.transaction.to_string();
                match self.ledger.append(block) {
                    Ok(()) => {
                        self.emit(BlockAccepted {
                            sender_id: sender,
                            index,
                            transaction,
                        });
                        Ok(Dispatch::Appended { index })
                    }
                    Err(reason) => {
                        tracing::debug!(peer = %sender, index, "dropped announced block: {}", reason);
                        Ok(Dispatch::Rejected(reason))
                    }
                }
            }

            SyncMessage::ChainRequest => {
                let chain = self.ledger.snapshot_chain();
                let length = chain.len();
                self.send(Some(&sender), &SyncMessage::ChainResponse(chain))
                    .await?;
                tracing::debug!(peer = %sender, length, "sent chain");
                Ok(Dispatch::Replied(MessageType::ChainResponse))
            }

            SyncMessage::ChainResponse(blocks) => {
                let result = match self.ledger.replace_with(blocks) {
                    Ok(()) => Dispatch::Replaced {
                        length: self.ledger.length(),
                    },
                    Err(reason) => {
                        tracing::warn!(peer = %sender, "rejected chain: {}", reason);
                        Dispatch::Rejected(reason)
                    }
                };
                if matches!(&self.chain_request, Some((peer, _)) if *peer == sender) {
                    self.chain_request = None;
                    self.request_best_known().await?;
                }
                Ok(result)
            }
        }
    }

    /// Record a local transaction and announce it.
    ///
    /// The block is appended locally before broadcast; the echo that comes
    /// back over the topic is ignored as self-originated.
    pub async fn publish(&mut self, transaction: Transaction) -> Result<Block> {
        let block = Block::successor(
            self.ledger.current_head(),
            transaction,
            now_millis().to_string(),
        );
        self.ledger.append(block.clone())?;
        self.send(None, &SyncMessage::BlockAnnounce(block.clone()))
            .await?;
        tracing::debug!(index = block.index, "published block");
        Ok(block)
    }

    fn emit(&mut self, event: BlockAccepted) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped_events += 1;
                tracing::debug!(
                    index = event.index,
                    dropped = self.dropped_events,
                    "event consumer lagging, notification dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    async fn send(&self, receiver: Option<&PeerId>, message: &SyncMessage) -> Result<()> {
        let envelope = Envelope::new(self.local.clone(), receiver.cloned(), message)?;
        self.topic.publish(envelope.to_bytes()?).await
    }
}

/// Strictly greatest reported length; ties go to the earliest reply.
fn choose_longest(replies: &[(PeerId, u64)]) -> Option<(PeerId, u64)> {
    let mut best: Option<&(PeerId, u64)> = None;
    for reply in replies {
        if best.map_or(true, |(_, length)| reply.1 > *length) {
            best = Some(reply);
        }
    }
    best.cloned()
}

/// Get current time in milliseconds.
fn now_millis() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
