//! The node session: one task that owns the protocol and the ledger.
//!
//! [`NodeSession::start`] joins the topic and spawns the session task. The
//! task bootstraps, then serves handle commands and inbound gossip one at a
//! time until shutdown. Callers only ever see the ledger through
//! [`NodeHandle`] queries, which the task answers between messages.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::Instrument;

use poschain_core::{Block, CardId, Transaction};
use poschain_ledger::Ledger;
use poschain_sync::{BlockAccepted, PeerId, SyncError, SyncProtocol, Topic, Transport};

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Discovering and adopting the longest chain.
    Bootstrapping,
    /// Serving gossip and local commands.
    Steady,
    /// The session task has ended.
    Stopped,
}

enum Command {
    Publish {
        transaction: Transaction,
        reply: oneshot::Sender<Result<Block>>,
    },
    Balance {
        card: CardId,
        reply: oneshot::Sender<i64>,
    },
    Peers {
        reply: oneshot::Sender<Result<Vec<PeerId>>>,
    },
    Length {
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<Block>>,
    },
    Export {
        reply: oneshot::Sender<String>,
    },
    Shutdown,
}

enum Flow {
    Continue,
    Stop,
}

/// A running node on one topic.
pub struct NodeSession<T: Topic> {
    protocol: SyncProtocol<T>,
    commands: mpsc::Receiver<Command>,
    state: watch::Sender<NodeState>,
}

impl<T: Topic> NodeSession<T> {
    /// Join `config.topic` with a fresh genesis ledger and start the session.
    pub async fn start<Tr>(
        transport: &Tr,
        config: NodeConfig,
    ) -> Result<(NodeHandle, mpsc::Receiver<BlockAccepted>)>
    where
        Tr: Transport<Topic = T>,
    {
        Self::start_with_ledger(transport, config, Ledger::new()).await
    }

    /// Join `config.topic` and start the session from an existing ledger.
    ///
    /// Failing to join the topic is the only startup error; everything after
    /// that happens on the session task.
    pub async fn start_with_ledger<Tr>(
        transport: &Tr,
        config: NodeConfig,
        ledger: Ledger,
    ) -> Result<(NodeHandle, mpsc::Receiver<BlockAccepted>)>
    where
        Tr: Transport<Topic = T>,
    {
        let peer_id = transport.local_peer_id();
        let topic = transport.join(&config.topic).await?;
        tracing::info!(peer = %peer_id, topic = %config.topic, "joined topic");

        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(NodeState::Bootstrapping);

        let protocol = SyncProtocol::new(topic, peer_id.clone(), ledger, config.sync, event_tx);
        let session = NodeSession {
            protocol,
            commands: command_rx,
            state: state_tx,
        };

        let span = tracing::info_span!("node", peer = %peer_id.short());
        let task = tokio::spawn(session.run().instrument(span));

        let handle = NodeHandle {
            peer_id,
            commands: command_tx,
            state: state_rx,
            task: Arc::new(Mutex::new(Some(task))),
        };
        Ok((handle, event_rx))
    }

    async fn run(mut self) -> Result<()> {
        let result = self.drive().await;
        if let Err(e) = &result {
            tracing::error!("session ended: {}", e);
        }
        self.state.send_replace(NodeState::Stopped);
        tracing::info!("session stopped");
        result
    }

    async fn drive(&mut self) -> Result<()> {
        let mut deferred = VecDeque::new();

        // Queries wait until bootstrap settles the chain; shutdown does not.
        tokio::select! {
            report = self.protocol.bootstrap() => {
                let report = report?;
                tracing::info!(
                    peers = report.peers_expected,
                    responses = report.responses,
                    length = report.length_after,
                    outcome = ?report.outcome,
                    "bootstrap finished"
                );
            }
            _ = defer_until_shutdown(&mut self.commands, &mut deferred) => {
                tracing::info!("shutdown requested during bootstrap");
                return Ok(());
            }
        }

        self.state.send_replace(NodeState::Steady);

        while let Some(command) = deferred.pop_front() {
            if let Flow::Stop = self.handle_command(command).await {
                return Ok(());
            }
        }

        let mut resync = self.protocol.config().resync_interval.map(|period| {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        tracing::info!("all handles dropped");
                        return Ok(());
                    };
                    if let Flow::Stop = self.handle_command(command).await {
                        return Ok(());
                    }
                }
                received = self.protocol.topic().next_message() => {
                    let (from, bytes) = received?;
                    self.protocol.handle_inbound(from, bytes).await?;
                }
                _ = tick(&mut resync) => {
                    tracing::debug!("periodic index check");
                    self.protocol.resync().await?;
                }
            }
        }
    }

    async fn handle_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Publish { transaction, reply } => {
                match self.protocol.publish(transaction).await {
                    Ok(block) => {
                        let _ = reply.send(Ok(block));
                    }
                    Err(e) if e.is_transport_failure() => {
                        tracing::error!("publish failed, stopping: {}", e);
                        let _ = reply.send(Err(e.into()));
                        return Flow::Stop;
                    }
                    Err(SyncError::Rejected(reason)) => {
                        let _ = reply.send(Err(NodeError::Rejected(reason)));
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e.into()));
                    }
                }
            }
            Command::Balance { card, reply } => {
                let _ = reply.send(self.protocol.ledger().balance_of(card));
            }
            Command::Peers { reply } => {
                let peers = self.protocol.list_peers().await.map_err(NodeError::from);
                let _ = reply.send(peers);
            }
            Command::Length { reply } => {
                let _ = reply.send(self.protocol.ledger().length());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.protocol.ledger().snapshot_chain());
            }
            Command::Export { reply } => {
                let _ = reply.send(self.protocol.ledger().export());
            }
            Command::Shutdown => {
                tracing::info!("shutdown requested");
                return Flow::Stop;
            }
        }
        Flow::Continue
    }
}

/// Queue commands until a shutdown arrives or every handle is dropped.
async fn defer_until_shutdown(
    commands: &mut mpsc::Receiver<Command>,
    deferred: &mut VecDeque<Command>,
) {
    loop {
        match commands.recv().await {
            Some(Command::Shutdown) | None => return,
            Some(command) => deferred.push_back(command),
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Cloneable handle to a running session.
///
/// Every method is answered by the session task. Once the session has
/// stopped they fail with [`NodeError::Stopped`].
#[derive(Clone)]
pub struct NodeHandle {
    peer_id: PeerId,
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<NodeState>,
    task: Arc<Mutex<Option<JoinHandle<Result<()>>>>>,
}

impl NodeHandle {
    /// This node's identity on the topic.
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Record a transaction as a new block and announce it.
    pub async fn publish(&self, transaction: Transaction) -> Result<Block> {
        self.request(|reply| Command::Publish { transaction, reply })
            .await?
    }

    /// Current balance of `card`.
    pub async fn balance_of(&self, card: impl Into<CardId>) -> Result<i64> {
        let card = card.into();
        self.request(|reply| Command::Balance { card, reply }).await
    }

    /// Other subscribers of the topic, sorted.
    pub async fn list_peers(&self) -> Result<Vec<PeerId>> {
        self.request(|reply| Command::Peers { reply }).await?
    }

    /// Number of blocks, genesis included.
    pub async fn chain_length(&self) -> Result<usize> {
        self.request(|reply| Command::Length { reply }).await
    }

    /// Copy of the current chain.
    pub async fn snapshot_chain(&self) -> Result<Vec<Block>> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Human-readable dump of the current chain.
    pub async fn export_chain(&self) -> Result<String> {
        self.request(|reply| Command::Export { reply }).await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> NodeState {
        *self.state.borrow()
    }

    /// Wait until the session reaches `target`.
    pub async fn wait_for_state(&self, target: NodeState) -> Result<()> {
        let mut state = self.state.clone();
        state
            .wait_for(|current| *current == target)
            .await
            .map(|_| ())
            .map_err(|_| NodeError::Stopped)
    }

    /// Stop the session and wait for its task to finish.
    ///
    /// Returns the task's own result: an error here means the session had
    /// already ended on a transport failure. Calling it again is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        let _ = self.commands.send(Command::Shutdown).await;

        let task = self.task.lock().await.take();
        match task {
            Some(task) => task
                .await
                .map_err(|e| NodeError::TaskFailed(e.to_string()))?,
            None => Ok(()),
        }
    }

    async fn request<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> Command) -> Result<R> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| NodeError::Stopped)?;
        response.await.map_err(|_| NodeError::Stopped)
    }
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle")
            .field("peer_id", &self.peer_id)
            .field("state", &self.state())
            .finish()
    }
}
