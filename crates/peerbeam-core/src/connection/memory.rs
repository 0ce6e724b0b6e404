//! In-memory connection adapter.
//!
//! [`MemoryHub`] plays both external roles at once: the identity provider
//! (assigning a fresh [`PeerId`] to each registered endpoint) and the relay
//! (routing a connect request to the target endpoint's accept queue). Frames
//! cross a pair of bounded [`mpsc`] queues, which gives the in-order,
//! exactly-once delivery the protocol depends on, and makes a stalled
//! receiver suspend the sender once the queue fills.
//!
//! Messages are carried as encoded frames, not as in-process values, so the
//! wire codec is exercised on every hop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::connection::{Connector, PeerChannel};
use crate::error::{Error, Result};
use crate::identity::PeerId;
use crate::protocol::{self, Message};

/// Frames buffered per direction before `send` suspends.
pub const CHANNEL_CAPACITY: usize = 32;

/// Pending inbound channels buffered per endpoint.
const ACCEPT_BACKLOG: usize = 8;

type Registry = Arc<Mutex<HashMap<PeerId, mpsc::Sender<MemoryChannel>>>>;

/// In-process identity provider and frame relay.
#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    peers: Registry,
}

impl MemoryHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new endpoint, assigning it a fresh identifier.
    ///
    /// The returned endpoint accepts inbound channels until it is dropped;
    /// dropping it makes the identifier unreachable.
    #[must_use]
    pub fn register(&self) -> MemoryEndpoint {
        let id = PeerId::random();
        let (tx, rx) = mpsc::channel(ACCEPT_BACKLOG);

        self.peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), tx);

        tracing::debug!("Registered peer {id}");

        MemoryEndpoint { id, incoming: rx }
    }
}

impl Connector for MemoryHub {
    type Channel = MemoryChannel;

    async fn connect(&self, remote: &PeerId) -> Result<MemoryChannel> {
        let inbound = self
            .peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(remote)
            .cloned()
            .ok_or_else(|| Error::PeerUnreachable(remote.to_string()))?;

        let (near_tx, far_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (far_tx, near_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let far = MemoryChannel {
            tx: far_tx,
            rx: far_rx,
        };

        inbound
            .send(far)
            .await
            .map_err(|_| Error::PeerUnreachable(remote.to_string()))?;

        tracing::debug!("Opened channel to peer {remote}");

        Ok(MemoryChannel {
            tx: near_tx,
            rx: near_rx,
        })
    }
}

/// A registered endpoint: holds its assigned identifier and accepts inbound
/// channels.
#[derive(Debug)]
pub struct MemoryEndpoint {
    id: PeerId,
    incoming: mpsc::Receiver<MemoryChannel>,
}

impl MemoryEndpoint {
    /// The broker-assigned identifier for this endpoint.
    #[must_use]
    pub fn id(&self) -> &PeerId {
        &self.id
    }

    /// Accept the next inbound channel.
    ///
    /// Returns `None` once the hub and every connecting side are gone.
    pub async fn accept(&mut self) -> Option<MemoryChannel> {
        let channel = self.incoming.recv().await;
        if channel.is_some() {
            tracing::debug!("Peer {} accepted an inbound channel", self.id);
        }
        channel
    }
}

/// One end of an in-memory channel pair.
///
/// Dropping a `MemoryChannel` closes it: the peer drains whatever was
/// already queued and then observes an orderly close.
#[derive(Debug)]
pub struct MemoryChannel {
    tx: mpsc::Sender<Vec<u8>>,
    rx: mpsc::Receiver<Vec<u8>>,
}

impl PeerChannel for MemoryChannel {
    async fn send(&mut self, message: Message) -> Result<()> {
        let frame = protocol::encode_message(&message)?;
        self.tx
            .send(frame)
            .await
            .map_err(|_| Error::ConnectionLost("peer endpoint dropped".to_string()))
    }

    async fn recv(&mut self) -> Result<Option<Message>> {
        match self.rx.recv().await {
            None => Ok(None),
            Some(frame) => protocol::decode_message(&frame).map(Some),
        }
    }
}
