//! File transfer engine for Peerbeam.
//!
//! Two cooperating roles run the same protocol over one bidirectional
//! message channel per transfer:
//!
//! - [`SendSession`] connects to a remote peer, announces the file, then
//!   streams chunks strictly one at a time
//! - [`ReceiveSession`] consumes inbound messages and reassembles the
//!   announced file
//!
//! ## Transfer Protocol
//!
//! - One metadata message precedes the chunks of every transfer
//! - Default chunk size: 16 KiB, the last chunk may be smaller
//! - One chunk in flight: the next slice is read only after the previous
//!   send completed
//! - Completion is byte-count equality against the announced size
//! - No automatic retry; a failed transfer restarts from offset zero

pub mod machine;

pub use machine::ReceiverMachine;

use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::connection::{Connector, PeerChannel};
use crate::error::{Error, Result};
use crate::file::{chunk_count, format_size, ChunkReader, FilePayload, ReceivedFile};
use crate::identity::PeerId;
use crate::protocol::{FileInfoPayload, Message, MAX_PAYLOAD_SIZE};

/// Lifecycle phase of a transfer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    /// Nothing started yet
    Idle,
    /// Waiting for the channel to open (sender only)
    Connecting,
    /// Channel open, metadata not yet exchanged
    Open,
    /// Metadata exchanged, chunks moving
    Transferring,
    /// Transfer finished, all bytes accounted for
    Completed,
    /// Transfer aborted by an error
    Failed,
    /// Channel closed with no transfer in progress
    Closed,
}

impl TransferPhase {
    /// Whether this phase ends the session.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Closed)
    }
}

/// Progress information for a transfer.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    /// Current phase
    pub phase: TransferPhase,
    /// File name (empty on the receiver until metadata arrives)
    pub file_name: String,
    /// Bytes sent or received so far
    pub bytes_transferred: u64,
    /// Announced total size
    pub total_bytes: u64,
    /// Transfer speed in bytes per second
    pub speed_bps: u64,
    /// Estimated time remaining
    pub eta: Option<Duration>,
    /// When the transfer started
    pub started_at: Instant,
}

impl TransferProgress {
    /// Create a new progress record.
    #[must_use]
    pub fn new(file_name: String, total_bytes: u64) -> Self {
        Self {
            phase: TransferPhase::Idle,
            file_name,
            bytes_transferred: 0,
            total_bytes,
            speed_bps: 0,
            eta: None,
            started_at: Instant::now(),
        }
    }

    /// Get overall progress as a percentage (0.0 - 100.0).
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            100.0
        } else {
            (self.bytes_transferred as f64 / self.total_bytes as f64) * 100.0
        }
    }
}

/// Configuration for a transfer session.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Chunk size in bytes
    pub chunk_size: usize,
    /// How long the sender waits for the channel to open
    pub connect_timeout: Duration,
    /// How long the receiver waits between messages of an active transfer
    pub receive_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::DEFAULT_CHUNK_SIZE,
            connect_timeout: Duration::from_secs(15),
            receive_timeout: Duration::from_secs(30),
        }
    }
}

impl TransferConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig {
                key: "chunk_size".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.chunk_size > MAX_PAYLOAD_SIZE {
            return Err(Error::InvalidConfig {
                key: "chunk_size".to_string(),
                reason: format!("must not exceed {MAX_PAYLOAD_SIZE} bytes"),
            });
        }
        Ok(())
    }
}

/// A send session (sender side).
///
/// Owns the payload and drives one outbound transfer at a time. A failed
/// transfer keeps the session usable: calling [`send`](Self::send) again
/// restarts from offset zero.
#[derive(Debug)]
pub struct SendSession {
    /// Payload being sent
    payload: FilePayload,
    /// Transfer configuration
    config: TransferConfig,
    /// Progress sender
    progress_tx: watch::Sender<TransferProgress>,
    /// Progress receiver (for cloning to observers)
    progress_rx: watch::Receiver<TransferProgress>,
}

impl SendSession {
    /// Create a new send session.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(payload: FilePayload, config: TransferConfig) -> Result<Self> {
        config.validate()?;

        let progress = TransferProgress::new(payload.name().to_string(), payload.size());
        let (progress_tx, progress_rx) = watch::channel(progress);

        Ok(Self {
            payload,
            config,
            progress_tx,
            progress_rx,
        })
    }

    /// Get the payload queued for sending.
    #[must_use]
    pub fn payload(&self) -> &FilePayload {
        &self.payload
    }

    /// Get a progress receiver.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<TransferProgress> {
        self.progress_rx.clone()
    }

    /// Connect to `remote` and transfer the whole payload.
    ///
    /// One metadata message is sent before any chunk; chunk production is
    /// strictly sequential, so at most one slice is in flight at any time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`] if the channel never opens (and
    /// nothing was sent), [`Error::ConnectionLost`] or the adapter's error
    /// if the channel dies mid-transfer, and [`Error::LocalRead`] if the
    /// source cannot produce the next slice. All failures leave the final
    /// progress value in [`TransferPhase::Failed`].
    pub async fn send<C: Connector>(&mut self, connector: &C, remote: &PeerId) -> Result<()> {
        let outcome = self.run(connector, remote).await;
        if let Err(e) = &outcome {
            tracing::warn!("Transfer of '{}' failed: {e}", self.payload.name());
            self.update_phase(TransferPhase::Failed);
        }
        outcome
    }

    async fn run<C: Connector>(&self, connector: &C, remote: &PeerId) -> Result<()> {
        self.reset_progress();
        self.update_phase(TransferPhase::Connecting);

        tracing::info!(
            "Connecting to peer {remote} to send '{}' ({})",
            self.payload.name(),
            format_size(self.payload.size())
        );

        let connect = tokio::time::timeout(self.config.connect_timeout, connector.connect(remote));
        let mut channel = match connect.await {
            Ok(Ok(channel)) => channel,
            Ok(Err(e)) => return Err(Error::ConnectionFailed(e.to_string())),
            Err(_) => {
                return Err(Error::ConnectionFailed(format!(
                    "connect timed out after {} seconds",
                    self.config.connect_timeout.as_secs()
                )))
            }
        };

        self.update_phase(TransferPhase::Open);

        // Metadata goes out before the first chunk, unconditionally.
        channel
            .send(Message::FileInfo(FileInfoPayload {
                name: self.payload.name().to_string(),
                size: self.payload.size(),
            }))
            .await?;

        self.update_phase(TransferPhase::Transferring);

        let mut reader = ChunkReader::open(&self.payload, self.config.chunk_size).await?;
        while let Some(chunk) = reader.next_chunk().await? {
            channel.send(Message::FileChunk(chunk)).await?;
            self.record_bytes(reader.offset());
        }

        tracing::info!(
            "Sent '{}': {} bytes in {} chunks",
            self.payload.name(),
            self.payload.size(),
            chunk_count(self.payload.size(), self.config.chunk_size)
        );

        self.update_phase(TransferPhase::Completed);
        Ok(())
    }

    fn reset_progress(&self) {
        let _ = self.progress_tx.send(TransferProgress::new(
            self.payload.name().to_string(),
            self.payload.size(),
        ));
    }

    fn update_phase(&self, phase: TransferPhase) {
        let mut progress = self.progress_rx.borrow().clone();
        progress.phase = phase;
        let _ = self.progress_tx.send(progress);
    }

    fn record_bytes(&self, bytes_transferred: u64) {
        let mut progress = self.progress_rx.borrow().clone();
        progress.bytes_transferred = bytes_transferred;

        let elapsed = progress.started_at.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                progress.speed_bps = (bytes_transferred as f64 / elapsed) as u64;
            }
            let remaining = progress.total_bytes.saturating_sub(bytes_transferred);
            if progress.speed_bps > 0 {
                progress.eta = Some(Duration::from_secs(remaining / progress.speed_bps));
            }
        }

        let _ = self.progress_tx.send(progress);
    }
}

/// A receive session (receiver side).
///
/// Wraps an already-open channel (the receiver starts at
/// [`TransferPhase::Open`]) and reassembles one transfer per
/// [`recv`](Self::recv) call.
#[derive(Debug)]
pub struct ReceiveSession<C> {
    /// Inbound channel
    channel: C,
    /// Transfer configuration
    config: TransferConfig,
    /// Protocol state machine
    machine: ReceiverMachine,
    /// Progress sender
    progress_tx: watch::Sender<TransferProgress>,
    /// Progress receiver
    progress_rx: watch::Receiver<TransferProgress>,
}

impl<C: PeerChannel> ReceiveSession<C> {
    /// Create a receive session over an open channel.
    #[must_use]
    pub fn new(channel: C, config: TransferConfig) -> Self {
        let mut progress = TransferProgress::new(String::new(), 0);
        progress.phase = TransferPhase::Open;
        let (progress_tx, progress_rx) = watch::channel(progress);

        Self {
            channel,
            config,
            machine: ReceiverMachine::new(),
            progress_tx,
            progress_rx,
        }
    }

    /// Get a progress receiver.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<TransferProgress> {
        self.progress_rx.clone()
    }

    /// Receive one complete transfer.
    ///
    /// Waits indefinitely for a transfer to be announced, then applies
    /// `receive_timeout` between the messages of the active transfer.
    /// Returns `Ok(None)` if the peer closes the channel while no transfer
    /// is in progress. May be called repeatedly to receive sequential
    /// transfers over the same channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the channel closes mid-transfer,
    /// [`Error::ProtocolViolation`] for out-of-protocol messages, and the
    /// adapter's error if the channel itself fails. Partially received data
    /// is discarded; the final progress value keeps the partial byte count
    /// for diagnostics only.
    pub async fn recv(&mut self) -> Result<Option<ReceivedFile>> {
        let outcome = self.run().await;
        match &outcome {
            Ok(Some(_)) => {}
            Ok(None) => self.update_phase(TransferPhase::Closed),
            Err(e) => {
                tracing::warn!("Inbound transfer failed: {e}");
                self.update_phase(TransferPhase::Failed);
            }
        }
        outcome
    }

    async fn run(&mut self) -> Result<Option<ReceivedFile>> {
        loop {
            let inbound = if self.machine.is_receiving() {
                let deadline = self.config.receive_timeout;
                match tokio::time::timeout(deadline, self.channel.recv()).await {
                    Ok(inbound) => inbound,
                    Err(_) => return Err(Error::Timeout(deadline.as_secs())),
                }
            } else {
                self.channel.recv().await
            };

            let message = match inbound {
                Ok(Some(message)) => message,
                Ok(None) => {
                    if self.machine.is_receiving() {
                        return Err(Error::ChannelClosed);
                    }
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };

            if let Message::FileInfo(info) = &message {
                self.begin_transfer(info);
            }

            if let Some(file) = self.machine.on_message(message)? {
                self.finish_transfer(&file);
                return Ok(Some(file));
            }

            self.record_bytes(self.machine.bytes_received());
        }
    }

    fn begin_transfer(&self, info: &FileInfoPayload) {
        tracing::info!(
            "Incoming transfer: '{}' ({})",
            info.name,
            format_size(info.size)
        );

        let mut progress = TransferProgress::new(info.name.clone(), info.size);
        progress.phase = TransferPhase::Transferring;
        let _ = self.progress_tx.send(progress);
    }

    fn finish_transfer(&self, file: &ReceivedFile) {
        let mut progress = self.progress_rx.borrow().clone();
        progress.bytes_transferred = file.size();
        progress.phase = TransferPhase::Completed;
        progress.eta = None;
        let _ = self.progress_tx.send(progress);

        tracing::info!("Received '{}' ({} bytes)", file.name(), file.size());
    }

    fn update_phase(&self, phase: TransferPhase) {
        let mut progress = self.progress_rx.borrow().clone();
        progress.phase = phase;
        let _ = self.progress_tx.send(progress);
    }

    fn record_bytes(&self, bytes_transferred: u64) {
        let mut progress = self.progress_rx.borrow().clone();
        progress.bytes_transferred = bytes_transferred;

        let elapsed = progress.started_at.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                progress.speed_bps = (bytes_transferred as f64 / elapsed) as u64;
            }
            let remaining = progress.total_bytes.saturating_sub(bytes_transferred);
            if progress.speed_bps > 0 {
                progress.eta = Some(Duration::from_secs(remaining / progress.speed_bps));
            }
        }

        let _ = self.progress_tx.send(progress);
    }
}
