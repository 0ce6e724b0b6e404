//! # Peerbeam Core Library
//!
//! `peerbeam-core` implements a peer-to-peer chunked file transfer protocol
//! on top of a generic ordered, reliable, message-oriented peer channel.
//!
//! ## Features
//!
//! - **Two-message protocol**: one metadata message announcing file name and
//!   size, followed by a stream of bounded binary chunks
//! - **Streaming chunker**: slices are produced on demand from an offset
//!   cursor, so large files never need to be resident in memory at once
//! - **Explicit state machines**: sender and receiver lifecycles are driven
//!   by discrete events and observable through a progress channel
//! - **Pluggable transport**: any adapter that can deliver messages in send
//!   order, exactly once, can carry a transfer; an in-memory hub is included
//!
//! ## Modules
//!
//! - [`connection`] - Channel and connector traits plus the in-memory adapter
//! - [`error`] - Unified error type
//! - [`mod@file`] - Payload sources, chunking, and received artifacts
//! - [`identity`] - Broker-assigned peer identifiers
//! - [`protocol`] - Wire messages and frame codec
//! - [`transfer`] - Send and receive session state machines
//!
//! ## Example
//!
//! ```rust,ignore
//! use peerbeam_core::connection::memory::MemoryHub;
//! use peerbeam_core::file::FilePayload;
//! use peerbeam_core::transfer::{ReceiveSession, SendSession, TransferConfig};
//!
//! let hub = MemoryHub::new();
//! let mut receiver_end = hub.register();
//!
//! // Sender side: connect by peer id and stream the file.
//! let payload = FilePayload::from_bytes("notes.txt", b"hello".to_vec());
//! let mut sender = SendSession::new(payload, TransferConfig::default())?;
//! sender.send(&hub, &receiver_end.id().clone()).await?;
//!
//! // Receiver side: accept the connection and reassemble.
//! let channel = receiver_end.accept().await.unwrap();
//! let mut receiver = ReceiveSession::new(channel, TransferConfig::default());
//! let file = receiver.recv().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(async_fn_in_trait)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod connection;
pub mod error;
pub mod file;
pub mod identity;
pub mod protocol;
pub mod transfer;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol version for the wire format
pub const PROTOCOL_VERSION: (u8, u8) = (1, 0);

/// Default chunk size for file transfers (16 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;
