//! Error types for Peerbeam.
//!
//! This module provides a unified error type for all Peerbeam operations,
//! with specific error variants for different failure modes.

use std::io;

use thiserror::Error;

/// A specialized `Result` type for Peerbeam operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Peerbeam.
#[derive(Error, Debug)]
pub enum Error {
    /// Channel failed to open; nothing was sent (E001)
    #[error("failed to open channel to peer: {0}")]
    ConnectionFailed(String),

    /// Channel errored while a transfer was in flight (E002)
    #[error("connection lost during transfer: {0}")]
    ConnectionLost(String),

    /// Channel closed in an orderly way while a transfer was in flight (E003)
    #[error("channel closed with transfer in progress")]
    ChannelClosed,

    /// Inbound message violated the transfer protocol (E004)
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Sender-side failure reading the next slice of the source payload (E005)
    #[error("failed to read slice of '{name}': {source}")]
    LocalRead {
        /// Name of the payload being read
        name: String,
        /// Underlying I/O failure
        source: io::Error,
    },

    /// No peer registered under the given identifier
    #[error("peer '{0}' is not reachable")]
    PeerUnreachable(String),

    /// Malformed frame or unknown message type
    #[error("invalid protocol message: {0}")]
    ProtocolError(String),

    /// Invalid caller-supplied value
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Reason for invalidity
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Operation timeout
    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    /// Internal error (should not happen)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code associated with this error, if any.
    ///
    /// Error codes follow the pattern EXXX where XXX is a 3-digit number.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::ConnectionFailed(_) => Some("E001"),
            Self::ConnectionLost(_) => Some("E002"),
            Self::ChannelClosed => Some("E003"),
            Self::ProtocolViolation(_) => Some("E004"),
            Self::LocalRead { .. } => Some("E005"),
            _ => None,
        }
    }

    /// Returns whether the caller may respond to this error with a manual
    /// retry of the whole transfer.
    ///
    /// No error is retried automatically, and no partial-transfer state is
    /// kept; a retry always restarts from offset zero.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_)
                | Self::ConnectionLost(_)
                | Self::ChannelClosed
                | Self::ProtocolViolation(_)
                | Self::Timeout(_)
        )
    }
}
