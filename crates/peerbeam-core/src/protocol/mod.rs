//! Peerbeam wire protocol implementation.
//!
//! A transfer is exactly one metadata message followed by a sequence of
//! chunk messages. Chunks carry no index: ordering and completeness rely on
//! the channel delivering messages in send order, exactly once, and on
//! cumulative byte accounting against the announced size.
//!
//! ## Frame Format
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     Peerbeam Frame                         │
//! ├────────────┬────────────┬────────────┬─────────────────────┤
//! │   Magic    │  Version   │    Type    │      Length         │
//! │  4 bytes   │  2 bytes   │   1 byte   │      4 bytes        │
//! ├────────────┴────────────┴────────────┴─────────────────────┤
//! │                        Payload                             │
//! │                    (variable length)                       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! - Magic: `0x42 0x45 0x41 0x4D` ("BEAM")
//! - Version: `0x01 0x00` (1.0)
//! - Type: Message type byte
//! - Length: Payload length in bytes (big-endian)
//!
//! Metadata payloads are JSON; chunk payloads are the raw chunk bytes.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Protocol magic bytes: "BEAM"
pub const MAGIC: [u8; 4] = [0x42, 0x45, 0x41, 0x4D];

/// Frame header size in bytes
pub const HEADER_SIZE: usize = 11;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Message types in the Peerbeam protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Transfer metadata: file name and total size
    FileInfo = 0x01,
    /// One binary slice of the file
    FileChunk = 0x02,
}

impl MessageType {
    /// Parse a message type from a byte.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::FileInfo),
            0x02 => Some(Self::FileChunk),
            _ => None,
        }
    }

    /// The type's wire name, for logs and diagnostics.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::FileInfo => "file-info",
            Self::FileChunk => "file-chunk",
        }
    }
}

/// A protocol frame header.
#[derive(Debug, Clone)]
pub struct FrameHeader {
    /// Protocol version (major, minor)
    pub version: (u8, u8),
    /// Message type
    pub message_type: MessageType,
    /// Payload length
    pub payload_length: u32,
}

impl FrameHeader {
    /// Encode the header to bytes.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4] = self.version.0;
        buf[5] = self.version.1;
        buf[6] = self.message_type as u8;
        buf[7..11].copy_from_slice(&self.payload_length.to_be_bytes());
        buf
    }

    /// Decode a header from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is invalid.
    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Result<Self> {
        if buf[0..4] != MAGIC {
            return Err(Error::ProtocolError("invalid magic bytes".to_string()));
        }

        let version = (buf[4], buf[5]);

        let message_type = MessageType::from_byte(buf[6])
            .ok_or_else(|| Error::ProtocolError(format!("unknown message type: {:#x}", buf[6])))?;

        let payload_length = u32::from_be_bytes([buf[7], buf[8], buf[9], buf[10]]);

        if payload_length as usize > MAX_PAYLOAD_SIZE {
            return Err(Error::ProtocolError(format!(
                "payload too large: {payload_length} bytes"
            )));
        }

        Ok(Self {
            version,
            message_type,
            payload_length,
        })
    }
}

/// File info payload: announced once, before any chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfoPayload {
    /// File name
    pub name: String,
    /// Total size in bytes
    pub size: u64,
}

/// A protocol message.
///
/// The closed set of messages a channel may carry. Dispatch is an
/// exhaustive match, so adding a message type is a compile-checked change
/// at every consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Transfer metadata, sent exactly once before any chunk
    FileInfo(FileInfoPayload),
    /// One binary slice of the file, at most the negotiated chunk size
    FileChunk(Vec<u8>),
}

impl Message {
    /// The message's wire type.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::FileInfo(_) => MessageType::FileInfo,
            Self::FileChunk(_) => MessageType::FileChunk,
        }
    }
}

/// Encode a serializable payload to bytes.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_payload<T: Serialize>(payload: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(payload).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decode a payload from bytes.
///
/// # Errors
///
/// Returns an error if deserialization fails.
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode a message into a single frame.
///
/// # Errors
///
/// Returns an error if the payload cannot be serialized or exceeds
/// [`MAX_PAYLOAD_SIZE`].
pub fn encode_message(message: &Message) -> Result<Vec<u8>> {
    let payload = match message {
        Message::FileInfo(info) => encode_payload(info)?,
        Message::FileChunk(data) => data.clone(),
    };

    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::ProtocolError(format!(
            "payload too large: {} bytes",
            payload.len()
        )));
    }

    #[allow(clippy::cast_possible_truncation)]
    let header = FrameHeader {
        version: crate::PROTOCOL_VERSION,
        message_type: message.message_type(),
        payload_length: payload.len() as u32,
    };

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&header.encode());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode a message from a single frame.
///
/// # Errors
///
/// Returns an error if the frame is truncated, carries a bad header, or its
/// payload does not match the header's declared length.
pub fn decode_message(frame: &[u8]) -> Result<Message> {
    if frame.len() < HEADER_SIZE {
        return Err(Error::ProtocolError(format!(
            "frame too short: {} bytes",
            frame.len()
        )));
    }

    let mut header_buf = [0u8; HEADER_SIZE];
    header_buf.copy_from_slice(&frame[..HEADER_SIZE]);
    let header = FrameHeader::decode(&header_buf)?;

    let payload = &frame[HEADER_SIZE..];
    if payload.len() != header.payload_length as usize {
        return Err(Error::ProtocolError(format!(
            "payload length mismatch: header says {}, frame carries {}",
            header.payload_length,
            payload.len()
        )));
    }

    match header.message_type {
        MessageType::FileInfo => Ok(Message::FileInfo(decode_payload(payload)?)),
        MessageType::FileChunk => Ok(Message::FileChunk(payload.to_vec())),
    }
}
