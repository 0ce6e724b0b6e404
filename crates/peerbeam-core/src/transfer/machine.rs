//! Receiver-side protocol state machine.
//!
//! [`ReceiverMachine`] consumes inbound messages and nothing else: no
//! channel, no clock, no task. The session layer owns the I/O loop and
//! feeds the machine one message at a time, which keeps every transition
//! testable without a transport.

use std::mem;

use crate::error::{Error, Result};
use crate::file::ReceivedFile;
use crate::protocol::{FileInfoPayload, Message};

/// Receiver state for one channel.
#[derive(Debug, Default)]
enum State {
    /// No transfer announced
    #[default]
    Idle,
    /// Metadata seen, accumulating chunks
    Receiving {
        name: String,
        total_size: u64,
        buffered: Vec<Vec<u8>>,
        bytes_received: u64,
    },
}

/// The receiving half of the transfer protocol, as a pure state machine.
///
/// Exactly one metadata message precedes the chunks of a transfer; chunks
/// are accounted cumulatively against the announced size and the artifact
/// is assembled only when the two are equal. A chunk with no transfer in
/// progress is a protocol violation: it is rejected, never merged into
/// stale state, and the machine resets so a later metadata message can
/// start cleanly.
#[derive(Debug, Default)]
pub struct ReceiverMachine {
    state: State,
}

impl ReceiverMachine {
    /// Create a machine with no transfer in progress.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transfer is currently in progress.
    #[must_use]
    pub const fn is_receiving(&self) -> bool {
        matches!(self.state, State::Receiving { .. })
    }

    /// The announced file name of the transfer in progress, if any.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match &self.state {
            State::Idle => None,
            State::Receiving { name, .. } => Some(name),
        }
    }

    /// The announced total size of the transfer in progress, if any.
    #[must_use]
    pub const fn total_size(&self) -> Option<u64> {
        match &self.state {
            State::Idle => None,
            State::Receiving { total_size, .. } => Some(*total_size),
        }
    }

    /// Bytes received for the transfer in progress (zero when idle).
    #[must_use]
    pub const fn bytes_received(&self) -> u64 {
        match &self.state {
            State::Idle => 0,
            State::Receiving { bytes_received, .. } => *bytes_received,
        }
    }

    /// Feed one inbound message.
    ///
    /// Returns the reassembled file when this message completes a
    /// transfer; the machine is then idle again and ready for the next
    /// metadata message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] for a chunk with no transfer
    /// in progress (none announced, or arriving after completion) or a
    /// chunk that would overflow the announced size. The machine resets to
    /// idle, so the violation is recoverable at the session level.
    pub fn on_message(&mut self, message: Message) -> Result<Option<ReceivedFile>> {
        match message {
            Message::FileInfo(info) => Ok(self.on_file_info(info)),
            Message::FileChunk(data) => self.on_file_chunk(data),
        }
    }

    fn on_file_info(&mut self, info: FileInfoPayload) -> Option<ReceivedFile> {
        if self.is_receiving() {
            tracing::warn!(
                "Metadata for '{}' arrived mid-transfer; abandoning partial state",
                info.name
            );
        }

        tracing::debug!("Receiving '{}' ({} bytes)", info.name, info.size);

        // A zero-byte transfer has no chunks to wait for.
        if info.size == 0 {
            self.state = State::Idle;
            return Some(ReceivedFile::assemble(info.name, &[]));
        }

        self.state = State::Receiving {
            name: info.name,
            total_size: info.size,
            buffered: Vec::new(),
            bytes_received: 0,
        };
        None
    }

    fn on_file_chunk(&mut self, data: Vec<u8>) -> Result<Option<ReceivedFile>> {
        match mem::take(&mut self.state) {
            State::Idle => Err(Error::ProtocolViolation(
                "chunk with no transfer in progress".to_string(),
            )),
            State::Receiving {
                name,
                total_size,
                mut buffered,
                mut bytes_received,
            } => {
                let len = data.len() as u64;
                if bytes_received + len > total_size {
                    return Err(Error::ProtocolViolation(format!(
                        "chunk overflows announced size: {} + {len} > {total_size}",
                        bytes_received
                    )));
                }

                buffered.push(data);
                bytes_received += len;

                if bytes_received == total_size {
                    tracing::debug!("Completed '{name}' ({total_size} bytes)");
                    return Ok(Some(ReceivedFile::assemble(name, &buffered)));
                }

                self.state = State::Receiving {
                    name,
                    total_size,
                    buffered,
                    bytes_received,
                };
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, size: u64) -> Message {
        Message::FileInfo(FileInfoPayload {
            name: name.to_string(),
            size,
        })
    }

    #[test]
    fn test_metadata_then_chunks_completes_once() {
        let mut machine = ReceiverMachine::new();

        assert!(machine.on_message(info("data.bin", 5)).expect("info").is_none());
        assert!(machine.is_receiving());
        assert_eq!(machine.total_size(), Some(5));

        assert!(machine
            .on_message(Message::FileChunk(vec![1, 2, 3]))
            .expect("chunk")
            .is_none());
        assert_eq!(machine.bytes_received(), 3);

        let file = machine
            .on_message(Message::FileChunk(vec![4, 5]))
            .expect("chunk")
            .expect("complete");

        assert_eq!(file.name(), "data.bin");
        assert_eq!(file.bytes(), &[1, 2, 3, 4, 5]);
        assert!(!machine.is_receiving());
        assert_eq!(machine.bytes_received(), 0);
    }

    #[test]
    fn test_zero_size_completes_on_metadata() {
        let mut machine = ReceiverMachine::new();

        let file = machine
            .on_message(info("empty.txt", 0))
            .expect("info")
            .expect("immediate completion");

        assert_eq!(file.name(), "empty.txt");
        assert!(file.bytes().is_empty());
        assert!(!machine.is_receiving());
    }

    #[test]
    fn test_chunk_before_metadata_rejected() {
        let mut machine = ReceiverMachine::new();

        let result = machine.on_message(Message::FileChunk(vec![0; 16]));
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));

        // The machine stays usable: a fresh transfer can begin.
        assert!(machine.on_message(info("next.bin", 1)).expect("info").is_none());
        assert!(machine.is_receiving());
    }

    #[test]
    fn test_chunk_after_completion_rejected() {
        let mut machine = ReceiverMachine::new();

        machine.on_message(info("done.bin", 2)).expect("info");
        machine
            .on_message(Message::FileChunk(vec![7, 7]))
            .expect("chunk")
            .expect("complete");

        let result = machine.on_message(Message::FileChunk(vec![9]));
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));
    }

    #[test]
    fn test_overflowing_chunk_rejected_and_resets() {
        let mut machine = ReceiverMachine::new();

        machine.on_message(info("small.bin", 4)).expect("info");
        machine
            .on_message(Message::FileChunk(vec![1, 2, 3]))
            .expect("chunk");

        let result = machine.on_message(Message::FileChunk(vec![4, 5]));
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));

        assert!(!machine.is_receiving());
        assert_eq!(machine.bytes_received(), 0);
    }

    #[test]
    fn test_metadata_mid_transfer_resets_state() {
        let mut machine = ReceiverMachine::new();

        machine.on_message(info("first.bin", 100)).expect("info");
        machine
            .on_message(Message::FileChunk(vec![0; 10]))
            .expect("chunk");

        // A new announcement abandons the partial transfer.
        machine.on_message(info("second.bin", 2)).expect("info");
        assert_eq!(machine.file_name(), Some("second.bin"));
        assert_eq!(machine.bytes_received(), 0);

        let file = machine
            .on_message(Message::FileChunk(vec![8, 9]))
            .expect("chunk")
            .expect("complete");
        assert_eq!(file.name(), "second.bin");
        assert_eq!(file.bytes(), &[8, 9]);
    }

    #[test]
    fn test_sequential_transfers() {
        let mut machine = ReceiverMachine::new();

        for round in 0..3u8 {
            machine.on_message(info(&format!("file-{round}"), 1)).expect("info");
            let file = machine
                .on_message(Message::FileChunk(vec![round]))
                .expect("chunk")
                .expect("complete");
            assert_eq!(file.name(), format!("file-{round}"));
            assert_eq!(file.bytes(), &[round]);
        }
    }

    #[test]
    fn test_byte_accounting_is_exact() {
        let mut machine = ReceiverMachine::new();

        machine.on_message(info("exact.bin", 40_000)).expect("info");

        machine
            .on_message(Message::FileChunk(vec![0; 16384]))
            .expect("chunk");
        assert_eq!(machine.bytes_received(), 16384);

        machine
            .on_message(Message::FileChunk(vec![0; 16384]))
            .expect("chunk");
        assert_eq!(machine.bytes_received(), 32768);

        let file = machine
            .on_message(Message::FileChunk(vec![0; 7232]))
            .expect("chunk")
            .expect("complete");
        assert_eq!(file.size(), 40_000);
    }
}
