//! Payload sources, chunking, and received artifacts.
//!
//! The chunk codec is deliberately dumb: [`ChunkReader`] slices a payload
//! into at-most-`chunk_size` pieces driven by an offset cursor, and
//! [`join_chunks`] concatenates slices back in arrival order. Everything
//! about ordering and completeness lives in the transfer sessions.
//!
//! Payloads can live in memory or on disk. Disk sources are read one slice
//! at a time, so a transfer never holds more than the active slice plus
//! whatever the channel has buffered.

use std::path::{Path, PathBuf};

use tokio::io::AsyncReadExt;

use crate::error::{Error, Result};

/// Where a payload's bytes come from.
#[derive(Debug)]
enum PayloadSource {
    /// Bytes already resident in memory
    Memory(Vec<u8>),
    /// A file on disk, opened lazily when chunking begins
    Disk(PathBuf),
}

/// A named binary payload queued for sending.
#[derive(Debug)]
pub struct FilePayload {
    /// File name announced to the receiver
    name: String,
    /// Total size in bytes
    size: u64,
    /// Backing bytes
    source: PayloadSource,
}

impl FilePayload {
    /// Create a payload from bytes already in memory.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            source: PayloadSource::Memory(bytes),
        }
    }

    /// Create a payload backed by a file on disk.
    ///
    /// Only metadata is read here; the content is sliced lazily during the
    /// transfer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file's metadata cannot be read or the path
    /// has no usable file name.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;

        if !metadata.is_file() {
            return Err(Error::InvalidInput(format!(
                "not a regular file: {}",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidInput(format!("no file name in {}", path.display())))?
            .to_string();

        Ok(Self {
            name,
            size: metadata.len(),
            source: PayloadSource::Disk(path.to_path_buf()),
        })
    }

    /// Get the file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the total size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }
}

/// Number of chunks a payload of `size` bytes splits into.
///
/// Zero-byte payloads split into zero chunks. `chunk_size` must be
/// positive.
#[must_use]
pub fn chunk_count(size: u64, chunk_size: usize) -> u64 {
    size.div_ceil(chunk_size as u64)
}

/// Concatenate slices in arrival order into one payload.
#[must_use]
pub fn join_chunks(chunks: &[Vec<u8>]) -> Vec<u8> {
    let total: usize = chunks.iter().map(Vec::len).sum();
    let mut joined = Vec::with_capacity(total);
    for chunk in chunks {
        joined.extend_from_slice(chunk);
    }
    joined
}

/// Lazy splitter over a payload.
///
/// Produces `chunk_count(size, chunk_size)` slices, each `chunk_size` bytes
/// except a smaller final slice. Each call to [`next_chunk`] materializes
/// exactly one slice from the current offset; the reader never looks ahead.
///
/// [`next_chunk`]: ChunkReader::next_chunk
#[derive(Debug)]
pub struct ChunkReader<'a> {
    /// Payload name, for error reporting
    name: &'a str,
    /// Slice size ceiling
    chunk_size: usize,
    /// Total payload size
    size: u64,
    /// Cursor: bytes already produced
    offset: u64,
    /// Open source handle
    source: ReaderSource<'a>,
}

#[derive(Debug)]
enum ReaderSource<'a> {
    Memory(&'a [u8]),
    Disk(tokio::fs::File),
}

impl<'a> ChunkReader<'a> {
    /// Open a reader over a payload.
    ///
    /// # Errors
    ///
    /// Returns an error if `chunk_size` is zero or a disk-backed payload
    /// cannot be opened.
    pub async fn open(payload: &'a FilePayload, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidInput("chunk size must be positive".to_string()));
        }

        let source = match &payload.source {
            PayloadSource::Memory(bytes) => ReaderSource::Memory(bytes.as_slice()),
            PayloadSource::Disk(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| Error::LocalRead {
                    name: payload.name.clone(),
                    source: e,
                })?;
                ReaderSource::Disk(file)
            }
        };

        Ok(Self {
            name: &payload.name,
            chunk_size,
            size: payload.size,
            offset: 0,
            source,
        })
    }

    /// Read the next slice, or `None` once the payload is wholly consumed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocalRead`] if a disk source fails mid-read.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.offset >= self.size {
            return Ok(None);
        }

        #[allow(clippy::cast_possible_truncation)]
        let len = (self.size - self.offset).min(self.chunk_size as u64) as usize;

        let chunk = match &mut self.source {
            ReaderSource::Memory(bytes) => {
                #[allow(clippy::cast_possible_truncation)]
                let start = self.offset as usize;
                bytes[start..start + len].to_vec()
            }
            ReaderSource::Disk(file) => {
                let mut buffer = vec![0u8; len];
                file.read_exact(&mut buffer)
                    .await
                    .map_err(|e| Error::LocalRead {
                        name: self.name.to_string(),
                        source: e,
                    })?;
                buffer
            }
        };

        self.offset += len as u64;
        Ok(Some(chunk))
    }

    /// Bytes produced so far.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Total payload size.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }
}

/// A fully reassembled inbound transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    /// File name announced by the sender
    name: String,
    /// Reassembled content
    bytes: Vec<u8>,
}

impl ReceivedFile {
    /// Assemble a received file from its buffered chunks.
    #[must_use]
    pub(crate) fn assemble(name: String, chunks: &[Vec<u8>]) -> Self {
        Self {
            name,
            bytes: join_chunks(chunks),
        }
    }

    /// The file name announced by the sender.
    ///
    /// Untrusted input: sanitize before using it as a path (see
    /// [`write_to`](Self::write_to)).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of the reassembled content in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// The reassembled content.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the artifact, returning its content.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the artifact into a directory, using the sanitized announced
    /// name.
    ///
    /// # Errors
    ///
    /// Returns an error if the announced name sanitizes to nothing or the
    /// write fails.
    pub async fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let file_name = sanitize_file_name(&self.name)
            .ok_or_else(|| Error::InvalidInput(format!("unusable file name '{}'", self.name)))?;

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, &self.bytes).await?;

        tracing::info!("Wrote received file to {}", path.display());
        Ok(path)
    }
}

/// Reduce an announced file name to a bare, traversal-free component.
///
/// Directory parts, `.` and `..` are stripped; returns `None` when nothing
/// usable remains.
#[must_use]
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let candidate = Path::new(name).file_name().and_then(|n| n.to_str())?;
    if candidate.is_empty() {
        None
    } else {
        Some(candidate.to_string())
    }
}

/// Format a file size for display.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
