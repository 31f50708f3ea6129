//! Stream access traits at the container boundary.
//!
//! The container log format (block compression, header index, job metadata)
//! lives outside this crate. The codecs only need the narrow capabilities
//! defined here: read up to N bytes of one module's region, append an
//! exact-size record tagged with a format version, and query per-module
//! state (any data mapped, declared version, byte-order mismatch).
//!
//! Two in-memory implementations are provided for tests and for driving the
//! codecs from buffers; the file-backed implementation lives in
//! [`crate::dump`].

use std::io;

/// Read side of one module's region of a log.
///
/// A reader is already scoped to a single module; repeated [`read`] calls
/// walk that module's bytes from the current position.
///
/// [`read`]: ModuleReader::read
pub trait ModuleReader {
    /// Reads up to `buf.len()` bytes, returning how many were read.
    ///
    /// A return of 0 means end of data for this module.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error verbatim.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Whether any bytes at all are mapped for this module.
    fn has_data(&self) -> bool;

    /// The module format version declared by the log.
    fn version(&self) -> u32;

    /// Whether the log's declared byte order differs from the host's.
    fn needs_swap(&self) -> bool;
}

/// Write side: appends exact-size records tagged with a format version.
pub trait ModuleWriter {
    /// Appends one encoded record.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error verbatim.
    fn append(&mut self, record: &[u8], version: u32) -> io::Result<()>;
}

/// Fills `buf` from `reader`, stopping early only at end of data.
///
/// Returns the number of bytes read; anything short of `buf.len()` means
/// the module ran out of data mid-buffer.
pub(crate) fn read_fully<R: ModuleReader + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// In-memory reader over a byte slice.
#[derive(Debug)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
    version: u32,
    swap: bool,
}

impl<'a> SliceReader<'a> {
    /// Creates a reader over `data` declaring the given format version.
    #[must_use]
    pub fn new(data: &'a [u8], version: u32) -> Self {
        Self {
            data,
            pos: 0,
            version,
            swap: false,
        }
    }

    /// Marks the data as written in the opposite byte order to the host's.
    #[must_use]
    pub fn swapped(mut self) -> Self {
        self.swap = true;
        self
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl ModuleReader for SliceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn needs_swap(&self) -> bool {
        self.swap
    }
}

/// In-memory writer capturing appended records and their tagged version.
#[derive(Debug, Default)]
pub struct RecordSink {
    bytes: Vec<u8>,
    version: Option<u32>,
}

impl RecordSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All bytes appended so far.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The version the last appended record was tagged with.
    #[must_use]
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// Consumes the sink, returning the captured bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Re-reads the captured bytes as a module stream.
    #[must_use]
    pub fn as_reader(&self) -> SliceReader<'_> {
        SliceReader::new(&self.bytes, self.version.unwrap_or(0))
    }
}

impl ModuleWriter for RecordSink {
    fn append(&mut self, record: &[u8], version: u32) -> io::Result<()> {
        self.bytes.extend_from_slice(record);
        self.version = Some(version);
        Ok(())
    }
}
