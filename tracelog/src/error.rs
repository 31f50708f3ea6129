//! Error types for the tracelog record codec layer.

use thiserror::Error;

/// The main error type for all tracelog operations.
///
/// End-of-data is deliberately not represented here: decode operations
/// signal it by returning `Ok(None)`. Everything in this enum is terminal
/// for the record stream it occurred on.
#[derive(Error, Debug)]
pub enum TraceLogError {
    /// Error while decoding or encoding a module record.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Error in the module dump file layer.
    #[error("dump error: {0}")]
    Dump(#[from] DumpError),
}

/// Errors raised by the record codecs.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The declared module format version is 0 or newer than this build knows.
    #[error("unsupported {module} module version {version} (supported: 1..={supported})")]
    UnsupportedVersion {
        /// Name of the module whose stream carried the bad version.
        module: &'static str,
        /// The version number found in the log.
        version: u32,
        /// The highest version this build can decode.
        supported: u32,
    },

    /// A stage that had committed to a byte count got fewer bytes.
    ///
    /// Once an earlier field has promised `needed` bytes, a shorter read can
    /// no longer mean end-of-data; the stream position is unrecoverable.
    #[error("truncated {module} record: needed {needed} bytes, got {got}")]
    TruncatedRecord {
        /// Name of the module being decoded.
        module: &'static str,
        /// Bytes the current stage committed to reading.
        needed: usize,
        /// Bytes actually available.
        got: usize,
    },

    /// Growing the record's backing storage failed.
    #[error("failed to allocate {bytes} bytes of record storage")]
    Allocation {
        /// The allocation size that was refused.
        bytes: usize,
    },

    /// No codec is registered for the given module identifier.
    #[error("unknown module id {id}")]
    UnknownModule {
        /// The unrecognized raw module identifier.
        id: u16,
    },

    /// A codec was handed a record of another module's kind.
    #[error("{module} codec got a {found} record")]
    WrongRecordKind {
        /// The codec's own module name.
        module: &'static str,
        /// The module name of the record actually supplied.
        found: &'static str,
    },

    /// A record's OST id array disagrees with its components' stripe counts.
    ///
    /// The OST array length is never stored on the wire; it must equal the
    /// sum of stripe counts across components, so encoding a record that
    /// violates this would produce an undecodable byte stream.
    #[error("OST id count mismatch: components promise {expected}, record holds {actual}")]
    StripeCountMismatch {
        /// Sum of stripe counts across all components.
        expected: u64,
        /// Actual length of the record's OST id array.
        actual: u64,
    },

    /// The underlying stream reported an I/O error.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the module dump file format.
#[derive(Error, Debug)]
pub enum DumpError {
    /// The dump file could not be opened.
    #[error("failed to open dump '{path}': {source}")]
    Open {
        /// The path that could not be opened.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Memory mapping the dump file failed.
    #[error("memory mapping failed for dump '{path}': {source}")]
    Map {
        /// The path that could not be mapped.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the dump file failed.
    #[error("failed to write dump '{path}': {source}")]
    Write {
        /// The path that could not be written.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is too small to hold a dump header.
    #[error("dump '{path}' is too small: {len} bytes")]
    TooSmall {
        /// The offending file path.
        path: String,
        /// The actual file length.
        len: usize,
    },

    /// The file does not start with the dump magic bytes.
    #[error("dump '{path}' has invalid magic bytes {found:?}")]
    BadMagic {
        /// The offending file path.
        path: String,
        /// The bytes found where the magic was expected.
        found: [u8; 4],
    },

    /// The header's byte-order tag is neither little nor big endian.
    #[error("dump '{path}' has invalid byte-order tag {tag}")]
    BadOrderTag {
        /// The offending file path.
        path: String,
        /// The unrecognized tag value.
        tag: u8,
    },
}

/// Type alias for `Result<T, TraceLogError>`.
pub type Result<T> = std::result::Result<T, TraceLogError>;
