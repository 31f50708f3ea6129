//! Module dump file format.
//!
//! A dump holds one module's raw record bytes outside a container log:
//! a small self-describing header followed by concatenated records exactly
//! as the codecs encode them. The CLI and integration tests read and write
//! dumps; the container log format itself is out of scope for this crate.
//!
//! # File Format
//!
//! ```text
//! [0..4)    Magic bytes "TLRD"
//! [4]       Payload byte-order tag (1 = little endian, 2 = big endian)
//! [5]       Padding (zero)
//! [6..8)    Module id (u16, little endian)
//! [8..12)   Module format version (u32, little endian)
//! [12..16)  Reserved (zero)
//! [16..)    Concatenated raw records
//! ```
//!
//! Header scalars are always little endian; the byte-order tag describes
//! only the record payload.

use std::fs::{File, OpenOptions};
use std::io::{self, Write as _};
use std::path::Path;

use memmap2::Mmap;

use crate::error::{DumpError, Result};
use crate::stream::{ModuleReader, ModuleWriter};

/// Magic bytes identifying a tracelog module dump.
pub const DUMP_MAGIC: [u8; 4] = *b"TLRD";

/// Size of the dump header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Byte-order tag for little-endian record payloads.
const ORDER_LITTLE: u8 = 1;
/// Byte-order tag for big-endian record payloads.
const ORDER_BIG: u8 = 2;

/// The byte-order tag matching this host.
fn host_order_tag() -> u8 {
    if cfg!(target_endian = "big") {
        ORDER_BIG
    } else {
        ORDER_LITTLE
    }
}

/// Writer that accumulates encoded records and produces a dump file.
///
/// Records are buffered in memory; the header (including the version the
/// records were tagged with) is only known complete at [`finish`] time.
///
/// [`finish`]: ModuleDump::finish
#[derive(Debug)]
pub struct ModuleDump {
    path: String,
    module: u16,
    version: u32,
    payload: Vec<u8>,
}

impl ModuleDump {
    /// Starts a new dump for the given module. No file is touched until
    /// [`finish`](Self::finish).
    #[must_use]
    pub fn create<P: AsRef<Path>>(path: P, module: u16) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().into_owned(),
            module,
            version: 0,
            payload: Vec::new(),
        }
    }

    /// Writes the header and accumulated payload to disk.
    ///
    /// # Errors
    ///
    /// Returns [`DumpError::Write`] if the file cannot be created or written.
    pub fn finish(self) -> Result<()> {
        let map_err = |source: io::Error| DumpError::Write {
            path: self.path.clone(),
            source,
        };

        let mut header = [0u8; HEADER_SIZE];
        header[0..4].copy_from_slice(&DUMP_MAGIC);
        header[4] = host_order_tag();
        header[6..8].copy_from_slice(&self.module.to_le_bytes());
        header[8..12].copy_from_slice(&self.version.to_le_bytes());

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&self.path)
            .map_err(map_err)?;
        file.write_all(&header).map_err(map_err)?;
        file.write_all(&self.payload).map_err(map_err)?;
        file.sync_all().map_err(map_err)?;

        Ok(())
    }
}

impl ModuleWriter for ModuleDump {
    fn append(&mut self, record: &[u8], version: u32) -> io::Result<()> {
        self.payload.extend_from_slice(record);
        self.version = version;
        Ok(())
    }
}

/// Memory-mapped read view of a module dump.
///
/// The header is validated up front; reads then walk the payload without
/// copying the file into memory first.
#[derive(Debug)]
pub struct MappedModule {
    mmap: Mmap,
    module: u16,
    version: u32,
    swap: bool,
    pos: usize,
}

impl MappedModule {
    /// Opens and validates an existing dump file.
    ///
    /// # Errors
    ///
    /// Returns [`DumpError`] if the file cannot be opened or mapped, is too
    /// small for a header, or carries invalid magic or byte-order bytes.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().into_owned();

        let file = File::open(path.as_ref()).map_err(|source| DumpError::Open {
            path: path_str.clone(),
            source,
        })?;

        // SAFETY: The mapping is read-only and backed by a file we just
        // opened; no mutable aliasing is possible through this handle.
        let mmap = unsafe {
            Mmap::map(&file).map_err(|source| DumpError::Map {
                path: path_str.clone(),
                source,
            })?
        };

        if mmap.len() < HEADER_SIZE {
            return Err(DumpError::TooSmall {
                path: path_str,
                len: mmap.len(),
            }
            .into());
        }

        if mmap[0..4] != DUMP_MAGIC {
            let mut found = [0u8; 4];
            found.copy_from_slice(&mmap[0..4]);
            return Err(DumpError::BadMagic {
                path: path_str,
                found,
            }
            .into());
        }

        let order_tag = mmap[4];
        if order_tag != ORDER_LITTLE && order_tag != ORDER_BIG {
            return Err(DumpError::BadOrderTag {
                path: path_str,
                tag: order_tag,
            }
            .into());
        }

        let module = u16::from_le_bytes([mmap[6], mmap[7]]);
        let version = u32::from_le_bytes([mmap[8], mmap[9], mmap[10], mmap[11]]);
        let swap = order_tag != host_order_tag();

        Ok(Self {
            mmap,
            module,
            version,
            swap,
            pos: HEADER_SIZE,
        })
    }

    /// The raw module id recorded in the header.
    #[must_use]
    pub fn module(&self) -> u16 {
        self.module
    }

    /// The module format version recorded in the header.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Total payload size in bytes.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.mmap.len() - HEADER_SIZE
    }
}

impl ModuleReader for MappedModule {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.mmap.len() - self.pos);
        buf[..n].copy_from_slice(&self.mmap[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn has_data(&self) -> bool {
        self.payload_len() > 0
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn needs_swap(&self) -> bool {
        self.swap
    }
}
