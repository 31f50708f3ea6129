//! # tracelog
//!
//! Record codec layer for an I/O-trace log format.
//!
//! tracelog decodes, encodes, prints, diffs, and aggregates the per-module
//! performance-counter records found in I/O trace logs: fixed-size counter
//! records (STDIO) and variable-length file layout records (LUSTRE). Records
//! are stored in the producing host's byte order and normalized on read;
//! older format versions are upgraded to the current in-memory shape during
//! decode.
//!
//! The container log format itself (compression, header index, job
//! metadata) is out of scope. The codecs run over the narrow [`stream`]
//! traits, and a minimal memory-mapped per-module [`dump`] file format is
//! provided for tooling and tests.
//!
//! ## Quick Start
//!
//! ```rust
//! use tracelog::lustre::{self, Component, CompCounter, LustreRecord};
//! use tracelog::record::BaseRecord;
//! use tracelog::stream::RecordSink;
//!
//! # fn main() -> tracelog::Result<()> {
//! // Build a single-component layout record striped over two OSTs.
//! let mut comp = Component::new();
//! comp.set_counter(CompCounter::StripeSize, 1 << 20);
//! comp.set_counter(CompCounter::StripeCount, 2);
//! comp.set_pool_name("flash");
//!
//! let mut rec = LustreRecord::new(BaseRecord { id: 0xabc, rank: 0 });
//! rec.push_component(comp, &[17, 23])?;
//!
//! // Encode it, then decode it back from the captured bytes.
//! let mut sink = RecordSink::new();
//! lustre::encode(&mut sink, &rec)?;
//! let decoded = lustre::decode(&mut sink.as_reader())?;
//! assert_eq!(decoded.as_ref(), Some(&rec));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`registry`] — Module id table and uniform codec dispatch
//! - [`lustre`] — Variable-length layout record codec
//! - [`stdio`] — Fixed-size counter record codec
//! - [`record`] — Record identity shared by all modules
//! - [`stream`] — Reader/writer traits at the container boundary
//! - [`dump`] — Memory-mapped per-module dump file format
//! - [`order`] — Byte-order normalization helpers
//! - [`error`] — Error types

pub mod dump;
pub mod error;
pub mod lustre;
pub mod order;
pub mod record;
pub mod registry;
pub mod stdio;
pub mod stream;

// Re-export primary API types at crate root for convenience.
pub use error::{CodecError, DumpError, Result, TraceLogError};
pub use record::{AGGREGATED_RANK, BaseRecord};
pub use registry::{ModuleCodec, ModuleId, ModuleRecord, lookup};
