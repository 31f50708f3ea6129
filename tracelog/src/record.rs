//! Record identity shared by every module record kind.

use std::io::{self, Write};

use serde::Serialize;

use crate::order;

/// Producer rank sentinel meaning "aggregated across all ranks".
pub const AGGREGATED_RANK: i64 = -1;

/// The identity pair carried by every record in the log.
///
/// On the wire this is two consecutive 64-bit words: the record identifier
/// followed by the producer rank. A record is immutable once decoded; the
/// only mutation the library itself performs is collapsing the rank to
/// [`AGGREGATED_RANK`] during aggregation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BaseRecord {
    /// 64-bit record identifier (typically a hashed file name).
    pub id: u64,
    /// Rank of the producing process, or [`AGGREGATED_RANK`].
    pub rank: i64,
}

impl BaseRecord {
    /// Wire size of the identity pair in bytes.
    pub const WIRE_SIZE: usize = 16;

    /// Decodes a base record from the first 16 bytes of `buf`.
    ///
    /// # Panics
    ///
    /// Panics if `buf` holds fewer than [`Self::WIRE_SIZE`] bytes.
    #[must_use]
    pub fn from_wire(buf: &[u8], swap: bool) -> Self {
        Self {
            id: order::read_u64(buf, 0, swap),
            rank: order::read_i64(buf, 8, swap),
        }
    }

    /// Appends the identity pair to `out` in native byte order.
    pub fn write_wire(&self, out: &mut Vec<u8>) {
        order::push_u64(out, self.id);
        order::push_i64(out, self.rank);
    }
}

/// Writes one integer counter line: module, rank, id, counter name, value.
pub(crate) fn counter_line(
    out: &mut dyn Write,
    module: &str,
    base: &BaseRecord,
    name: &str,
    value: i64,
) -> io::Result<()> {
    writeln!(out, "{module}\t{}\t{}\t{name}\t{value}", base.rank, base.id)
}

/// Writes one floating-point counter line.
pub(crate) fn fcounter_line(
    out: &mut dyn Write,
    module: &str,
    base: &BaseRecord,
    name: &str,
    value: f64,
) -> io::Result<()> {
    writeln!(out, "{module}\t{}\t{}\t{name}\t{value}", base.rank, base.id)
}

/// Writes one string-valued counter line.
pub(crate) fn scounter_line(
    out: &mut dyn Write,
    module: &str,
    base: &BaseRecord,
    name: &str,
    value: &str,
) -> io::Result<()> {
    writeln!(out, "{module}\t{}\t{}\t{name}\t{value}", base.rank, base.id)
}
