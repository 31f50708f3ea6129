//! Fixed-size record codec for the STDIO module.
//!
//! STDIO records count buffered-stream operations (`fopen`, `fread`,
//! `fwrite`, ...) per file per rank. Every record is exactly
//! [`STDIO_WIRE_SIZE`] bytes: the base identity pair, then the integer
//! counters, then the floating-point counters, each array in a fixed wire
//! order. The layout has been stable across format versions, so decoding is
//! a single exact-size read plus byte-order normalization.

use std::io::{self, Write};

use serde::Serialize;

use crate::error::{CodecError, Result};
use crate::order;
use crate::record::{self, AGGREGATED_RANK, BaseRecord};
use crate::stream::{ModuleReader, ModuleWriter, read_fully};

/// Module name used in errors and printed output.
pub(crate) const MODULE_NAME: &str = "STDIO";

/// Current STDIO module format version.
pub const STDIO_VER: u32 = 2;

/// Number of integer counters in a record.
pub const STDIO_NUM_COUNTERS: usize = 14;

/// Number of floating-point counters in a record.
pub const STDIO_NUM_F_COUNTERS: usize = 15;

/// Wire size of one STDIO record in bytes.
pub const STDIO_WIRE_SIZE: usize =
    BaseRecord::WIRE_SIZE + STDIO_NUM_COUNTERS * 8 + STDIO_NUM_F_COUNTERS * 8;

/// Named integer counters, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum StdioCounter {
    /// Count of `fopen`/`freopen` calls.
    Opens,
    /// Count of `fdopen` calls.
    Fdopens,
    /// Count of read operations.
    Reads,
    /// Count of write operations.
    Writes,
    /// Count of seek operations.
    Seeks,
    /// Count of flush operations.
    Flushes,
    /// Total bytes written.
    BytesWritten,
    /// Total bytes read.
    BytesRead,
    /// Highest byte offset read.
    MaxByteRead,
    /// Highest byte offset written.
    MaxByteWritten,
    /// Rank with the smallest cumulative time on a shared file.
    FastestRank,
    /// Bytes moved by the fastest rank.
    FastestRankBytes,
    /// Rank with the largest cumulative time on a shared file.
    SlowestRank,
    /// Bytes moved by the slowest rank.
    SlowestRankBytes,
}

/// Named floating-point counters, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum StdioFloatCounter {
    /// Cumulative time in metadata operations, in seconds.
    MetaTime,
    /// Cumulative time writing, in seconds.
    WriteTime,
    /// Cumulative time reading, in seconds.
    ReadTime,
    /// Timestamp of the first open.
    OpenStartTimestamp,
    /// Timestamp of the first close.
    CloseStartTimestamp,
    /// Timestamp of the first write.
    WriteStartTimestamp,
    /// Timestamp of the first read.
    ReadStartTimestamp,
    /// Timestamp of the last open.
    OpenEndTimestamp,
    /// Timestamp of the last close.
    CloseEndTimestamp,
    /// Timestamp of the last write.
    WriteEndTimestamp,
    /// Timestamp of the last read.
    ReadEndTimestamp,
    /// Cumulative time of the fastest rank.
    FastestRankTime,
    /// Cumulative time of the slowest rank.
    SlowestRankTime,
    /// Variance of cumulative time across ranks.
    VarianceRankTime,
    /// Variance of bytes moved across ranks.
    VarianceRankBytes,
}

impl StdioCounter {
    /// All integer counters in wire order.
    pub const ALL: [StdioCounter; STDIO_NUM_COUNTERS] = [
        StdioCounter::Opens,
        StdioCounter::Fdopens,
        StdioCounter::Reads,
        StdioCounter::Writes,
        StdioCounter::Seeks,
        StdioCounter::Flushes,
        StdioCounter::BytesWritten,
        StdioCounter::BytesRead,
        StdioCounter::MaxByteRead,
        StdioCounter::MaxByteWritten,
        StdioCounter::FastestRank,
        StdioCounter::FastestRankBytes,
        StdioCounter::SlowestRank,
        StdioCounter::SlowestRankBytes,
    ];

    /// The counter's printed name.
    #[must_use]
    pub fn name(self) -> &'static str {
        COUNTER_NAMES[self as usize]
    }
}

impl StdioFloatCounter {
    /// All floating-point counters in wire order.
    pub const ALL: [StdioFloatCounter; STDIO_NUM_F_COUNTERS] = [
        StdioFloatCounter::MetaTime,
        StdioFloatCounter::WriteTime,
        StdioFloatCounter::ReadTime,
        StdioFloatCounter::OpenStartTimestamp,
        StdioFloatCounter::CloseStartTimestamp,
        StdioFloatCounter::WriteStartTimestamp,
        StdioFloatCounter::ReadStartTimestamp,
        StdioFloatCounter::OpenEndTimestamp,
        StdioFloatCounter::CloseEndTimestamp,
        StdioFloatCounter::WriteEndTimestamp,
        StdioFloatCounter::ReadEndTimestamp,
        StdioFloatCounter::FastestRankTime,
        StdioFloatCounter::SlowestRankTime,
        StdioFloatCounter::VarianceRankTime,
        StdioFloatCounter::VarianceRankBytes,
    ];

    /// The counter's printed name.
    #[must_use]
    pub fn name(self) -> &'static str {
        F_COUNTER_NAMES[self as usize]
    }
}

/// Printed names for the integer counters, in wire order.
static COUNTER_NAMES: [&str; STDIO_NUM_COUNTERS] = [
    "STDIO_OPENS",
    "STDIO_FDOPENS",
    "STDIO_READS",
    "STDIO_WRITES",
    "STDIO_SEEKS",
    "STDIO_FLUSHES",
    "STDIO_BYTES_WRITTEN",
    "STDIO_BYTES_READ",
    "STDIO_MAX_BYTE_READ",
    "STDIO_MAX_BYTE_WRITTEN",
    "STDIO_FASTEST_RANK",
    "STDIO_FASTEST_RANK_BYTES",
    "STDIO_SLOWEST_RANK",
    "STDIO_SLOWEST_RANK_BYTES",
];

/// Printed names for the floating-point counters, in wire order.
static F_COUNTER_NAMES: [&str; STDIO_NUM_F_COUNTERS] = [
    "STDIO_F_META_TIME",
    "STDIO_F_WRITE_TIME",
    "STDIO_F_READ_TIME",
    "STDIO_F_OPEN_START_TIMESTAMP",
    "STDIO_F_CLOSE_START_TIMESTAMP",
    "STDIO_F_WRITE_START_TIMESTAMP",
    "STDIO_F_READ_START_TIMESTAMP",
    "STDIO_F_OPEN_END_TIMESTAMP",
    "STDIO_F_CLOSE_END_TIMESTAMP",
    "STDIO_F_WRITE_END_TIMESTAMP",
    "STDIO_F_READ_END_TIMESTAMP",
    "STDIO_F_FASTEST_RANK_TIME",
    "STDIO_F_SLOWEST_RANK_TIME",
    "STDIO_F_VARIANCE_RANK_TIME",
    "STDIO_F_VARIANCE_RANK_BYTES",
];

/// A decoded STDIO record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StdioRecord {
    /// Record identity.
    pub base: BaseRecord,
    /// Integer counters, indexed by [`StdioCounter`].
    pub counters: [i64; STDIO_NUM_COUNTERS],
    /// Floating-point counters, indexed by [`StdioFloatCounter`].
    pub fcounters: [f64; STDIO_NUM_F_COUNTERS],
}

impl Default for StdioRecord {
    fn default() -> Self {
        Self {
            base: BaseRecord::default(),
            counters: [0; STDIO_NUM_COUNTERS],
            fcounters: [0.0; STDIO_NUM_F_COUNTERS],
        }
    }
}

impl StdioRecord {
    /// Creates a zeroed record with the given identity.
    #[must_use]
    pub fn new(base: BaseRecord) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    /// Returns the value of one integer counter.
    #[must_use]
    pub fn counter(&self, counter: StdioCounter) -> i64 {
        self.counters[counter as usize]
    }

    /// Returns the value of one floating-point counter.
    #[must_use]
    pub fn fcounter(&self, counter: StdioFloatCounter) -> f64 {
        self.fcounters[counter as usize]
    }

    /// Sets the value of one integer counter.
    pub fn set_counter(&mut self, counter: StdioCounter, value: i64) {
        self.counters[counter as usize] = value;
    }

    /// Sets the value of one floating-point counter.
    pub fn set_fcounter(&mut self, counter: StdioFloatCounter, value: f64) {
        self.fcounters[counter as usize] = value;
    }
}

/// Decodes the next STDIO record, returning `Ok(None)` at end of data.
///
/// The record layout has not changed since version 1, so every version up
/// to [`STDIO_VER`] decodes the same way.
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedVersion`] for version 0 or versions
/// newer than [`STDIO_VER`], [`CodecError::TruncatedRecord`] when the
/// stream holds a nonzero but short record, and [`CodecError::Io`] for
/// underlying read failures.
pub fn decode<R: ModuleReader + ?Sized>(reader: &mut R) -> Result<Option<StdioRecord>> {
    if !reader.has_data() {
        return Ok(None);
    }

    let version = reader.version();
    if version == 0 || version > STDIO_VER {
        return Err(CodecError::UnsupportedVersion {
            module: MODULE_NAME,
            version,
            supported: STDIO_VER,
        }
        .into());
    }

    let swap = reader.needs_swap();

    let mut raw = [0u8; STDIO_WIRE_SIZE];
    let got = read_fully(reader, &mut raw).map_err(CodecError::Io)?;
    if got == 0 {
        return Ok(None);
    }
    if got < STDIO_WIRE_SIZE {
        return Err(CodecError::TruncatedRecord {
            module: MODULE_NAME,
            needed: STDIO_WIRE_SIZE,
            got,
        }
        .into());
    }

    let mut rec = StdioRecord {
        base: BaseRecord::from_wire(&raw, swap),
        ..StdioRecord::default()
    };
    let mut offset = BaseRecord::WIRE_SIZE;
    for counter in &mut rec.counters {
        *counter = order::read_i64(&raw, offset, swap);
        offset += 8;
    }
    for fcounter in &mut rec.fcounters {
        *fcounter = order::read_f64(&raw, offset, swap);
        offset += 8;
    }

    Ok(Some(rec))
}

/// Encodes an STDIO record, tagged with the current format version.
///
/// # Errors
///
/// Returns [`CodecError::Io`] for underlying write failures.
pub fn encode<W: ModuleWriter + ?Sized>(writer: &mut W, rec: &StdioRecord) -> Result<()> {
    let mut buf = Vec::with_capacity(STDIO_WIRE_SIZE);
    rec.base.write_wire(&mut buf);
    for counter in rec.counters {
        order::push_i64(&mut buf, counter);
    }
    for fcounter in rec.fcounters {
        order::push_f64(&mut buf, fcounter);
    }

    writer.append(&buf, STDIO_VER).map_err(CodecError::Io)?;
    Ok(())
}

/// Prints every counter of a record, one line per counter.
///
/// # Errors
///
/// Returns errors from the output stream only.
pub fn print(rec: &StdioRecord, out: &mut dyn Write) -> io::Result<()> {
    for counter in StdioCounter::ALL {
        record::counter_line(out, MODULE_NAME, &rec.base, counter.name(), rec.counter(counter))?;
    }
    for fcounter in StdioFloatCounter::ALL {
        record::fcounter_line(
            out,
            MODULE_NAME,
            &rec.base,
            fcounter.name(),
            rec.fcounter(fcounter),
        )?;
    }
    Ok(())
}

/// Prints a fixed description of the STDIO record fields.
///
/// # Errors
///
/// Returns errors from the output stream only.
pub fn describe(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "# description of STDIO counters:")?;
    writeln!(
        out,
        "#   STDIO_{{OPENS|FDOPENS|READS|WRITES|SEEKS|FLUSHES}} are types of operations."
    )?;
    writeln!(
        out,
        "#   STDIO_BYTES_*: total bytes read and written."
    )?;
    writeln!(
        out,
        "#   STDIO_MAX_BYTE_*: highest offset byte read and written."
    )?;
    writeln!(
        out,
        "#   STDIO_FASTEST/SLOWEST: info about the fastest and slowest ranks that accessed a shared file."
    )?;
    writeln!(
        out,
        "#   STDIO_F_*_START_TIMESTAMP: timestamp of the first call to that type of function."
    )?;
    writeln!(
        out,
        "#   STDIO_F_*_END_TIMESTAMP: timestamp of the completion of the last call to that type of function."
    )?;
    writeln!(
        out,
        "#   STDIO_F_*_TIME: cumulative time spent in different types of functions."
    )?;
    writeln!(
        out,
        "#   STDIO_F_VARIANCE_RANK_*: variance of total I/O time and bytes moved across ranks for shared files."
    )?;
    Ok(())
}

/// Prints the difference between two records counter by counter.
///
/// Counters with equal values are skipped. A record present on one side
/// only prints every counter with a `- ` or `+ ` prefix; a differing
/// counter prints the left value then the right.
///
/// # Errors
///
/// Returns errors from the output stream only.
pub fn diff(
    left: Option<&StdioRecord>,
    right: Option<&StdioRecord>,
    out: &mut dyn Write,
) -> io::Result<()> {
    for counter in StdioCounter::ALL {
        let lv = left.map(|r| r.counter(counter));
        let rv = right.map(|r| r.counter(counter));
        if lv == rv {
            continue;
        }
        if let (Some(rec), Some(value)) = (left, lv) {
            write!(out, "- ")?;
            record::counter_line(out, MODULE_NAME, &rec.base, counter.name(), value)?;
        }
        if let (Some(rec), Some(value)) = (right, rv) {
            write!(out, "+ ")?;
            record::counter_line(out, MODULE_NAME, &rec.base, counter.name(), value)?;
        }
    }
    for fcounter in StdioFloatCounter::ALL {
        let lv = left.map(|r| r.fcounter(fcounter));
        let rv = right.map(|r| r.fcounter(fcounter));
        if lv == rv {
            continue;
        }
        if let (Some(rec), Some(value)) = (left, lv) {
            write!(out, "- ")?;
            record::fcounter_line(out, MODULE_NAME, &rec.base, fcounter.name(), value)?;
        }
        if let (Some(rec), Some(value)) = (right, rv) {
            write!(out, "+ ")?;
            record::fcounter_line(out, MODULE_NAME, &rec.base, fcounter.name(), value)?;
        }
    }
    Ok(())
}

/// Folds a record into an accumulator for a shared-file summary.
///
/// With `init` set the accumulator becomes a copy of `rec`. Subsequent
/// calls sum the operation and byte counters, take the maximum of the
/// max-offset counters, widen the timestamp windows (earliest nonzero
/// start, latest end), sum the cumulative times, and track the fastest and
/// slowest contributing rank. The cross-rank variance counters cannot be
/// recomputed from aggregated values and are reset to zero. Ranks collapse
/// to [`AGGREGATED_RANK`] as soon as two distinct ranks contribute.
pub fn aggregate(rec: &StdioRecord, accum: &mut StdioRecord, init: bool) {
    if init {
        *accum = rec.clone();
        return;
    }

    if accum.base.rank != rec.base.rank {
        accum.base.rank = AGGREGATED_RANK;
    }

    for counter in [
        StdioCounter::Opens,
        StdioCounter::Fdopens,
        StdioCounter::Reads,
        StdioCounter::Writes,
        StdioCounter::Seeks,
        StdioCounter::Flushes,
        StdioCounter::BytesWritten,
        StdioCounter::BytesRead,
    ] {
        accum.set_counter(counter, accum.counter(counter) + rec.counter(counter));
    }
    for counter in [StdioCounter::MaxByteRead, StdioCounter::MaxByteWritten] {
        accum.set_counter(counter, accum.counter(counter).max(rec.counter(counter)));
    }

    if rec.fcounter(StdioFloatCounter::FastestRankTime)
        < accum.fcounter(StdioFloatCounter::FastestRankTime)
    {
        accum.set_counter(
            StdioCounter::FastestRank,
            rec.counter(StdioCounter::FastestRank),
        );
        accum.set_counter(
            StdioCounter::FastestRankBytes,
            rec.counter(StdioCounter::FastestRankBytes),
        );
        accum.set_fcounter(
            StdioFloatCounter::FastestRankTime,
            rec.fcounter(StdioFloatCounter::FastestRankTime),
        );
    }
    if rec.fcounter(StdioFloatCounter::SlowestRankTime)
        > accum.fcounter(StdioFloatCounter::SlowestRankTime)
    {
        accum.set_counter(
            StdioCounter::SlowestRank,
            rec.counter(StdioCounter::SlowestRank),
        );
        accum.set_counter(
            StdioCounter::SlowestRankBytes,
            rec.counter(StdioCounter::SlowestRankBytes),
        );
        accum.set_fcounter(
            StdioFloatCounter::SlowestRankTime,
            rec.fcounter(StdioFloatCounter::SlowestRankTime),
        );
    }

    for fcounter in [
        StdioFloatCounter::MetaTime,
        StdioFloatCounter::WriteTime,
        StdioFloatCounter::ReadTime,
    ] {
        accum.set_fcounter(fcounter, accum.fcounter(fcounter) + rec.fcounter(fcounter));
    }

    // A zero start timestamp means the operation never happened on that
    // rank; it must not win the minimum.
    for fcounter in [
        StdioFloatCounter::OpenStartTimestamp,
        StdioFloatCounter::CloseStartTimestamp,
        StdioFloatCounter::WriteStartTimestamp,
        StdioFloatCounter::ReadStartTimestamp,
    ] {
        let incoming = rec.fcounter(fcounter);
        let current = accum.fcounter(fcounter);
        if incoming > 0.0 && (current == 0.0 || incoming < current) {
            accum.set_fcounter(fcounter, incoming);
        }
    }
    for fcounter in [
        StdioFloatCounter::OpenEndTimestamp,
        StdioFloatCounter::CloseEndTimestamp,
        StdioFloatCounter::WriteEndTimestamp,
        StdioFloatCounter::ReadEndTimestamp,
    ] {
        accum.set_fcounter(fcounter, accum.fcounter(fcounter).max(rec.fcounter(fcounter)));
    }

    accum.set_fcounter(StdioFloatCounter::VarianceRankTime, 0.0);
    accum.set_fcounter(StdioFloatCounter::VarianceRankBytes, 0.0);
}
