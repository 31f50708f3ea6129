//! Variable-length record codec for the LUSTRE layout module.
//!
//! A layout record describes how one file is striped across a Lustre
//! filesystem: a fixed header, then one component per layout segment, then
//! a single flat array of OST ids covering all components. Nothing on the
//! wire states the total record size; the component count is read from the
//! header and the OST array length is the sum of every component's stripe
//! count, so the decoder discovers the size incrementally.
//!
//! Version 1 logs predate composite layouts and store a single implicit
//! component in a fixed 7-word header; they are upgraded to the current
//! shape on read and are never written back in the old format.
//!
//! # Wire Layout (current version)
//!
//! ```text
//! [0..16)   BaseRecord (id, rank)
//! [16..24)  num_components (i64)
//! then per component (72 bytes each):
//!   [0..56)   7 i64 counters (see CompCounter)
//!   [56..72)  NUL-terminated pool name, never byte-swapped
//! then num_osts * 8 bytes of OST ids, ordered by component then stripe
//! ```

use std::io::{self, Write};

use serde::{Serialize, Serializer};

use crate::error::{CodecError, Result};
use crate::order;
use crate::record::{self, BaseRecord};
use crate::stream::{ModuleReader, ModuleWriter, read_fully};

/// Module name used in errors and printed output.
pub(crate) const MODULE_NAME: &str = "LUSTRE";

/// Current LUSTRE module format version.
pub const LUSTRE_VER: u32 = 2;

/// Sentinel for counters with no known value.
pub const UNKNOWN_COUNTER: i64 = -1;

/// Fixed capacity of a component's pool name, including the NUL terminator.
pub const POOL_NAME_LEN: usize = 16;

/// Number of integer counters per component.
pub const COMP_NUM_COUNTERS: usize = 7;

/// Wire size of one component in bytes.
pub(crate) const COMP_WIRE_SIZE: usize = COMP_NUM_COUNTERS * 8 + POOL_NAME_LEN;

/// Wire size of the current-version fixed header in bytes.
const HEADER_WIRE_SIZE: usize = BaseRecord::WIRE_SIZE + 8;

/// Wire size of the version-1 fixed header: 7 packed 64-bit words.
const LEGACY_HEADER_SIZE: usize = 7 * 8;
/// Byte offset of the stripe size word in a version-1 header.
const LEGACY_STRIPE_SIZE_OFFSET: usize = 5 * 8;
/// Byte offset of the stripe count word in a version-1 header.
const LEGACY_STRIPE_COUNT_OFFSET: usize = 6 * 8;

/// Named integer counters of one layout component, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum CompCounter {
    /// Stripe size in bytes.
    StripeSize,
    /// Number of OSTs the component's data spans.
    StripeCount,
    /// Layout pattern code (see the pattern label table).
    StripePattern,
    /// Component flag bitmask (see the flag name table).
    Flags,
    /// Starting extent of the component in bytes.
    ExtStart,
    /// Ending extent of the component in bytes; -1 means end of file.
    ExtEnd,
    /// Mirror id, for mirrored layouts.
    MirrorId,
}

impl CompCounter {
    /// All counters in wire order.
    pub const ALL: [CompCounter; COMP_NUM_COUNTERS] = [
        CompCounter::StripeSize,
        CompCounter::StripeCount,
        CompCounter::StripePattern,
        CompCounter::Flags,
        CompCounter::ExtStart,
        CompCounter::ExtEnd,
        CompCounter::MirrorId,
    ];

    /// The counter's printed name, without a component index.
    #[must_use]
    pub fn name(self) -> &'static str {
        COMP_COUNTER_NAMES[self as usize]
    }
}

/// Printed names for the component counters, in wire order.
static COMP_COUNTER_NAMES: [&str; COMP_NUM_COUNTERS] = [
    "LUSTRE_COMP_STRIPE_SIZE",
    "LUSTRE_COMP_STRIPE_COUNT",
    "LUSTRE_COMP_STRIPE_PATTERN",
    "LUSTRE_COMP_FLAGS",
    "LUSTRE_COMP_EXT_START",
    "LUSTRE_COMP_EXT_END",
    "LUSTRE_COMP_MIRROR_ID",
];

/// Names for the component flag bits, indexed by bit position.
static FLAG_NAMES: [&str; 12] = [
    "stale",
    "prefrd",
    "prefwr",
    "offline",
    "init",
    "nosync",
    "extension",
    "parity",
    "compress",
    "partial",
    "nocompr",
    "neg",
];

/// One contiguous layout segment of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    counters: [i64; COMP_NUM_COUNTERS],
    #[serde(serialize_with = "serialize_pool_name")]
    pool_name: [u8; POOL_NAME_LEN],
}

impl Default for Component {
    fn default() -> Self {
        Self {
            counters: [0; COMP_NUM_COUNTERS],
            pool_name: [0; POOL_NAME_LEN],
        }
    }
}

impl Component {
    /// Creates a component with all counters zeroed and no pool name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of one counter.
    #[must_use]
    pub fn counter(&self, counter: CompCounter) -> i64 {
        self.counters[counter as usize]
    }

    /// Sets the value of one counter.
    pub fn set_counter(&mut self, counter: CompCounter, value: i64) {
        self.counters[counter as usize] = value;
    }

    /// The component's stripe count, the field that sizes the OST id array.
    #[must_use]
    pub fn stripe_count(&self) -> i64 {
        self.counter(CompCounter::StripeCount)
    }

    /// The pool name, or `None` when unset or not valid UTF-8.
    #[must_use]
    pub fn pool_name(&self) -> Option<&str> {
        let end = self
            .pool_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(POOL_NAME_LEN);
        if end == 0 {
            return None;
        }
        std::str::from_utf8(&self.pool_name[..end]).ok()
    }

    /// Sets the pool name, truncating to the fixed wire capacity.
    pub fn set_pool_name(&mut self, name: &str) {
        self.pool_name = [0; POOL_NAME_LEN];
        let len = name.len().min(POOL_NAME_LEN - 1);
        self.pool_name[..len].copy_from_slice(&name.as_bytes()[..len]);
    }

    /// Decodes one component from a 72-byte wire chunk.
    ///
    /// Counters are swapped when required; the pool name bytes never are.
    fn from_wire(chunk: &[u8], swap: bool) -> Self {
        let mut comp = Self::default();
        for (i, counter) in comp.counters.iter_mut().enumerate() {
            *counter = order::read_i64(chunk, i * 8, swap);
        }
        comp.pool_name
            .copy_from_slice(&chunk[COMP_NUM_COUNTERS * 8..COMP_WIRE_SIZE]);
        comp
    }

    /// Appends the component's wire form to `out` in native byte order.
    fn write_wire(&self, out: &mut Vec<u8>) {
        for counter in self.counters {
            order::push_i64(out, counter);
        }
        out.extend_from_slice(&self.pool_name);
    }
}

/// A decoded layout record.
///
/// The OST id array's length is never stored on the wire; it is always the
/// sum of `stripe_count` across components. [`push_component`] is the only
/// public mutator and keeps the two sequences in lockstep, so a decoded or
/// hand-built record always satisfies the invariant; [`encode`] re-checks
/// it anyway and rejects violations deterministically.
///
/// [`push_component`]: LustreRecord::push_component
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LustreRecord {
    /// Record identity.
    pub base: BaseRecord,
    components: Vec<Component>,
    ost_ids: Vec<u64>,
}

impl LustreRecord {
    /// Creates an empty record with the given identity.
    #[must_use]
    pub fn new(base: BaseRecord) -> Self {
        Self {
            base,
            components: Vec::new(),
            ost_ids: Vec::new(),
        }
    }

    /// The layout components, in wire order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// The flat OST id array, ordered by component then stripe position.
    #[must_use]
    pub fn ost_ids(&self) -> &[u64] {
        &self.ost_ids
    }

    /// Number of components, as stored in the wire header.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)] // component counts never approach i64::MAX
    pub fn num_components(&self) -> i64 {
        self.components.len() as i64
    }

    /// Appends a component together with the OST ids for its stripes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::StripeCountMismatch`] when `ost_ids` does not
    /// hold exactly the component's stripe count of entries.
    pub fn push_component(&mut self, component: Component, ost_ids: &[u64]) -> Result<()> {
        #[allow(clippy::cast_sign_loss)] // negative counts clamp to zero
        let promised = component.stripe_count().max(0) as u64;
        if promised != ost_ids.len() as u64 {
            return Err(CodecError::StripeCountMismatch {
                expected: promised,
                actual: ost_ids.len() as u64,
            }
            .into());
        }
        self.components.push(component);
        self.ost_ids.extend_from_slice(ost_ids);
        Ok(())
    }

    /// The OST id count promised by the components' stripe counts.
    #[must_use]
    #[allow(clippy::cast_sign_loss)] // negative counts clamp to zero
    pub fn expected_ost_count(&self) -> u64 {
        self.components
            .iter()
            .map(|c| c.stripe_count().max(0) as u64)
            .sum()
    }

    /// Total encoded size of the record in bytes.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        HEADER_WIRE_SIZE + self.components.len() * COMP_WIRE_SIZE + self.ost_ids.len() * 8
    }
}

/// Reserves exactly `additional` elements, surfacing allocation failure.
fn reserve<T>(vec: &mut Vec<T>, additional: usize) -> Result<()> {
    vec.try_reserve_exact(additional).map_err(|_| {
        CodecError::Allocation {
            bytes: additional.saturating_mul(size_of::<T>()),
        }
        .into()
    })
}

/// Decodes the next layout record, returning `Ok(None)` at end of data.
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedVersion`] for version 0 or versions
/// newer than [`LUSTRE_VER`], [`CodecError::TruncatedRecord`] when the
/// stream ends inside the component or OST id array, and
/// [`CodecError::Io`] for underlying read failures.
pub fn decode<R: ModuleReader + ?Sized>(reader: &mut R) -> Result<Option<LustreRecord>> {
    let mut rec = LustreRecord::default();
    match decode_into(reader, &mut rec)? {
        Some(_) => Ok(Some(rec)),
        None => Ok(None),
    }
}

/// Decodes the next layout record into `rec`, reusing its storage.
///
/// On success returns the record's wire size; returns `Ok(None)` at end of
/// data, in which case `rec` is left cleared. The component and OST id
/// views are rebuilt from scratch on every call; nothing from a previous
/// decode survives.
///
/// # Errors
///
/// Same failure modes as [`decode`].
pub fn decode_into<R: ModuleReader + ?Sized>(
    reader: &mut R,
    rec: &mut LustreRecord,
) -> Result<Option<usize>> {
    rec.base = BaseRecord::default();
    rec.components.clear();
    rec.ost_ids.clear();

    if !reader.has_data() {
        return Ok(None);
    }

    let version = reader.version();
    if version == 0 || version > LUSTRE_VER {
        return Err(CodecError::UnsupportedVersion {
            module: MODULE_NAME,
            version,
            supported: LUSTRE_VER,
        }
        .into());
    }
    if version == 1 {
        return decode_legacy(reader, rec);
    }

    let swap = reader.needs_swap();

    // Fixed header: a short read here means no further record exists.
    let mut header = [0u8; HEADER_WIRE_SIZE];
    let got = read_fully(reader, &mut header).map_err(CodecError::Io)?;
    if got < HEADER_WIRE_SIZE {
        return Ok(None);
    }

    rec.base = BaseRecord::from_wire(&header, swap);
    let num_comps = order::read_i64(&header, BaseRecord::WIRE_SIZE, swap);
    if num_comps < 1 {
        return Ok(Some(HEADER_WIRE_SIZE));
    }
    #[allow(clippy::cast_sign_loss)] // checked positive above
    let num_comps = num_comps as usize;

    // The header has promised this many components; from here on a short
    // read can only mean a truncated record.
    let comps_size = num_comps
        .checked_mul(COMP_WIRE_SIZE)
        .ok_or(CodecError::Allocation { bytes: usize::MAX })?;
    let mut raw = Vec::new();
    reserve(&mut raw, comps_size)?;
    raw.resize(comps_size, 0);

    let got = read_fully(reader, &mut raw).map_err(CodecError::Io)?;
    if got < comps_size {
        return Err(CodecError::TruncatedRecord {
            module: MODULE_NAME,
            needed: comps_size,
            got,
        }
        .into());
    }

    reserve(&mut rec.components, num_comps)?;
    for chunk in raw.chunks_exact(COMP_WIRE_SIZE) {
        rec.components.push(Component::from_wire(chunk, swap));
    }

    let num_osts = usize::try_from(rec.expected_ost_count())
        .map_err(|_| CodecError::Allocation { bytes: usize::MAX })?;
    let osts_size = num_osts
        .checked_mul(8)
        .ok_or(CodecError::Allocation { bytes: usize::MAX })?;
    raw.clear();
    reserve(&mut raw, osts_size)?;
    raw.resize(osts_size, 0);

    let got = read_fully(reader, &mut raw).map_err(CodecError::Io)?;
    if got < osts_size {
        return Err(CodecError::TruncatedRecord {
            module: MODULE_NAME,
            needed: osts_size,
            got,
        }
        .into());
    }

    reserve(&mut rec.ost_ids, num_osts)?;
    for i in 0..num_osts {
        rec.ost_ids.push(order::read_u64(&raw, i * 8, swap));
    }

    Ok(Some(HEADER_WIRE_SIZE + comps_size + osts_size))
}

/// Decodes a version-1 record and upgrades it to the current shape.
///
/// The old fixed header packs the base record and two stripe counters into
/// 7 words (the three retired filesystem-wide counters in between are
/// dropped). The single implicit component gets unknown sentinels for every
/// field the old format never stored.
fn decode_legacy<R: ModuleReader + ?Sized>(
    reader: &mut R,
    rec: &mut LustreRecord,
) -> Result<Option<usize>> {
    let swap = reader.needs_swap();

    let mut header = [0u8; LEGACY_HEADER_SIZE];
    let got = read_fully(reader, &mut header).map_err(CodecError::Io)?;
    if got < LEGACY_HEADER_SIZE {
        return Ok(None);
    }

    rec.base = BaseRecord::from_wire(&header, swap);
    let stripe_size = order::read_i64(&header, LEGACY_STRIPE_SIZE_OFFSET, swap);
    let stripe_count = order::read_i64(&header, LEGACY_STRIPE_COUNT_OFFSET, swap);

    let mut comp = Component::new();
    comp.set_counter(CompCounter::StripeSize, stripe_size);
    comp.set_counter(CompCounter::StripeCount, stripe_count);
    comp.set_counter(CompCounter::StripePattern, UNKNOWN_COUNTER);
    comp.set_counter(CompCounter::Flags, UNKNOWN_COUNTER);
    comp.set_counter(CompCounter::ExtStart, 0);
    comp.set_counter(CompCounter::ExtEnd, UNKNOWN_COUNTER);
    comp.set_counter(CompCounter::MirrorId, UNKNOWN_COUNTER);
    rec.components.push(comp);

    // Exactly one implicit component, so the OST ids follow immediately.
    #[allow(clippy::cast_sign_loss)] // negative counts clamp to zero
    let num_osts = stripe_count.max(0) as usize;
    let osts_size = num_osts
        .checked_mul(8)
        .ok_or(CodecError::Allocation { bytes: usize::MAX })?;
    let mut raw = Vec::new();
    reserve(&mut raw, osts_size)?;
    raw.resize(osts_size, 0);

    let got = read_fully(reader, &mut raw).map_err(CodecError::Io)?;
    if got < osts_size {
        return Err(CodecError::TruncatedRecord {
            module: MODULE_NAME,
            needed: osts_size,
            got,
        }
        .into());
    }

    reserve(&mut rec.ost_ids, num_osts)?;
    for i in 0..num_osts {
        rec.ost_ids.push(order::read_u64(&raw, i * 8, swap));
    }

    Ok(Some(LEGACY_HEADER_SIZE + osts_size))
}

/// Encodes a layout record, always in the current format version.
///
/// Legacy records decoded from version-1 logs are re-encoded in the current
/// multi-component shape; no write path emits version 1.
///
/// # Errors
///
/// Returns [`CodecError::StripeCountMismatch`] when the OST id array does
/// not match the components' stripe counts, and [`CodecError::Io`] for
/// underlying write failures.
pub fn encode<W: ModuleWriter + ?Sized>(writer: &mut W, rec: &LustreRecord) -> Result<()> {
    let expected = rec.expected_ost_count();
    let actual = rec.ost_ids.len() as u64;
    if expected != actual {
        return Err(CodecError::StripeCountMismatch { expected, actual }.into());
    }

    let mut buf = Vec::with_capacity(rec.wire_size());
    rec.base.write_wire(&mut buf);
    order::push_i64(&mut buf, rec.num_components());
    for comp in &rec.components {
        comp.write_wire(&mut buf);
    }
    for &ost in &rec.ost_ids {
        order::push_u64(&mut buf, ost);
    }

    writer.append(&buf, LUSTRE_VER).map_err(CodecError::Io)?;
    Ok(())
}

/// Inserts a 1-based component index after the name's second segment,
/// e.g. `LUSTRE_COMP_STRIPE_SIZE` with index 2 becomes
/// `LUSTRE_COMP2_STRIPE_SIZE`.
fn indexed_name(base: &str, index: usize) -> String {
    let mut underscores = 0;
    for (pos, ch) in base.char_indices() {
        if ch == '_' {
            underscores += 1;
            if underscores == 2 {
                return format!("{}{}{}", &base[..pos], index, &base[pos..]);
            }
        }
    }
    format!("{base}{index}")
}

/// Label for a stripe pattern code; sentinel and unmapped codes are "unknown".
fn pattern_label(code: i64) -> &'static str {
    match code {
        0 => "raid0",
        2 => "mdt",
        4 => "raid0,overstriped",
        8 => "foreign",
        _ => "unknown",
    }
}

/// Comma-joined flag names for a flag bitmask.
///
/// Returns `"0"` when no bit is set and `"unknown"` for the sentinel.
fn flags_label(flags: i64) -> String {
    if flags == UNKNOWN_COUNTER {
        return "unknown".to_string();
    }
    #[allow(clippy::cast_sign_loss)] // bitmask semantics
    let bits = flags as u64;
    let set: Vec<&str> = FLAG_NAMES
        .iter()
        .enumerate()
        .filter(|&(k, _)| bits & (1 << k) != 0)
        .map(|(_, &name)| name)
        .collect();
    if set.is_empty() {
        "0".to_string()
    } else {
        set.join(",")
    }
}

/// Prints every counter of a layout record, one line per counter.
///
/// Component counters print under names carrying the component's 1-based
/// index. OST ids print indexed within their component while the value is
/// taken from the running position in the flat array. Printing is
/// best-effort: sentinel and missing values render as "unknown" and never
/// fail the call.
///
/// # Errors
///
/// Returns errors from the output stream only.
pub fn print(rec: &LustreRecord, out: &mut dyn Write) -> io::Result<()> {
    record::counter_line(
        out,
        MODULE_NAME,
        &rec.base,
        "LUSTRE_NUM_COMPONENTS",
        rec.num_components(),
    )?;

    let mut global_ost = 0usize;
    for (i, comp) in rec.components.iter().enumerate() {
        let index = i + 1;
        for counter in CompCounter::ALL {
            let name = indexed_name(counter.name(), index);
            let value = comp.counter(counter);
            match counter {
                CompCounter::StripePattern => {
                    record::scounter_line(out, MODULE_NAME, &rec.base, &name, pattern_label(value))?;
                }
                CompCounter::Flags => {
                    record::scounter_line(out, MODULE_NAME, &rec.base, &name, &flags_label(value))?;
                }
                _ => {
                    record::counter_line(out, MODULE_NAME, &rec.base, &name, value)?;
                }
            }
        }

        let pool_name = format!("LUSTRE_COMP{index}_POOL_NAME");
        record::scounter_line(
            out,
            MODULE_NAME,
            &rec.base,
            &pool_name,
            comp.pool_name().unwrap_or("unknown"),
        )?;

        for j in 0..comp.stripe_count().max(0) {
            let Some(&ost) = rec.ost_ids.get(global_ost) else {
                break;
            };
            global_ost += 1;
            let name = format!("LUSTRE_COMP{index}_OST_ID_{j}");
            #[allow(clippy::cast_possible_wrap)] // OST ids are small in practice
            record::counter_line(out, MODULE_NAME, &rec.base, &name, ost as i64)?;
        }
    }

    Ok(())
}

/// Prints a fixed description of the LUSTRE record fields.
///
/// # Errors
///
/// Returns errors from the output stream only.
pub fn describe(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "# description of LUSTRE counters:")?;
    writeln!(
        out,
        "#   LUSTRE_NUM_COMPONENTS: number of layout components in the file."
    )?;
    writeln!(
        out,
        "#   LUSTRE_COMP*_STRIPE_SIZE: stripe size of this component in bytes."
    )?;
    writeln!(
        out,
        "#   LUSTRE_COMP*_STRIPE_COUNT: number of OSTs over which the component is striped."
    )?;
    writeln!(
        out,
        "#   LUSTRE_COMP*_STRIPE_PATTERN: layout pattern (raid0, mdt, overstriped, foreign)."
    )?;
    writeln!(
        out,
        "#   LUSTRE_COMP*_FLAGS: component flags (init, stale, prefrd, ...)."
    )?;
    writeln!(
        out,
        "#   LUSTRE_COMP*_EXT_START: starting file extent of this component in bytes."
    )?;
    writeln!(
        out,
        "#   LUSTRE_COMP*_EXT_END: ending file extent of this component (-1 means EOF)."
    )?;
    writeln!(
        out,
        "#   LUSTRE_COMP*_MIRROR_ID: mirror id of this component, for mirrored layouts."
    )?;
    writeln!(
        out,
        "#   LUSTRE_COMP*_POOL_NAME: OST pool the component allocates from."
    )?;
    writeln!(
        out,
        "#   LUSTRE_COMP*_OST_ID_*: indices of the OSTs over which the component is striped."
    )?;
    Ok(())
}

/// Differencing for layout records is not wired up yet.
///
/// The comparison semantics for multi-component layouts (per-component
/// positional diff plus an OST id array diff) have never been exercised in
/// released output and still need confirmation; until then this prints
/// nothing for any input.
///
/// # Errors
///
/// Never fails today; the signature matches the module operation contract.
pub fn diff(
    _left: Option<&LustreRecord>,
    _left_name: &str,
    _right: Option<&LustreRecord>,
    _right_name: &str,
    _out: &mut dyn Write,
) -> io::Result<()> {
    Ok(())
}

/// Aggregation for layout records is not wired up yet.
///
/// Layout records are expected to be identical across ranks for a shared
/// file, so aggregation would be an identity check rather than a reduction;
/// that behavior is unconfirmed, and the accumulator is left untouched.
pub fn aggregate(_rec: &LustreRecord, _accum: &mut LustreRecord, _init: bool) {}

fn serialize_pool_name<S>(bytes: &[u8; POOL_NAME_LEN], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(POOL_NAME_LEN);
    let name = std::str::from_utf8(&bytes[..end]).unwrap_or("");
    serializer.serialize_str(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{RecordSink, SliceReader};

    fn component(stripe_size: i64, stripe_count: i64, pool: &str) -> Component {
        let mut comp = Component::new();
        comp.set_counter(CompCounter::StripeSize, stripe_size);
        comp.set_counter(CompCounter::StripeCount, stripe_count);
        comp.set_counter(CompCounter::StripePattern, 0);
        comp.set_counter(CompCounter::Flags, 1 << 4);
        comp.set_counter(CompCounter::ExtStart, 0);
        comp.set_counter(CompCounter::ExtEnd, UNKNOWN_COUNTER);
        comp.set_counter(CompCounter::MirrorId, 0);
        comp.set_pool_name(pool);
        comp
    }

    /// The two-component fixture used throughout: stripe counts 2 and 1,
    /// OST ids [10, 11, 20].
    fn sample_record() -> LustreRecord {
        let mut rec = LustreRecord::new(BaseRecord { id: 0xabc, rank: 3 });
        rec.push_component(component(1 << 20, 2, "pool_a"), &[10, 11])
            .unwrap();
        rec.push_component(component(1 << 22, 1, ""), &[20]).unwrap();
        rec
    }

    fn encode_to_vec(rec: &LustreRecord) -> Vec<u8> {
        let mut sink = RecordSink::new();
        encode(&mut sink, rec).unwrap();
        assert_eq!(sink.version(), Some(LUSTRE_VER));
        sink.into_bytes()
    }

    /// Rewrites an encoded record as the opposite byte order: every 64-bit
    /// word reversed, pool name bytes left alone.
    fn byte_swapped_wire(rec: &LustreRecord, bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(bytes.len());
        let swap_words = |out: &mut Vec<u8>, chunk: &[u8]| {
            for word in chunk.chunks_exact(8) {
                out.extend(word.iter().rev());
            }
        };

        swap_words(&mut out, &bytes[..HEADER_WIRE_SIZE]);
        let mut pos = HEADER_WIRE_SIZE;
        for _ in 0..rec.components().len() {
            swap_words(&mut out, &bytes[pos..pos + COMP_NUM_COUNTERS * 8]);
            pos += COMP_NUM_COUNTERS * 8;
            out.extend_from_slice(&bytes[pos..pos + POOL_NAME_LEN]);
            pos += POOL_NAME_LEN;
        }
        swap_words(&mut out, &bytes[pos..]);
        out
    }

    #[test]
    fn test_round_trip() {
        let rec = sample_record();
        let bytes = encode_to_vec(&rec);
        assert_eq!(bytes.len(), rec.wire_size());

        let mut reader = SliceReader::new(&bytes, LUSTRE_VER);
        let decoded = decode(&mut reader).unwrap().unwrap();
        assert_eq!(decoded, rec);

        // The stream is exhausted: the next call reports end of data.
        assert!(decode(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_round_trip_empty_record() {
        let rec = LustreRecord::new(BaseRecord { id: 7, rank: 0 });
        let bytes = encode_to_vec(&rec);
        assert_eq!(bytes.len(), HEADER_WIRE_SIZE);

        let decoded = decode(&mut SliceReader::new(&bytes, LUSTRE_VER))
            .unwrap()
            .unwrap();
        assert_eq!(decoded.num_components(), 0);
        assert!(decoded.components().is_empty());
        assert!(decoded.ost_ids().is_empty());
        assert_eq!(decoded, rec);
    }

    #[test]
    fn test_no_data_is_end_of_data() {
        let mut reader = SliceReader::new(&[], LUSTRE_VER);
        assert!(decode(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_partial_header_is_end_of_data() {
        let rec = sample_record();
        let bytes = encode_to_vec(&rec);
        for len in 1..HEADER_WIRE_SIZE {
            let mut reader = SliceReader::new(&bytes[..len], LUSTRE_VER);
            assert!(
                decode(&mut reader).unwrap().is_none(),
                "prefix of {len} bytes should read as end of data"
            );
        }
    }

    #[test]
    fn test_truncation_inside_components_or_osts_is_fatal() {
        let rec = sample_record();
        let bytes = encode_to_vec(&rec);
        for len in HEADER_WIRE_SIZE..bytes.len() {
            let mut reader = SliceReader::new(&bytes[..len], LUSTRE_VER);
            let err = decode(&mut reader).unwrap_err();
            assert!(
                err.to_string().contains("truncated"),
                "prefix of {len} bytes should be a truncated record, got: {err}"
            );
        }
    }

    #[test]
    fn test_unsupported_versions_consume_nothing() {
        let rec = sample_record();
        let bytes = encode_to_vec(&rec);
        for version in [0, LUSTRE_VER + 1] {
            let mut reader = SliceReader::new(&bytes, version);
            let err = decode(&mut reader).unwrap_err();
            assert!(err.to_string().contains("unsupported"));
            assert_eq!(reader.remaining(), bytes.len());
        }
    }

    #[test]
    fn test_legacy_v1_upgrades_to_single_component() {
        // 7-word legacy header: id, rank, three retired counters,
        // stripe size, stripe count; then the OST ids.
        let mut bytes = Vec::new();
        order::push_u64(&mut bytes, 0x1234);
        order::push_i64(&mut bytes, 9);
        order::push_i64(&mut bytes, 96); // retired: filesystem OST count
        order::push_i64(&mut bytes, 4); // retired: filesystem MDT count
        order::push_i64(&mut bytes, 0); // retired: stripe offset
        order::push_i64(&mut bytes, 1 << 20);
        order::push_i64(&mut bytes, 3);
        for ost in [5u64, 6, 7] {
            order::push_u64(&mut bytes, ost);
        }

        let decoded = decode(&mut SliceReader::new(&bytes, 1)).unwrap().unwrap();
        assert_eq!(decoded.base, BaseRecord { id: 0x1234, rank: 9 });
        assert_eq!(decoded.num_components(), 1);

        let comp = &decoded.components()[0];
        assert_eq!(comp.counter(CompCounter::StripeSize), 1 << 20);
        assert_eq!(comp.counter(CompCounter::StripeCount), 3);
        assert_eq!(comp.counter(CompCounter::StripePattern), UNKNOWN_COUNTER);
        assert_eq!(comp.counter(CompCounter::Flags), UNKNOWN_COUNTER);
        assert_eq!(comp.counter(CompCounter::ExtStart), 0);
        assert_eq!(comp.counter(CompCounter::ExtEnd), UNKNOWN_COUNTER);
        assert_eq!(comp.counter(CompCounter::MirrorId), UNKNOWN_COUNTER);
        assert!(comp.pool_name().is_none());
        assert_eq!(decoded.ost_ids(), &[5, 6, 7]);

        // Re-encoding always produces the current shape and version.
        let mut sink = RecordSink::new();
        encode(&mut sink, &decoded).unwrap();
        assert_eq!(sink.version(), Some(LUSTRE_VER));
        let round = decode(&mut sink.as_reader()).unwrap().unwrap();
        assert_eq!(round, decoded);
    }

    #[test]
    fn test_legacy_huge_stripe_count_fails_closed() {
        // A corrupt stripe-count word must surface as an allocation error,
        // never an arithmetic overflow or an attempted huge allocation.
        for stripe_count in [i64::MAX, i64::MAX / 8, 1 << 61] {
            let mut bytes = Vec::new();
            for word in [1i64, 0, 0, 0, 0, 65536, stripe_count] {
                order::push_i64(&mut bytes, word);
            }

            let err = decode(&mut SliceReader::new(&bytes, 1)).unwrap_err();
            assert!(
                err.to_string().contains("allocate"),
                "stripe count {stripe_count} should fail allocation, got: {err}"
            );
        }
    }

    #[test]
    fn test_legacy_truncated_ost_array_is_fatal() {
        let mut bytes = Vec::new();
        for word in [1i64, 0, 0, 0, 0, 65536, 2] {
            order::push_i64(&mut bytes, word);
        }
        order::push_u64(&mut bytes, 11); // only one of the two promised OSTs

        let err = decode(&mut SliceReader::new(&bytes, 1)).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_opposite_endian_decode_matches_native() {
        let rec = sample_record();
        let bytes = encode_to_vec(&rec);
        let swapped = byte_swapped_wire(&rec, &bytes);
        assert_ne!(bytes, swapped);

        let native = decode(&mut SliceReader::new(&bytes, LUSTRE_VER))
            .unwrap()
            .unwrap();
        let foreign = decode(&mut SliceReader::new(&swapped, LUSTRE_VER).swapped())
            .unwrap()
            .unwrap();
        assert_eq!(native, foreign);
        assert_eq!(foreign.components()[0].pool_name(), Some("pool_a"));
    }

    #[test]
    fn test_encode_rejects_ost_count_mismatch() {
        let mut rec = sample_record();
        rec.ost_ids.pop();

        let mut sink = RecordSink::new();
        let err = encode(&mut sink, &rec).unwrap_err();
        assert!(err.to_string().contains("OST id count mismatch"));
        assert!(sink.bytes().is_empty());
    }

    #[test]
    fn test_push_component_rejects_mismatched_osts() {
        let mut rec = LustreRecord::default();
        let err = rec
            .push_component(component(65536, 2, ""), &[1])
            .unwrap_err();
        assert!(err.to_string().contains("OST id count mismatch"));
    }

    #[test]
    fn test_decode_into_reuses_storage() {
        let big = sample_record();
        let mut small = LustreRecord::new(BaseRecord { id: 1, rank: 0 });
        small.push_component(component(65536, 1, ""), &[42]).unwrap();

        let mut sink = RecordSink::new();
        encode(&mut sink, &big).unwrap();
        encode(&mut sink, &small).unwrap();

        let bytes = sink.into_bytes();
        let mut reader = SliceReader::new(&bytes, LUSTRE_VER);
        let mut rec = LustreRecord::default();

        let size = decode_into(&mut reader, &mut rec).unwrap().unwrap();
        assert_eq!(size, big.wire_size());
        assert_eq!(rec, big);

        // The second decode shrinks the record; stale components and OST
        // ids from the first must not leak through.
        let size = decode_into(&mut reader, &mut rec).unwrap().unwrap();
        assert_eq!(size, small.wire_size());
        assert_eq!(rec, small);

        // End of data clears the record, identity included.
        assert!(decode_into(&mut reader, &mut rec).unwrap().is_none());
        assert_eq!(rec, LustreRecord::default());
    }

    #[test]
    fn test_indexed_name() {
        assert_eq!(
            indexed_name("LUSTRE_COMP_STRIPE_SIZE", 1),
            "LUSTRE_COMP1_STRIPE_SIZE"
        );
        assert_eq!(
            indexed_name("LUSTRE_COMP_STRIPE_COUNT", 12),
            "LUSTRE_COMP12_STRIPE_COUNT"
        );
    }

    #[test]
    fn test_pattern_labels() {
        assert_eq!(pattern_label(0), "raid0");
        assert_eq!(pattern_label(2), "mdt");
        assert_eq!(pattern_label(4), "raid0,overstriped");
        assert_eq!(pattern_label(8), "foreign");
        assert_eq!(pattern_label(UNKNOWN_COUNTER), "unknown");
        assert_eq!(pattern_label(3), "unknown");
    }

    #[test]
    fn test_flags_labels() {
        assert_eq!(flags_label(0), "0");
        assert_eq!(flags_label(UNKNOWN_COUNTER), "unknown");
        assert_eq!(flags_label(1), "stale");
        // No trailing separator however many bits are set.
        assert_eq!(flags_label((1 << 0) | (1 << 4)), "stale,init");
        assert_eq!(flags_label((1 << 4) | (1 << 5) | (1 << 11)), "init,nosync,neg");
    }

    #[test]
    fn test_print_uses_global_ost_index() {
        let rec = sample_record();
        let mut out = Vec::new();
        print(&rec, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("LUSTRE_NUM_COMPONENTS\t2"));
        assert!(text.contains("LUSTRE_COMP1_STRIPE_COUNT\t2"));
        assert!(text.contains("LUSTRE_COMP1_POOL_NAME\tpool_a"));
        // Empty pool name renders as unknown.
        assert!(text.contains("LUSTRE_COMP2_POOL_NAME\tunknown"));
        // Component 2's single OST is named with its local index 0 but its
        // value comes from global array position 2.
        assert!(text.contains("LUSTRE_COMP1_OST_ID_0\t10"));
        assert!(text.contains("LUSTRE_COMP1_OST_ID_1\t11"));
        assert!(text.contains("LUSTRE_COMP2_OST_ID_0\t20"));
        assert!(text.contains("LUSTRE_COMP1_STRIPE_PATTERN\traid0"));
        assert!(text.contains("LUSTRE_COMP1_FLAGS\tinit"));
    }

    #[test]
    fn test_pool_name_truncates_at_capacity() {
        let mut comp = Component::new();
        comp.set_pool_name("a_very_long_pool_name_indeed");
        let name = comp.pool_name().unwrap();
        assert_eq!(name.len(), POOL_NAME_LEN - 1);
        assert!("a_very_long_pool_name_indeed".starts_with(name));
    }

    #[test]
    fn test_diff_and_aggregate_are_placeholders() {
        let rec = sample_record();
        let mut out = Vec::new();
        diff(Some(&rec), "a", None, "b", &mut out).unwrap();
        assert!(out.is_empty());

        let mut accum = LustreRecord::default();
        aggregate(&rec, &mut accum, true);
        assert_eq!(accum, LustreRecord::default());
    }
}
