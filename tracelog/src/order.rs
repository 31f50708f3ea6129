//! Byte-order normalization for multi-byte record fields.
//!
//! Records are written in the producing host's native byte order; the log
//! declares that order, and the reader swaps each multi-byte field when the
//! declared order differs from its own. These helpers read and write 64-bit
//! words at byte offsets with an optional swap. They are pure functions;
//! strings embedded in records are never swapped.

/// Reads a `u64` at `offset`, swapping bytes when `swap` is set.
///
/// # Panics
///
/// Panics if `buf` does not hold 8 bytes at `offset`.
#[inline]
#[must_use]
pub fn read_u64(buf: &[u8], offset: usize, swap: bool) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&buf[offset..offset + 8]);
    let value = u64::from_ne_bytes(word);
    if swap { value.swap_bytes() } else { value }
}

/// Reads an `i64` at `offset`, swapping bytes when `swap` is set.
///
/// # Panics
///
/// Panics if `buf` does not hold 8 bytes at `offset`.
#[inline]
#[must_use]
pub fn read_i64(buf: &[u8], offset: usize, swap: bool) -> i64 {
    read_u64(buf, offset, swap) as i64
}

/// Reads an `f64` at `offset`, swapping the underlying bits when `swap` is set.
///
/// The swap happens on the raw 64-bit word, never on the float value.
///
/// # Panics
///
/// Panics if `buf` does not hold 8 bytes at `offset`.
#[inline]
#[must_use]
pub fn read_f64(buf: &[u8], offset: usize, swap: bool) -> f64 {
    f64::from_bits(read_u64(buf, offset, swap))
}

/// Appends a `u64` to `out` in native byte order.
#[inline]
pub fn push_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_ne_bytes());
}

/// Appends an `i64` to `out` in native byte order.
#[inline]
pub fn push_i64(out: &mut Vec<u8>, value: i64) {
    out.extend_from_slice(&value.to_ne_bytes());
}

/// Appends an `f64` to `out` as its raw bits in native byte order.
#[inline]
pub fn push_f64(out: &mut Vec<u8>, value: f64) {
    out.extend_from_slice(&value.to_bits().to_ne_bytes());
}
