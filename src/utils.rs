//! Small conversions shared by the workload and the engine.

use anyhow::Result;
use bytes::Bytes;

/// Read an entire [`Bytes`] slice into a [`String`].
///
/// Returns an error if the slice contains invalid UTF-8.
pub fn string_from_bytes(buf: Bytes) -> Result<String> {
    Ok(String::from_utf8(buf.as_ref().into())?)
}

/// Convert a [`String`] to [`Bytes`].
#[inline]
pub fn string_to_bytes(s: String) -> Bytes {
    Bytes::from(s)
}

/// Splits `lines` into at most `n` contiguous, order-preserving chunks of
/// near-equal size. Never yields an empty chunk.
pub fn partition<T>(lines: &[T], n: usize) -> impl Iterator<Item = &[T]> {
    let n = n.max(1);
    let size = lines.len().div_ceil(n).max(1);
    lines.chunks(size)
}
