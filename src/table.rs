//! Finalized line info table and the offset-to-position decoder.
//!
//! The table is an exact-size byte block: a variable-length encoded total
//! length followed by that many bytes of chunked stream data. Decoding is
//! read-only and allocation free, so a table may be queried from any number
//! of threads once built.

use crate::difference::difference_update;
use crate::error::LineInfoError;
use crate::pack::STREAM_SIZE_MIN;
use crate::vlq::{small_decode, vlq_decode};

/// Column value assumed after a line change until an explicit column is
/// decoded.
pub const COLUMN_DEFAULT: u32 = 127;

/// Owned, immutable line info table attached to a compiled function.
#[derive(Debug)]
pub struct LineInfo {
    bytes: Box<[u8]>,
}

impl LineInfo {
    pub(crate) fn from_packed(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Adopts a serialized table, validating that the length prefix matches
    /// the payload.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, LineInfoError> {
        let mut pos = 0;
        let mut length = 0u32;
        loop {
            let Some(&byte) = bytes.get(pos) else {
                return Err(LineInfoError::TruncatedPrefix);
            };
            pos += 1;
            length = (length << 7) | (byte & 0x7f) as u32;
            if byte & 0x80 == 0 {
                break;
            }
        }
        if bytes.len() - pos != length as usize {
            return Err(LineInfoError::LengthMismatch {
                expected: length,
                actual: bytes.len() - pos,
            });
        }
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Exact allocation size: the length prefix plus the payload it counts.
    /// This is the value the owning function record releases on free.
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn locate(&self, offset: u32) -> (u32, u32) {
        locate(&self.bytes, offset)
    }
}

/// Returns the `(line, column)` recorded for `offset`. Offsets at or past
/// the last recorded position resolve to that last position.
pub fn locate(buffer: &[u8], offset: u32) -> (u32, u32) {
    let (line, column, _) = locate_with_stats(buffer, offset);
    (line, column)
}

/// Decode-side instrumentation, used to assert that chunk skipping never
/// touches a skipped chunk's stream.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DecodeStats {
    pub chunks_skipped: u32,
    pub entries_decoded: u32,
}

pub(crate) fn locate_with_stats(buffer: &[u8], offset: u32) -> (u32, u32, DecodeStats) {
    let mut stats = DecodeStats::default();
    let mut pos = 0usize;
    // The total length only serves the deallocator.
    let _ = vlq_decode(buffer, &mut pos);

    let mut line = 1u32;
    let mut column = COLUMN_DEFAULT;
    let mut chunk_start = 0u32;

    loop {
        line = difference_update(line, vlq_decode(buffer, &mut pos));
        debug_assert!(pos < buffer.len());
        let stream_length = buffer.get(pos).copied().unwrap_or(0);
        pos += 1;
        if stream_length == 0 {
            // Last chunk: no trailing size, search ends here.
            break;
        }
        let stream_size = stream_length as usize + STREAM_SIZE_MIN;
        let mut tail_pos = pos + stream_size;
        let covered = vlq_decode(buffer, &mut tail_pos);
        if offset < chunk_start + covered {
            break;
        }
        // Skip the whole chunk without decoding its stream.
        chunk_start += covered;
        pos = tail_pos;
        stats.chunks_skipped += 1;
    }

    let mut end_offset = chunk_start;
    loop {
        let value = small_decode(buffer, &mut pos);
        stats.entries_decoded += 1;
        if value & 1 != 0 {
            line = difference_update(line, small_decode(buffer, &mut pos));
            column = COLUMN_DEFAULT;
        }
        column = difference_update(column, small_decode(buffer, &mut pos));
        if value >> 1 == 0 {
            // Unterminated entry: this position extends onwards.
            break;
        }
        end_offset += value >> 1;
        if end_offset > offset {
            break;
        }
    }

    (line, column, stats)
}
