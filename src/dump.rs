//! Diagnostic dump of a finalized line info table.
//!
//! Walks every chunk and entry linearly and prints one line per element.
//! Purely informational; the decoder never depends on it.

use core::fmt::{self, Write};

use crate::difference::difference_update;
use crate::pack::STREAM_SIZE_MIN;
use crate::table::COLUMN_DEFAULT;
use crate::vlq::{small_decode, vlq_decode};

pub fn dump<W: Write>(buffer: &[u8], out: &mut W) -> fmt::Result {
    let mut pos = 0usize;
    let total = vlq_decode(buffer, &mut pos);
    writeln!(out, "line info: {total} bytes")?;

    let mut line = 1u32;
    let mut chunk_start = 0u32;
    let mut index = 0u32;

    loop {
        line = difference_update(line, vlq_decode(buffer, &mut pos));
        let stream_length = buffer.get(pos).copied().unwrap_or(0);
        pos += 1;
        let last = stream_length == 0;
        if last {
            writeln!(out, "chunk {index}: start line {line}, last")?;
        } else {
            let stream_size = stream_length as usize + STREAM_SIZE_MIN;
            let mut tail_pos = pos + stream_size;
            let covered = vlq_decode(buffer, &mut tail_pos);
            writeln!(
                out,
                "chunk {index}: start line {line}, stream {stream_size} bytes, \
                 offsets {chunk_start}..{}",
                chunk_start + covered
            )?;
        }

        let mut entry_line = line;
        let mut column = COLUMN_DEFAULT;
        let mut end_offset = chunk_start;
        loop {
            let value = small_decode(buffer, &mut pos);
            if value & 1 != 0 {
                entry_line = difference_update(entry_line, small_decode(buffer, &mut pos));
                column = COLUMN_DEFAULT;
            }
            column = difference_update(column, small_decode(buffer, &mut pos));
            if value >> 1 == 0 {
                writeln!(out, "  {end_offset}..: line {entry_line}, column {column}")?;
                break;
            }
            let next_end = end_offset + (value >> 1);
            writeln!(
                out,
                "  {end_offset}..{next_end}: line {entry_line}, column {column}"
            )?;
            end_offset = next_end;
        }

        if last {
            return Ok(());
        }
        // Step over the trailing covered-length field.
        let covered = vlq_decode(buffer, &mut pos);
        chunk_start += covered;
        index += 1;
    }
}
