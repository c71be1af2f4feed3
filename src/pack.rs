//! Finalizer: turns the recorder's raw event chain into the chunked table.
//!
//! The same reconciliation and packing loop runs twice, parameterized by a
//! byte sink: pass 1 counts the total size, pass 2 writes into a buffer
//! allocated once at exactly that size. Raw offsets are remapped through
//! the emitter's [`OffsetTable`] and events that collapse onto an already
//! produced offset, or repeat the previous position, are dropped.

use crate::difference::{difference_get, difference_token};
use crate::layout::OffsetTable;
use crate::recorder::{LineInfoRecorder, RawEvents};
use crate::table::{LineInfo, COLUMN_DEFAULT};
use crate::vlq::{small_decode, small_encode, vlq_encode, vlq_size, ByteSink, SMALL_MAX_SIZE};

/// Most entries a single stream may hold.
pub const STREAM_VALUE_COUNT_MAX: usize = 48;

/// Smallest possible closed stream: every entry is at least two bytes and
/// the terminal entry's end offset shrinks to one.
pub const STREAM_SIZE_MIN: usize = 2 * STREAM_VALUE_COUNT_MAX - 1;

/// Worst-case growth of a closed stream from one more entry: a terminal end
/// offset byte plus full-size line and column values. Derived from the
/// scalar codec's worst case rather than copied as a literal, so a wider
/// value type re-derives it.
pub const STREAM_VALUE_MAX_SIZE: usize = 2 * SMALL_MAX_SIZE + 1;

/// A stream beyond this size is closed; the bound keeps the closed size,
/// less [`STREAM_SIZE_MIN`], within the one-byte stream length field.
pub const STREAM_SIZE_LIMIT: usize = STREAM_SIZE_MIN + 255 - STREAM_VALUE_MAX_SIZE;

const STREAM_BUFFER_SIZE: usize = STREAM_SIZE_LIMIT + 3 * SMALL_MAX_SIZE;

struct CountSink {
    len: usize,
}

impl ByteSink for CountSink {
    fn put_byte(&mut self, _byte: u8) {
        self.len += 1;
    }
}

#[derive(Copy, Clone)]
struct Event {
    offset: u32,
    line: u32,
    column: u32,
}

/// Raw recorder events after offset translation and deduplication. The
/// first event reaching a final offset wins; later collapsed events
/// described bytecode that compaction removed.
struct Events<'a> {
    raw: RawEvents<'a>,
    offsets: &'a OffsetTable,
    last: Option<Event>,
}

impl Iterator for Events<'_> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        for (raw_offset, line, column) in self.raw.by_ref() {
            let offset = self.offsets.translate(raw_offset);
            if let Some(last) = self.last {
                if offset == last.offset {
                    continue;
                }
                if line == last.line && column == last.column {
                    continue;
                }
            }
            let event = Event {
                offset,
                line,
                column,
            };
            self.last = Some(event);
            return Some(event);
        }
        None
    }
}

/// Accumulates one chunk's stream in a fixed buffer sized for the worst
/// case overshoot of the final append before the limit check.
struct ChunkBuilder {
    buffer: [u8; STREAM_BUFFER_SIZE],
    len: usize,
    entry_count: usize,
    start_offset: u32,
    start_line: u32,
    line: u32,
    column: u32,
    last_end_offset: u32,
    last_entry_pos: usize,
    last_end_size: usize,
}

impl ByteSink for ChunkBuilder {
    fn put_byte(&mut self, byte: u8) {
        debug_assert!(self.len < STREAM_BUFFER_SIZE);
        self.buffer[self.len] = byte;
        self.len += 1;
    }
}

impl ChunkBuilder {
    fn open(start_offset: u32, start_line: u32) -> Self {
        Self {
            buffer: [0; STREAM_BUFFER_SIZE],
            len: 0,
            entry_count: 0,
            start_offset,
            start_line,
            line: start_line,
            column: COLUMN_DEFAULT,
            last_end_offset: start_offset,
            last_entry_pos: 0,
            last_end_size: 0,
        }
    }

    fn position_values(&mut self, line: u32, column: u32, has_line: bool) {
        if has_line {
            let token = difference_get(line, self.line);
            small_encode(self, token);
            self.line = line;
            self.column = COLUMN_DEFAULT;
        }
        let token = difference_token(column, self.column);
        small_encode(self, token);
        self.column = column;
        self.entry_count += 1;
    }

    /// Appends the entry for `event`, whose position holds until
    /// `end_offset` (the next event's offset).
    fn append(&mut self, event: Event, end_offset: u32) {
        debug_assert!(end_offset > self.last_end_offset);
        let end_delta = end_offset - self.last_end_offset;
        debug_assert!(end_delta <= u32::MAX >> 1);
        let has_line = event.line != self.line;

        self.last_entry_pos = self.len;
        small_encode(self, (end_delta << 1) | has_line as u32);
        self.last_end_size = self.len - self.last_entry_pos;
        self.position_values(event.line, event.column, has_line);
        self.last_end_offset = end_offset;
    }

    /// Appends an unterminated entry: the position extends onwards.
    fn append_terminal(&mut self, line: u32, column: u32) {
        let has_line = line != self.line;
        small_encode(self, has_line as u32);
        self.position_values(line, column, has_line);
    }

    fn is_full(&self) -> bool {
        self.entry_count >= STREAM_VALUE_COUNT_MAX || self.len > STREAM_SIZE_LIMIT
    }

    /// Rewrites the last entry's end offset delta to zero, keeping only its
    /// has-line flag, which marks the entry as unterminated.
    fn terminate_last_entry(&mut self) {
        let pos = self.last_entry_pos;
        let size = self.last_end_size;
        debug_assert!(size > 0);
        let mut peek = pos;
        let flag = small_decode(&self.buffer, &mut peek) & 1;
        self.buffer.copy_within(pos + size..self.len, pos + 1);
        self.buffer[pos] = flag as u8;
        self.len -= size - 1;
    }

    fn flush<S: ByteSink>(&self, sink: &mut S, prev_chunk_line: u32, covered: Option<u32>) {
        vlq_encode(sink, difference_token(self.start_line, prev_chunk_line));
        match covered {
            Some(end_offset) => {
                let stream_length = self.len - STREAM_SIZE_MIN;
                debug_assert!((1..=255).contains(&stream_length));
                sink.put_byte(stream_length as u8);
                for &byte in &self.buffer[..self.len] {
                    sink.put_byte(byte);
                }
                vlq_encode(sink, end_offset - self.start_offset);
            }
            None => {
                sink.put_byte(0);
                for &byte in &self.buffer[..self.len] {
                    sink.put_byte(byte);
                }
            }
        }
    }
}

fn pack_into<S: ByteSink>(recorder: &LineInfoRecorder, offsets: &OffsetTable, sink: &mut S) {
    let mut events = Events {
        raw: recorder.raw_events(),
        offsets,
        last: None,
    };
    let mut prev_chunk_line = 1u32;

    let (mut builder, mut pending) = match events.next() {
        Some(event) => (ChunkBuilder::open(0, event.line), event),
        None => {
            // No recorded positions: a lone terminal chunk at the defaults.
            let mut builder = ChunkBuilder::open(0, 1);
            builder.append_terminal(1, COLUMN_DEFAULT);
            builder.flush(sink, prev_chunk_line, None);
            return;
        }
    };

    for event in events {
        builder.append(pending, event.offset);
        pending = event;
        if builder.is_full() {
            builder.terminate_last_entry();
            builder.flush(sink, prev_chunk_line, Some(event.offset));
            prev_chunk_line = builder.start_line;
            builder = ChunkBuilder::open(event.offset, event.line);
        }
    }

    builder.append_terminal(pending.line, pending.column);
    builder.flush(sink, prev_chunk_line, None);
}

/// Packs the recorder's events, reconciled against the emitter's layout
/// table, into an exact-size owned buffer. Called once per successfully
/// compiled function; the recorder's page chain is released on return.
pub fn finalize(recorder: LineInfoRecorder, offsets: &OffsetTable) -> LineInfo {
    let mut counter = CountSink { len: 0 };
    pack_into(&recorder, offsets, &mut counter);
    let total = counter.len;
    debug_assert!(total <= u32::MAX as usize);

    let mut bytes = Vec::with_capacity(vlq_size(total as u32) + total);
    vlq_encode(&mut bytes, total as u32);
    pack_into(&recorder, offsets, &mut bytes);
    debug_assert_eq!(bytes.len(), bytes.capacity());
    LineInfo::from_packed(bytes)
}
