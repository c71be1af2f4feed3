//! Incremental source-position recorder fed by the bytecode emitter.
//!
//! During compilation every candidate position change is appended as a
//! delta-encoded `(offset, optional line, column)` triple into a chain of
//! fixed-size pages. The chain is transient: it is owned by the in-progress
//! compilation and either consumed by the finalizer or dropped when the
//! compilation aborts.

use crate::difference::{difference_get, difference_token, difference_update};
use crate::vlq::{vlq_encode, ByteSink};

/// Capacity of one recorder page.
pub const LINE_INFO_PAGE_SIZE: usize = 64;

struct LineInfoPage {
    used: u8,
    bytes: [u8; LINE_INFO_PAGE_SIZE],
}

/// Growable chain of fixed-size pages. An encoded entry may span pages.
struct PageChain {
    pages: Vec<LineInfoPage>,
}

impl ByteSink for PageChain {
    fn put_byte(&mut self, byte: u8) {
        let full = match self.pages.last() {
            Some(page) => page.used as usize == LINE_INFO_PAGE_SIZE,
            None => true,
        };
        if full {
            self.pages.push(LineInfoPage {
                used: 0,
                bytes: [0; LINE_INFO_PAGE_SIZE],
            });
        }
        if let Some(page) = self.pages.last_mut() {
            page.bytes[page.used as usize] = byte;
            page.used += 1;
        }
    }
}

pub struct LineInfoRecorder {
    chain: PageChain,
    byte_code_position: u32,
    line: u32,
    column: u32,
}

impl LineInfoRecorder {
    /// Creating a recorder is cheap; the page chain is allocated lazily on
    /// the first recorded event.
    pub fn new() -> Self {
        Self {
            chain: PageChain { pages: Vec::new() },
            byte_code_position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Records that the bytecode emitted from `byte_code_position` onwards
    /// belongs to `(line, column)`. Offsets must not decrease between calls.
    /// Updates that advance neither the offset nor the position are dropped.
    pub fn append(&mut self, byte_code_position: u32, line: u32, column: u32) {
        debug_assert!(byte_code_position >= self.byte_code_position);

        if !self.chain.pages.is_empty() {
            if byte_code_position == self.byte_code_position {
                return;
            }
            if line == self.line && column == self.column {
                return;
            }
        }

        let pos_delta = byte_code_position - self.byte_code_position;
        debug_assert!(pos_delta <= u32::MAX >> 1);
        let has_line = line != self.line;

        vlq_encode(&mut self.chain, (pos_delta << 1) | has_line as u32);
        if has_line {
            vlq_encode(&mut self.chain, difference_get(line, self.line));
            self.line = line;
        }
        vlq_encode(&mut self.chain, difference_token(column, self.column));
        self.column = column;
        self.byte_code_position = byte_code_position;
    }

    /// True until the first event has been recorded.
    pub fn is_empty(&self) -> bool {
        self.chain.pages.is_empty()
    }

    /// Total raw bytes held by the page chain.
    pub fn byte_size(&self) -> usize {
        self.chain.pages.iter().map(|page| page.used as usize).sum()
    }

    pub(crate) fn raw_events(&self) -> RawEvents<'_> {
        RawEvents {
            reader: RecorderReader {
                pages: &self.chain.pages,
                page: 0,
                pos: 0,
            },
            byte_code_position: 0,
            line: 1,
            column: 1,
        }
    }
}

impl Default for LineInfoRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte cursor over the page chain; entries may continue across a page
/// boundary, so reads are byte-granular.
struct RecorderReader<'a> {
    pages: &'a [LineInfoPage],
    page: usize,
    pos: usize,
}

impl RecorderReader<'_> {
    fn at_end(&self) -> bool {
        self.page >= self.pages.len()
    }

    fn next_byte(&mut self) -> u8 {
        debug_assert!(!self.at_end());
        let page = &self.pages[self.page];
        let byte = page.bytes[self.pos];
        self.pos += 1;
        if self.pos == page.used as usize {
            self.page += 1;
            self.pos = 0;
        }
        byte
    }

    fn vlq(&mut self) -> u32 {
        let mut value = 0u32;
        while !self.at_end() {
            let byte = self.next_byte();
            value = (value << 7) | (byte & 0x7f) as u32;
            if byte & 0x80 == 0 {
                break;
            }
        }
        value
    }
}

/// Replays the recorded entries as absolute `(offset, line, column)`
/// triples, mirroring the cursor updates performed by `append`.
pub(crate) struct RawEvents<'a> {
    reader: RecorderReader<'a>,
    byte_code_position: u32,
    line: u32,
    column: u32,
}

impl Iterator for RawEvents<'_> {
    type Item = (u32, u32, u32);

    fn next(&mut self) -> Option<(u32, u32, u32)> {
        if self.reader.at_end() {
            return None;
        }
        let value = self.reader.vlq();
        self.byte_code_position += value >> 1;
        if value & 1 != 0 {
            self.line = difference_update(self.line, self.reader.vlq());
        }
        self.column = difference_update(self.column, self.reader.vlq());
        Some((self.byte_code_position, self.line, self.column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(recorder: &LineInfoRecorder) -> Vec<(u32, u32, u32)> {
        recorder.raw_events().collect()
    }

    #[test]
    fn first_event_is_always_recorded() {
        let mut recorder = LineInfoRecorder::new();
        assert!(recorder.is_empty());
        recorder.append(0, 1, 1);
        assert!(!recorder.is_empty());
        assert_eq!(collect(&recorder), [(0, 1, 1)]);
    }

    #[test]
    fn replay_matches_recorded_events() {
        let mut recorder = LineInfoRecorder::new();
        recorder.append(0, 1, 1);
        recorder.append(10, 1, 5);
        recorder.append(20, 2, 1);
        recorder.append(1000, 2, 40);
        assert_eq!(
            collect(&recorder),
            [(0, 1, 1), (10, 1, 5), (20, 2, 1), (1000, 2, 40)]
        );
    }

    #[test]
    fn line_decrease_is_recorded_exactly() {
        let mut recorder = LineInfoRecorder::new();
        recorder.append(4, 20, 3);
        recorder.append(9, 7, 30);
        assert_eq!(collect(&recorder), [(4, 20, 3), (9, 7, 30)]);
    }

    #[test]
    fn same_offset_updates_are_dropped() {
        let mut recorder = LineInfoRecorder::new();
        recorder.append(5, 1, 2);
        let size = recorder.byte_size();
        recorder.append(5, 3, 9);
        assert_eq!(recorder.byte_size(), size);
        assert_eq!(collect(&recorder), [(5, 1, 2)]);
    }

    #[test]
    fn same_position_updates_are_dropped() {
        let mut recorder = LineInfoRecorder::new();
        recorder.append(0, 2, 2);
        let size = recorder.byte_size();
        recorder.append(9, 2, 2);
        recorder.append(14, 2, 2);
        assert_eq!(recorder.byte_size(), size);
        assert_eq!(collect(&recorder), [(0, 2, 2)]);
    }

    #[test]
    fn unchanged_column_after_line_change() {
        let mut recorder = LineInfoRecorder::new();
        recorder.append(0, 1, 8);
        recorder.append(6, 3, 8);
        assert_eq!(collect(&recorder), [(0, 1, 8), (6, 3, 8)]);
    }

    #[test]
    fn entries_span_page_boundaries() {
        let mut recorder = LineInfoRecorder::new();
        let mut expected = Vec::new();
        for i in 0..200u32 {
            // Large deltas force multi-byte encodings across page edges.
            let offset = i * 1000;
            let line = 1 + (i % 90) * 7;
            let column = 1 + (i % 61) * 13;
            recorder.append(offset, line, column);
            match expected.last() {
                Some(&(last_offset, _, _)) if offset == last_offset => {}
                Some(&(_, last_line, last_column)) if (line, column) == (last_line, last_column) => {}
                _ => expected.push((offset, line, column)),
            }
        }
        assert!(recorder.byte_size() > LINE_INFO_PAGE_SIZE);
        assert_eq!(collect(&recorder), expected);
    }
}
