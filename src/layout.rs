//! Post-compaction offset translation supplied by the bytecode emitter.
//!
//! Positions are recorded against the raw bytecode stream, but the emitter
//! compacts that stream before a function is finalized. The emitter reports
//! the surviving byte count of every fixed-size raw page; translating a raw
//! offset means summing the survivors of the preceding pages and clamping
//! within its own page. Raw offsets that point into a page's removed tail
//! collapse onto one final offset, which the finalizer deduplicates.

/// Default raw-page granularity of the emitter's layout metadata.
pub const CBC_STREAM_PAGE_SIZE: u32 = 64;

pub struct OffsetTable {
    page_size: u32,
    kept: Vec<u8>,
    final_start: Vec<u32>,
}

impl OffsetTable {
    /// `kept[i]` is the number of bytes of raw page `i` that survived
    /// compaction. Pages past the end of the table are treated as untouched.
    pub fn new(page_size: u32, kept: Vec<u8>) -> Self {
        debug_assert!(page_size > 0);
        debug_assert!(kept.iter().all(|&k| k as u32 <= page_size));

        let mut final_start = Vec::with_capacity(kept.len() + 1);
        let mut total = 0u32;
        final_start.push(0);
        for &k in &kept {
            total += k as u32;
            final_start.push(total);
        }
        Self {
            page_size,
            kept,
            final_start,
        }
    }

    /// Table for a function whose bytecode was not rearranged.
    pub fn identity() -> Self {
        Self::new(CBC_STREAM_PAGE_SIZE, Vec::new())
    }

    pub fn translate(&self, raw_offset: u32) -> u32 {
        let page = (raw_offset / self.page_size) as usize;
        if page >= self.kept.len() {
            let covered = self.kept.len() as u32 * self.page_size;
            return self.final_start[self.kept.len()] + (raw_offset - covered);
        }
        let within = raw_offset % self.page_size;
        self.final_start[page] + within.min(self.kept[page] as u32)
    }
}

impl Default for OffsetTable {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_leaves_offsets_alone() {
        let table = OffsetTable::identity();
        for &raw in &[0u32, 1, 63, 64, 1000, u32::MAX / 2] {
            assert_eq!(table.translate(raw), raw);
        }
    }

    #[test]
    fn shifts_accumulate_across_pages() {
        // Page 0 lost 4 tail bytes, page 1 is intact, page 2 lost 10.
        let table = OffsetTable::new(64, vec![60, 64, 54]);
        assert_eq!(table.translate(0), 0);
        assert_eq!(table.translate(59), 59);
        assert_eq!(table.translate(64), 60);
        assert_eq!(table.translate(127), 123);
        assert_eq!(table.translate(128), 124);
        assert_eq!(table.translate(128 + 53), 124 + 53);
    }

    #[test]
    fn removed_tail_collapses_offsets() {
        let table = OffsetTable::new(64, vec![60]);
        assert_eq!(table.translate(60), 60);
        assert_eq!(table.translate(62), 60);
        assert_eq!(table.translate(63), 60);
        assert_eq!(table.translate(64), 60);
        assert_eq!(table.translate(65), 61);
    }

    #[test]
    fn beyond_table_is_untouched() {
        let table = OffsetTable::new(64, vec![32]);
        assert_eq!(table.translate(64), 32);
        assert_eq!(table.translate(200), 32 + (200 - 64));
    }

    #[test]
    fn custom_page_size() {
        let table = OffsetTable::new(16, vec![16, 8]);
        assert_eq!(table.translate(15), 15);
        assert_eq!(table.translate(16 + 7), 16 + 7);
        assert_eq!(table.translate(16 + 12), 16 + 8);
        assert_eq!(table.translate(32), 24);
    }
}
