//! Variable-length and small integer encodings used by the line info table.
//!
//! Both encodings are self-delimiting: a decoder always knows how many bytes
//! it consumed. The variable-length form stores 7 payload bits per byte,
//! most-significant group first, with bit 0x80 marking a continuation byte.
//! The small form spends one byte on common values and escapes to longer
//! forms for the rest.

/// Worst-case byte length of a variable-length encoded `u32`.
pub const VLQ_MAX_SIZE: usize = 5;

/// Worst-case byte length of a small encoded `u32` (escape byte + VLQ).
pub const SMALL_MAX_SIZE: usize = 1 + VLQ_MAX_SIZE;

const SMALL_TWO_BYTE_ESCAPE: u8 = 254;
const SMALL_VLQ_ESCAPE: u8 = 255;
const SMALL_TWO_BYTE_BASE: u32 = 254;
const SMALL_VLQ_BASE: u32 = 254 + 255;

/// Destination for encoded bytes. Implemented by the recorder's page chain
/// and by the packer's counting and writing passes, so the same encoding
/// path serves all of them.
pub trait ByteSink {
    fn put_byte(&mut self, byte: u8);
}

impl ByteSink for Vec<u8> {
    fn put_byte(&mut self, byte: u8) {
        self.push(byte);
    }
}

pub fn vlq_size(value: u32) -> usize {
    let mut size = 1;
    let mut rest = value >> 7;
    while rest != 0 {
        size += 1;
        rest >>= 7;
    }
    size
}

pub fn vlq_encode<S: ByteSink>(out: &mut S, value: u32) {
    let size = vlq_size(value);
    for i in (1..size).rev() {
        out.put_byte(0x80 | ((value >> (7 * i)) & 0x7f) as u8);
    }
    out.put_byte((value & 0x7f) as u8);
}

pub fn vlq_decode(buf: &[u8], pos: &mut usize) -> u32 {
    let mut value = 0u32;
    loop {
        debug_assert!(*pos < buf.len());
        let byte = buf.get(*pos).copied().unwrap_or(0);
        *pos += 1;
        value = (value << 7) | (byte & 0x7f) as u32;
        if byte & 0x80 == 0 {
            return value;
        }
    }
}

pub fn small_encode<S: ByteSink>(out: &mut S, value: u32) {
    if value < SMALL_TWO_BYTE_BASE {
        out.put_byte(value as u8);
    } else if value < SMALL_VLQ_BASE {
        out.put_byte(SMALL_TWO_BYTE_ESCAPE);
        out.put_byte((value - SMALL_TWO_BYTE_BASE) as u8);
    } else {
        out.put_byte(SMALL_VLQ_ESCAPE);
        vlq_encode(out, value - SMALL_VLQ_BASE);
    }
}

pub fn small_decode(buf: &[u8], pos: &mut usize) -> u32 {
    debug_assert!(*pos < buf.len());
    let byte = buf.get(*pos).copied().unwrap_or(0);
    *pos += 1;
    match byte {
        SMALL_TWO_BYTE_ESCAPE => {
            debug_assert!(*pos < buf.len());
            let next = buf.get(*pos).copied().unwrap_or(0);
            *pos += 1;
            SMALL_TWO_BYTE_BASE + next as u32
        }
        SMALL_VLQ_ESCAPE => SMALL_VLQ_BASE + vlq_decode(buf, pos),
        _ => byte as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq_bytes(value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        vlq_encode(&mut out, value);
        out
    }

    fn small_bytes(value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        small_encode(&mut out, value);
        out
    }

    #[test]
    fn vlq_roundtrip() {
        let values = [
            0u32,
            1,
            0x7f,
            0x80,
            0x3fff,
            0x4000,
            0x1f_ffff,
            0x20_0000,
            0xfff_ffff,
            0x1000_0000,
            u32::MAX,
        ];
        for &v in &values {
            let bytes = vlq_bytes(v);
            assert_eq!(bytes.len(), vlq_size(v));
            let mut pos = 0;
            assert_eq!(vlq_decode(&bytes, &mut pos), v);
            assert_eq!(pos, bytes.len());
        }
    }

    #[test]
    fn vlq_is_minimal_and_msb_first() {
        assert_eq!(vlq_bytes(0), [0x00]);
        assert_eq!(vlq_bytes(0x7f), [0x7f]);
        assert_eq!(vlq_bytes(0x80), [0x81, 0x00]);
        assert_eq!(vlq_bytes(0x3fff), [0xff, 0x7f]);
        assert_eq!(vlq_bytes(0x4000), [0x81, 0x80, 0x00]);
        assert_eq!(vlq_bytes(u32::MAX).len(), VLQ_MAX_SIZE);
    }

    #[test]
    fn vlq_sequence_is_self_delimiting() {
        let values = [5u32, 0x80, 0, u32::MAX, 127];
        let mut bytes = Vec::new();
        for &v in &values {
            vlq_encode(&mut bytes, v);
        }
        let mut pos = 0;
        for &v in &values {
            assert_eq!(vlq_decode(&bytes, &mut pos), v);
        }
        assert_eq!(pos, bytes.len());
    }

    #[test]
    fn small_thresholds() {
        assert_eq!(small_bytes(0), [0]);
        assert_eq!(small_bytes(253), [253]);
        assert_eq!(small_bytes(254), [254, 0]);
        assert_eq!(small_bytes(508), [254, 254]);
        assert_eq!(small_bytes(509), [255, 0x00]);
        assert_eq!(small_bytes(510), [255, 0x01]);
    }

    #[test]
    fn small_roundtrip() {
        let values = [0u32, 1, 126, 127, 253, 254, 508, 509, 510, 1961, 0x1_0000, u32::MAX];
        for &v in &values {
            let bytes = small_bytes(v);
            assert!(bytes.len() <= SMALL_MAX_SIZE);
            let mut pos = 0;
            assert_eq!(small_decode(&bytes, &mut pos), v);
            assert_eq!(pos, bytes.len());
        }
    }

    #[test]
    fn small_worst_case_bound() {
        assert_eq!(small_bytes(u32::MAX).len(), SMALL_MAX_SIZE);
    }
}
