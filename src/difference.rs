//! Direction-flagged delta encoding for line and column values.
//!
//! A difference packs the change between two successive values of the same
//! field into one unsigned token: the low bit carries the direction, the
//! rest the magnitude. Increases are biased by one so that a token of zero
//! is free to mean "no change" (a decrease by zero), which
//! [`difference_token`] exploits for fields that may repeat on the wire.

pub const DIFFERENCE_DECREASE: u32 = 0;
pub const DIFFERENCE_INCREASE: u32 = 1;

/// Encodes the change from `previous` to `current`. The values must differ;
/// callers filter out no-op updates before reaching this point.
pub fn difference_get(current: u32, previous: u32) -> u32 {
    debug_assert!(current != previous);
    let diff = current.wrapping_sub(previous).wrapping_sub(1);
    if diff <= u32::MAX / 2 {
        (diff << 1) | DIFFERENCE_INCREASE
    } else {
        ((u32::MAX - diff) << 1) | DIFFERENCE_DECREASE
    }
}

/// Applies an encoded difference to `value`.
pub fn difference_update(value: u32, encoded: u32) -> u32 {
    if encoded & 1 == DIFFERENCE_INCREASE {
        value.wrapping_add(encoded >> 1).wrapping_add(1)
    } else {
        value.wrapping_sub(encoded >> 1)
    }
}

/// Like [`difference_get`] but maps equal values to the zero token.
pub fn difference_token(current: u32, previous: u32) -> u32 {
    if current == previous {
        0
    } else {
        difference_get(current, previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_on_mixed_pairs() {
        let values = [
            0u32,
            1,
            2,
            126,
            127,
            128,
            1000,
            0x7fff_ffff,
            0x8000_0000,
            u32::MAX - 1,
            u32::MAX,
        ];
        for &prev in &values {
            for &cur in &values {
                if cur == prev {
                    continue;
                }
                let encoded = difference_get(cur, prev);
                assert_eq!(difference_update(prev, encoded), cur, "{prev} -> {cur}");
            }
        }
    }

    #[test]
    fn increase_is_biased_by_one() {
        assert_eq!(difference_get(5, 4), DIFFERENCE_INCREASE);
        assert_eq!(difference_update(4, DIFFERENCE_INCREASE), 5);
        assert_eq!(difference_get(10, 4), (5 << 1) | DIFFERENCE_INCREASE);
    }

    #[test]
    fn decrease_carries_exact_magnitude() {
        assert_eq!(difference_get(3, 5), (2 << 1) | DIFFERENCE_DECREASE);
        assert_eq!(difference_update(5, (2 << 1) | DIFFERENCE_DECREASE), 3);
        assert_eq!(difference_get(1, 127), (126 << 1) | DIFFERENCE_DECREASE);
    }

    #[test]
    fn zero_token_is_a_no_op() {
        assert_eq!(difference_token(7, 7), 0);
        assert_eq!(difference_update(7, 0), 7);
        assert_eq!(difference_token(8, 7), difference_get(8, 7));
    }
}
