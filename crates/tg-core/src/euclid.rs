//! Euclidean rhythm helpers.
//!
//! Hits are spread over steps with the additive test
//! `(i * hits) % steps < hits`, which reproduces the usual Bjorklund
//! patterns up to rotation and always places a hit on step 0.

/// Longest Euclidean pattern, and the number of `filled` levels per length.
const MAX_LENGTH: usize = 32;

/// Additive distribution test for slice `slice` of a `steps`-long pattern.
///
/// `steps` must be non-zero.
#[inline]
pub fn is_hit(steps: u32, hits: u32, slice: u32) -> bool {
    (slice * hits) % steps < hits
}

/// Onset count for a fill level `filled` (0-31) over `length` steps.
const fn hits_for(length: u32, filled: u32) -> u32 {
    let hits = (filled * length + 15) / 31;
    if hits > length {
        length
    } else {
        hits
    }
}

const fn build_patterns() -> [u32; MAX_LENGTH * MAX_LENGTH] {
    let mut table = [0u32; MAX_LENGTH * MAX_LENGTH];
    let mut length = 1;
    while length <= MAX_LENGTH as u32 {
        let mut filled = 0;
        while filled < MAX_LENGTH as u32 {
            let hits = hits_for(length, filled);
            let mut bits = 0u32;
            let mut i = 0;
            while i < length {
                if (i * hits) % length < hits {
                    bits |= 1 << i;
                }
                i += 1;
            }
            table[((length - 1) * MAX_LENGTH as u32 + filled) as usize] = bits;
            filled += 1;
        }
        length += 1;
    }
    table
}

/// Bit patterns addressed as `(length - 1) * 32 + filled`; bit `i` is step `i`.
pub const EUCLIDEAN_PATTERNS: [u32; MAX_LENGTH * MAX_LENGTH] = build_patterns();

/// Pattern bits for `length` (1-32) and fill level `filled` (0-31), clamped.
pub fn euclidean_bits(length: u8, filled: u8) -> u32 {
    let length = length.clamp(1, MAX_LENGTH as u8) as usize;
    let filled = (filled as usize).min(MAX_LENGTH - 1);
    EUCLIDEAN_PATTERNS[(length - 1) * MAX_LENGTH + filled]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteen_four_is_four_on_the_floor() {
        let hits: [u32; 4] = [0, 4, 8, 12];
        for slice in 0..16 {
            assert_eq!(is_hit(16, 4, slice), hits.contains(&slice), "slice {}", slice);
        }
    }

    #[test]
    fn eight_three_is_tresillo() {
        let pattern: [bool; 8] = core::array::from_fn(|i| is_hit(8, 3, i as u32));
        assert_eq!(pattern, [true, false, false, true, false, false, true, false]);
    }

    #[test]
    fn hit_count_matches_request() {
        for steps in 1..=32u32 {
            for hits in 0..=steps {
                let count = (0..steps).filter(|&s| is_hit(steps, hits, s)).count();
                assert_eq!(count as u32, hits, "{}/{}", hits, steps);
            }
        }
    }

    #[test]
    fn table_agrees_with_additive_test() {
        for length in 1..=32u8 {
            for filled in 0..32u8 {
                let bits = euclidean_bits(length, filled);
                let hits = hits_for(length as u32, filled as u32);
                for step in 0..length as u32 {
                    let expected = is_hit(length as u32, hits, step);
                    assert_eq!(bits & (1 << step) != 0, expected);
                }
                // Nothing above the pattern length.
                if length < 32 {
                    assert_eq!(bits >> length, 0);
                }
            }
        }
    }

    #[test]
    fn empty_and_full_fill() {
        assert_eq!(euclidean_bits(16, 0), 0);
        assert_eq!(euclidean_bits(16, 31), 0xFFFF);
        assert_eq!(euclidean_bits(32, 31), u32::MAX);
    }

    #[test]
    fn out_of_range_arguments_clamp() {
        assert_eq!(euclidean_bits(0, 31), euclidean_bits(1, 31));
        assert_eq!(euclidean_bits(200, 200), euclidean_bits(32, 31));
    }
}
