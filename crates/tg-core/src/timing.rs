//! Clock resolution constants.
//!
//! Everything downstream of the clock counts in pulses. A quarter note is
//! [`PPQN`] pulses, a pattern step is [`PULSES_PER_STEP`] pulses and a
//! pattern is [`STEPS_PER_PATTERN`] steps long.

/// Pulses per quarter note.
pub const PPQN: u32 = 24;

/// Pulses per pattern step (32nd notes at 24 PPQN).
pub const PULSES_PER_STEP: u8 = 3;

/// Steps in one full pattern cycle.
pub const STEPS_PER_PATTERN: u8 = 32;

/// Nanoseconds between pulses at the given tempo.
///
/// Callers are expected to clamp `bpm` to a sane range first; a
/// non-positive tempo yields `u64::MAX` so the clock never spins.
pub fn tick_interval_ns(bpm: f32) -> u64 {
    if bpm <= 0.0 {
        return u64::MAX;
    }
    (60.0e9 / (bpm as f64 * PPQN as f64)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_at_120_bpm() {
        // 60e9 / (120 * 24) = 20_833_333.33
        assert_eq!(tick_interval_ns(120.0), 20_833_333);
    }

    #[test]
    fn zero_bpm_never_ticks() {
        assert_eq!(tick_interval_ns(0.0), u64::MAX);
    }

    #[test]
    fn pattern_is_a_bar_of_32nds() {
        let pulses_per_bar = PULSES_PER_STEP as u32 * STEPS_PER_PATTERN as u32;
        assert_eq!(pulses_per_bar, PPQN * 4);
    }
}
