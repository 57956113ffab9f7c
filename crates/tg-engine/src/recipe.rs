//! Preset shapes for all six polyrhythm channels.

use crate::polyrhythm::NUM_POLY_CHANNELS;

/// Target shape for one channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelShape {
    pub steps: u8,
    pub hits: u8,
    pub time_division: f32,
    pub phase: f64,
}

impl ChannelShape {
    const fn new(steps: u8, hits: u8, time_division: f32, phase: f64) -> Self {
        Self { steps, hits, time_division, phase }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternRecipe {
    /// Identical 16/5 patterns drifting apart by a quarter percent per channel.
    PhaseDrift,
    /// Prime step counts, each about half full.
    Primes,
    /// Consecutive Fibonacci steps and hits.
    Fibonacci,
    /// Three call-and-response pairs, the odd one offset by half a cycle.
    Interlock,
}

const PRIMES: [u8; NUM_POLY_CHANNELS] = [2, 3, 5, 7, 11, 13];
const FIBONACCI_STEPS: [u8; NUM_POLY_CHANNELS] = [2, 3, 5, 8, 13, 21];
const FIBONACCI_HITS: [u8; NUM_POLY_CHANNELS] = [1, 2, 3, 5, 8, 13];

/// (steps, hits) for the even and odd channel of each interlock pair, and the pair's speed.
const INTERLOCK_PAIRS: [((u8, u8), (u8, u8), f32); 3] = [
    ((8, 3), (8, 5), 1.0),
    ((12, 5), (12, 7), 0.5),
    ((16, 5), (16, 7), 2.0),
];

impl PatternRecipe {
    pub const ALL: [PatternRecipe; 4] = [
        PatternRecipe::PhaseDrift,
        PatternRecipe::Primes,
        PatternRecipe::Fibonacci,
        PatternRecipe::Interlock,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PatternRecipe::PhaseDrift => "phase-drift",
            PatternRecipe::Primes => "primes",
            PatternRecipe::Fibonacci => "fibonacci",
            PatternRecipe::Interlock => "interlock",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }

    pub fn shapes(self) -> [ChannelShape; NUM_POLY_CHANNELS] {
        core::array::from_fn(|i| match self {
            PatternRecipe::PhaseDrift => {
                ChannelShape::new(16, 5, 1.0 + 0.0025 * i as f32, 0.0)
            }
            PatternRecipe::Primes => {
                let steps = PRIMES[i];
                ChannelShape::new(steps, steps.div_ceil(2), 1.0, 0.0)
            }
            PatternRecipe::Fibonacci => {
                ChannelShape::new(FIBONACCI_STEPS[i], FIBONACCI_HITS[i], 1.0, 0.0)
            }
            PatternRecipe::Interlock => {
                let (even, odd, ratio) = INTERLOCK_PAIRS[i / 2];
                if i % 2 == 0 {
                    ChannelShape::new(even.0, even.1, ratio, 0.0)
                } else {
                    ChannelShape::new(odd.0, odd.1, ratio, 0.5)
                }
            }
        })
    }
}
