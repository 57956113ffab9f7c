//! Six-channel polyrhythm engine.
//!
//! Every channel owns a phase accumulator in `[0, 1)` that advances by
//! `time_division / (master_beats * PPQN)` per pulse, so channels can run
//! at ratios that never line up on the pulse grid. The phase is cut into
//! `steps` slices and a slice fires when it is a Euclidean hit.
//!
//! Phases are recomputed from a pulse count since the last rebase rather than
//! summed pulse by pulse, so ratios that do land on the grid land exactly.

use tg_core::{is_hit, PPQN};

use crate::recipe::{ChannelShape, PatternRecipe};

/// Number of polyrhythm channels.
pub const NUM_POLY_CHANNELS: usize = 6;

/// Longest channel, in slices.
pub const MAX_POLY_STEPS: u8 = 32;

/// Slowest and fastest channel speed relative to the master bar.
pub const MIN_TIME_DIVISION: f32 = 0.125;
pub const MAX_TIME_DIVISION: f32 = 8.0;

/// Bar length shared by all channels, in quarter notes.
pub const DEFAULT_MASTER_BEATS: f32 = 4.0;
pub const MIN_MASTER_BEATS: f32 = 1.0;
pub const MAX_MASTER_BEATS: f32 = 16.0;

/// Phases this close to a slice edge count as on the edge.
const EDGE_EPSILON: f64 = 1e-9;

/// One independently clocked channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolyChannel {
    steps: u8,
    hits: u8,
    time_division: f32,
    phase: f64,
    /// Phase at the last rebase, and pulses advanced since.
    origin: f64,
    pulses: u64,
    muted: bool,
    soloed: bool,
    /// Set until the first evaluation after a reset, to dispatch the downbeat.
    primed: bool,
}

impl PolyChannel {
    pub fn new(steps: u8, hits: u8, time_division: f32) -> Self {
        let mut channel = Self {
            steps: 1,
            hits: 1,
            time_division: 1.0,
            phase: 0.0,
            origin: 0.0,
            pulses: 0,
            muted: false,
            soloed: false,
            primed: true,
        };
        channel.set_shape(steps, hits, time_division);
        channel
    }

    fn from_shape(shape: &ChannelShape, muted: bool, soloed: bool) -> Self {
        let mut channel = Self::new(shape.steps, shape.hits, shape.time_division);
        channel.phase = wrap_phase(shape.phase);
        channel.rebase();
        channel.muted = muted;
        channel.soloed = soloed;
        channel
    }

    pub fn steps(&self) -> u8 {
        self.steps
    }

    pub fn hits(&self) -> u8 {
        self.hits
    }

    pub fn time_division(&self) -> f32 {
        self.time_division
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_soloed(&self) -> bool {
        self.soloed
    }

    /// Slice the current phase falls in.
    pub fn slice(&self) -> u8 {
        slice_of(self.phase, self.steps)
    }

    /// Whether `slice` carries a hit for this channel's shape.
    pub fn is_hit(&self, slice: u8) -> bool {
        is_hit(self.steps as u32, self.hits as u32, slice as u32)
    }

    /// Clamp and store a new shape. Hits never exceed steps.
    fn set_shape(&mut self, steps: u8, hits: u8, time_division: f32) {
        self.rebase();
        self.steps = steps.clamp(1, MAX_POLY_STEPS);
        self.hits = hits.clamp(1, self.steps);
        self.time_division = if time_division.is_nan() {
            1.0
        } else {
            time_division.clamp(MIN_TIME_DIVISION, MAX_TIME_DIVISION)
        };
    }

    /// Restart the pulse count from the current phase. Needed whenever the
    /// per-pulse delta changes.
    fn rebase(&mut self) {
        self.origin = self.phase;
        self.pulses = 0;
    }

    fn advance(&mut self, pulses_per_cycle: f64) {
        self.pulses += 1;
        let travelled = self.pulses as f64 * self.time_division as f64 / pulses_per_cycle;
        self.phase = wrap_phase(self.origin + travelled);
    }
}

impl Default for PolyChannel {
    fn default() -> Self {
        Self::new(16, 4, 1.0)
    }
}

fn slice_of(phase: f64, steps: u8) -> u8 {
    let scaled = phase * steps as f64;
    let nearest = libm::round(scaled);
    let slice = if libm::fabs(scaled - nearest) < EDGE_EPSILON {
        nearest
    } else {
        libm::floor(scaled)
    };
    (slice as i32).clamp(0, steps as i32 - 1) as u8
}

fn wrap_phase(phase: f64) -> f64 {
    if phase.is_nan() {
        return 0.0;
    }
    let wrapped = phase - libm::floor(phase);
    if wrapped >= 1.0 - EDGE_EPSILON {
        0.0
    } else {
        wrapped
    }
}

#[inline]
#[track_caller]
fn check_channel(channel: usize) {
    assert!(
        channel < NUM_POLY_CHANNELS,
        "poly channel {} out of range (0..{})",
        channel,
        NUM_POLY_CHANNELS
    );
}

/// The six channels plus the master bar they are measured against.
#[derive(Clone, Debug)]
pub struct PolyrhythmEngine {
    channels: [PolyChannel; NUM_POLY_CHANNELS],
    master_beats: f32,
}

impl PolyrhythmEngine {
    pub fn new() -> Self {
        Self {
            channels: [PolyChannel::default(); NUM_POLY_CHANNELS],
            master_beats: DEFAULT_MASTER_BEATS,
        }
    }

    pub fn channel(&self, channel: usize) -> &PolyChannel {
        check_channel(channel);
        &self.channels[channel]
    }

    pub fn channels(&self) -> &[PolyChannel; NUM_POLY_CHANNELS] {
        &self.channels
    }

    pub fn master_beats(&self) -> f32 {
        self.master_beats
    }

    pub fn set_master_beats(&mut self, beats: f32) {
        self.master_beats = if beats.is_nan() {
            DEFAULT_MASTER_BEATS
        } else {
            beats.clamp(MIN_MASTER_BEATS, MAX_MASTER_BEATS)
        };
        for channel in self.channels.iter_mut() {
            channel.rebase();
        }
    }

    /// Reshape one channel. Phase is kept.
    pub fn set_channel(&mut self, channel: usize, steps: u8, hits: u8, time_division: f32) {
        check_channel(channel);
        self.channels[channel].set_shape(steps, hits, time_division);
    }

    pub fn set_mute(&mut self, channel: usize, muted: bool) {
        check_channel(channel);
        self.channels[channel].muted = muted;
    }

    pub fn set_solo(&mut self, channel: usize, soloed: bool) {
        check_channel(channel);
        self.channels[channel].soloed = soloed;
    }

    /// Replace every channel's shape and phase in one assignment.
    pub fn apply_recipe(&mut self, recipe: PatternRecipe) {
        let shapes = recipe.shapes();
        let current = &self.channels;
        let next: [PolyChannel; NUM_POLY_CHANNELS] = core::array::from_fn(|i| {
            PolyChannel::from_shape(&shapes[i], current[i].muted, current[i].soloed)
        });
        self.channels = next;
    }

    /// Rewind every channel to phase 0 and re-arm the downbeat.
    pub fn reset(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.phase = 0.0;
            channel.rebase();
            channel.primed = true;
        }
    }

    /// Whether the next evaluation would dispatch an initial downbeat.
    pub fn is_primed(&self) -> bool {
        self.channels.iter().any(|c| c.primed)
    }

    fn is_audible(&self, channel: &PolyChannel, any_solo: bool) -> bool {
        !channel.muted && (!any_solo || channel.soloed)
    }

    /// Evaluate one pulse. With `advance` the phases move forward first.
    pub fn tick(&mut self, advance: bool) -> [bool; NUM_POLY_CHANNELS] {
        let any_solo = self.channels.iter().any(|c| c.soloed);
        let pulses_per_cycle = self.master_beats as f64 * PPQN as f64;
        let mut fired = [false; NUM_POLY_CHANNELS];

        for i in 0..NUM_POLY_CHANNELS {
            let audible = self.is_audible(&self.channels[i], any_solo);
            let channel = &mut self.channels[i];

            let prev_phase = channel.phase;
            let prev_slice = slice_of(prev_phase, channel.steps);
            if advance {
                channel.advance(pulses_per_cycle);
            }
            let slice = slice_of(channel.phase, channel.steps);

            // Phase only moves forward, so going backwards is a wrap. A
            // single-slice channel has no other boundary to cross.
            let wrapped = advance && channel.phase < prev_phase;
            let crossed = slice != prev_slice
                || wrapped
                || (channel.primed && !advance && channel.phase == 0.0);
            channel.primed = false;

            fired[i] = crossed && audible && channel.is_hit(slice);
        }
        fired
    }
}

impl Default for PolyrhythmEngine {
    fn default() -> Self {
        Self::new()
    }
}
