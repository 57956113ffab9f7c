//! Sequencing engine for topograph.
//!
//! Turns clock ticks into pattern triggers, polyrhythm triggers and
//! rate-limited CC modulation.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod dispatch;
mod envelope;
mod pattern;
mod performance;
mod physics;
mod polyrhythm;
mod recipe;
pub mod sequencer;
mod throttle;

pub use dispatch::{
    CcMessage, Dispatcher, Trigger, TriggerSource, ACCENT_VELOCITY, NORMAL_VELOCITY,
};
pub use envelope::{EnvelopeConfig, EnvelopeSequencer, EnvelopeShape, NUM_ENVELOPES};
pub use pattern::{
    EngineParams, EngineShared, EngineStatus, PatternGenerator, ACCENT_THRESHOLD, DEFAULT_DENSITY,
};
pub use performance::{combine, probability_gate, rotate, roll_glitch, CombineMode, Glitch};
pub use physics::PositionPhysics;
pub use polyrhythm::{
    PolyChannel, PolyrhythmEngine, DEFAULT_MASTER_BEATS, MAX_POLY_STEPS, NUM_POLY_CHANNELS,
};
pub use recipe::{ChannelShape, PatternRecipe};
pub use sequencer::{Controls, Sequencer, DEFAULT_BPM, MAX_BPM, MIN_BPM};
pub use throttle::{Drained, ThrottleQueue, DEFAULT_MAX_RATE, MAX_QUEUE};
