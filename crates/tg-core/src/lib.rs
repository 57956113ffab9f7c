//! Core data model for the topograph sequencer.
//!
//! This crate defines the pieces every other layer shares: the density map
//! resource and its bilinear lookup, Euclidean bit patterns, the per-part
//! logic filter, scene snapshots with their morph, and the timing constants
//! the clock is built on.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod atomic;
mod density_map;
mod density_tables;
mod euclid;
mod logic;
mod part;
mod scene;
pub mod timing;

pub use atomic::AtomicF32;
pub use density_map::{u8_mix, DensityMap, DensityTable, Position, GRID_SIZE, TABLE_LEN};
pub use euclid::{euclidean_bits, is_hit, EUCLIDEAN_PATTERNS};
pub use logic::{apply as apply_logic, LogicMode};
pub use part::{check_engine, check_part, PartMode, NUM_ENGINES, NUM_PARTS};
pub use scene::{interpolate, EngineScene, Scene};
pub use timing::{PPQN, PULSES_PER_STEP, STEPS_PER_PATTERN};
