//! Part and engine indexing.

/// Percussion parts per engine: kick, snare, hi-hat.
pub const NUM_PARTS: usize = 3;

/// Independently positioned pattern engines.
pub const NUM_ENGINES: usize = 2;

/// How a part turns density into triggers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum PartMode {
    /// Threshold the blended density map.
    #[default]
    Topographic = 0,
    /// Evenly distributed hits at half resolution.
    Euclidean = 1,
}

impl PartMode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PartMode::Euclidean,
            _ => PartMode::Topographic,
        }
    }
}

/// Contract check for 3-part accessors.
#[inline]
#[track_caller]
pub fn check_part(part: usize) {
    assert!(part < NUM_PARTS, "part index {} out of range (0..{})", part, NUM_PARTS);
}

/// Contract check for per-engine accessors.
#[inline]
#[track_caller]
pub fn check_engine(engine: usize) {
    assert!(engine < NUM_ENGINES, "engine index {} out of range (0..{})", engine, NUM_ENGINES);
}
