//! Density-map driven modulation envelopes.
//!
//! An envelope walks the 96 table bytes under an engine's position on its
//! own step/pulse counter, shapes the sample and turns it into a 0..=127
//! CC value.

use tg_core::{check_engine, DensityMap, Position, PULSES_PER_STEP, STEPS_PER_PATTERN};

/// Envelope slots per sequencer.
pub const NUM_ENVELOPES: usize = 4;

/// Fraction of the remaining distance covered per tick by smoothed shapes.
const SMOOTHING: f32 = 0.3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum EnvelopeShape {
    #[default]
    Smooth = 0,
    Exponential = 1,
    /// Latched on the first pulse of each step.
    Stepped = 2,
    /// A new random byte every step, ignoring the map.
    Random = 3,
}

impl EnvelopeShape {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => EnvelopeShape::Exponential,
            2 => EnvelopeShape::Stepped,
            3 => EnvelopeShape::Random,
            _ => EnvelopeShape::Smooth,
        }
    }
}

/// Routing and scaling of one envelope slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeConfig {
    pub shape: EnvelopeShape,
    /// Output scale, `0.0..=1.0`.
    pub depth: f32,
    /// Added after scaling, `-127..=127`.
    pub offset: i16,
    /// Engine whose position is sampled.
    pub source_engine: usize,
    pub cc_channel: u8,
    pub param_id: u8,
    pub enabled: bool,
}

impl EnvelopeConfig {
    /// Bring every field into range. Contract-checks the engine index.
    pub fn sanitized(mut self) -> Self {
        check_engine(self.source_engine);
        self.depth = if self.depth.is_nan() { 0.0 } else { self.depth.clamp(0.0, 1.0) };
        self.offset = self.offset.clamp(-127, 127);
        self.cc_channel &= 0x0F;
        self.param_id &= 0x7F;
        self
    }
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            shape: EnvelopeShape::Smooth,
            depth: 1.0,
            offset: 0,
            source_engine: 0,
            cc_channel: 0,
            param_id: 1,
            enabled: false,
        }
    }
}

#[derive(Debug)]
pub struct EnvelopeSequencer {
    config: EnvelopeConfig,
    step: u8,
    pulse: u8,
    smoothed: f32,
    held: u8,
    last_sent: Option<u8>,
    rng: fastrand::Rng,
}

impl EnvelopeSequencer {
    pub fn new(config: EnvelopeConfig, seed: u64) -> Self {
        Self {
            config: config.sanitized(),
            step: 0,
            pulse: 0,
            smoothed: 0.0,
            held: 0,
            last_sent: None,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    /// Replace the config. Counters and smoothing state are kept.
    pub fn set_config(&mut self, config: EnvelopeConfig) {
        self.config = config.sanitized();
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn pulse(&self) -> u8 {
        self.pulse
    }

    /// Sample, shape and smooth the current position, then advance one pulse.
    pub fn tick(&mut self, map: &DensityMap, position: Position) {
        let offset = self.step as usize * PULSES_PER_STEP as usize + self.pulse as usize;
        let sample = map.level(position, offset);

        let target = match self.config.shape {
            EnvelopeShape::Smooth => sample as f32,
            EnvelopeShape::Exponential => {
                let v = sample as u32;
                (v * v * v / (255 * 255)) as f32
            }
            EnvelopeShape::Stepped => {
                if self.pulse == 0 {
                    self.held = sample;
                }
                self.held as f32
            }
            EnvelopeShape::Random => {
                if self.pulse == 0 {
                    self.held = self.rng.u8(..);
                }
                self.held as f32
            }
        };

        match self.config.shape {
            EnvelopeShape::Smooth | EnvelopeShape::Exponential => {
                self.smoothed += (target - self.smoothed) * SMOOTHING;
            }
            EnvelopeShape::Stepped | EnvelopeShape::Random => self.smoothed = target,
        }

        self.pulse += 1;
        if self.pulse >= PULSES_PER_STEP {
            self.pulse = 0;
            self.step = (self.step + 1) % STEPS_PER_PATTERN;
        }
    }

    /// Current output in CC range.
    pub fn value(&self) -> u8 {
        let scaled = self.smoothed / 255.0 * 127.0 * self.config.depth + self.config.offset as f32;
        libm::roundf(scaled.clamp(0.0, 127.0)) as u8
    }

    /// The value if it differs from the last one marked sent.
    pub fn pending(&self) -> Option<u8> {
        let value = self.value();
        (self.last_sent != Some(value)).then_some(value)
    }

    /// Record that `value` was accepted downstream.
    pub fn mark_sent(&mut self, value: u8) {
        self.last_sent = Some(value);
    }

    pub fn reset(&mut self) {
        self.step = 0;
        self.pulse = 0;
        self.smoothed = 0.0;
        self.held = 0;
        self.last_sent = None;
    }
}
