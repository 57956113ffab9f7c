//! Topographic pattern generator.
//!
//! Each engine turns a map position plus per-part density into a 6-bit
//! mask every pulse: bits 0-2 are the kick/snare/hi-hat triggers, bits 3-5
//! their accents.
//!
//! Parameters are written by the UI thread and read here through atomics.
//! Counters and the last mask are owned by whichever thread ticks the
//! generator and are published back through [`EngineStatus`] for display.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU8, Ordering};

use tg_core::{
    check_part, euclidean_bits, DensityMap, EngineScene, LogicMode, PartMode, Position,
    NUM_PARTS, PULSES_PER_STEP, STEPS_PER_PATTERN,
};

/// Blended level above which a firing part is accented.
pub const ACCENT_THRESHOLD: u8 = 192;

/// Default per-part density and Euclidean length parameter.
pub const DEFAULT_DENSITY: u8 = 127;

/// Parameters of one engine, written by the UI.
#[derive(Debug)]
pub struct EngineParams {
    x: AtomicU8,
    y: AtomicU8,
    randomness: AtomicU8,
    density: [AtomicU8; NUM_PARTS],
    mode: [AtomicU8; NUM_PARTS],
    euclidean_length: [AtomicU8; NUM_PARTS],
    logic: [AtomicU8; NUM_PARTS],
}

impl EngineParams {
    pub fn new() -> Self {
        Self {
            x: AtomicU8::new(0),
            y: AtomicU8::new(0),
            randomness: AtomicU8::new(0),
            density: core::array::from_fn(|_| AtomicU8::new(DEFAULT_DENSITY)),
            mode: core::array::from_fn(|_| AtomicU8::new(PartMode::Topographic as u8)),
            euclidean_length: core::array::from_fn(|_| AtomicU8::new(DEFAULT_DENSITY)),
            logic: core::array::from_fn(|_| AtomicU8::new(LogicMode::Pass as u8)),
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x.load(Ordering::Relaxed), self.y.load(Ordering::Relaxed))
    }

    pub fn set_position(&self, position: Position) {
        self.x.store(position.x, Ordering::Relaxed);
        self.y.store(position.y, Ordering::Relaxed);
    }

    pub fn randomness(&self) -> u8 {
        self.randomness.load(Ordering::Relaxed)
    }

    pub fn set_randomness(&self, value: u8) {
        self.randomness.store(value, Ordering::Relaxed);
    }

    pub fn density(&self, part: usize) -> u8 {
        check_part(part);
        self.density[part].load(Ordering::Relaxed)
    }

    pub fn set_density(&self, part: usize, value: u8) {
        check_part(part);
        self.density[part].store(value, Ordering::Relaxed);
    }

    pub fn mode(&self, part: usize) -> PartMode {
        check_part(part);
        PartMode::from_u8(self.mode[part].load(Ordering::Relaxed))
    }

    pub fn set_mode(&self, part: usize, mode: PartMode) {
        check_part(part);
        self.mode[part].store(mode as u8, Ordering::Relaxed);
    }

    /// Raw length parameter; the effective pattern length is `(value >> 3) + 1`.
    pub fn euclidean_length(&self, part: usize) -> u8 {
        check_part(part);
        self.euclidean_length[part].load(Ordering::Relaxed)
    }

    pub fn set_euclidean_length(&self, part: usize, value: u8) {
        check_part(part);
        self.euclidean_length[part].store(value, Ordering::Relaxed);
    }

    pub fn logic_mode(&self, part: usize) -> LogicMode {
        check_part(part);
        LogicMode::from_u8(self.logic[part].load(Ordering::Relaxed))
    }

    pub fn set_logic_mode(&self, part: usize, mode: LogicMode) {
        check_part(part);
        self.logic[part].store(mode as u8, Ordering::Relaxed);
    }

    /// Overwrite position, densities and randomness from a scene.
    pub fn apply_scene(&self, scene: &EngineScene) {
        self.set_position(scene.position);
        for (part, &density) in scene.density.iter().enumerate() {
            self.density[part].store(density, Ordering::Relaxed);
        }
        self.set_randomness(scene.randomness);
    }

    /// Capture the morphable subset of the parameters.
    pub fn snapshot(&self) -> EngineScene {
        EngineScene {
            position: self.position(),
            density: core::array::from_fn(|part| self.density[part].load(Ordering::Relaxed)),
            randomness: self.randomness(),
        }
    }
}

impl Default for EngineParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters published by the ticking thread, read by the UI.
#[derive(Debug, Default)]
pub struct EngineStatus {
    step: AtomicU8,
    pulse: AtomicU8,
    mask: AtomicU8,
}

impl EngineStatus {
    pub fn step(&self) -> u8 {
        self.step.load(Ordering::Relaxed)
    }

    pub fn pulse(&self) -> u8 {
        self.pulse.load(Ordering::Relaxed)
    }

    /// Last evaluated trigger/accent mask.
    pub fn mask(&self) -> u8 {
        self.mask.load(Ordering::Relaxed)
    }
}

/// Parameters plus status of one engine, shared between threads.
#[derive(Debug, Default)]
pub struct EngineShared {
    pub params: EngineParams,
    pub status: EngineStatus,
}

/// Per-engine rhythm state machine.
#[derive(Debug)]
pub struct PatternGenerator {
    map: DensityMap,
    shared: Arc<EngineShared>,
    step: u8,
    pulse: u8,
    euclidean_step: [u8; NUM_PARTS],
    perturbation: [u8; NUM_PARTS],
    /// Set when a new cycle starts, cleared by the next evaluation.
    reroll: bool,
    rng: fastrand::Rng,
}

impl PatternGenerator {
    pub fn new(map: DensityMap, seed: u64) -> Self {
        Self {
            map,
            shared: Arc::new(EngineShared::default()),
            step: 0,
            pulse: 0,
            euclidean_step: [0; NUM_PARTS],
            perturbation: [0; NUM_PARTS],
            reroll: true,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Handle for the UI side: write params, read status.
    pub fn shared(&self) -> &Arc<EngineShared> {
        &self.shared
    }

    pub fn params(&self) -> &EngineParams {
        &self.shared.params
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn pulse(&self) -> u8 {
        self.pulse
    }

    /// Perturbation currently added to each part's level.
    pub fn perturbation(&self) -> [u8; NUM_PARTS] {
        self.perturbation
    }

    /// Evaluate at the engine's own position, then advance by `pulses`.
    pub fn tick(&mut self, pulses: u8) -> u8 {
        let position = self.shared.params.position();
        self.tick_at(pulses, position)
    }

    /// Evaluate the current step at `position`, publish and return the mask,
    /// then advance by `pulses`.
    pub fn tick_at(&mut self, pulses: u8, position: Position) -> u8 {
        let mask = self.evaluate(position);
        self.shared.status.mask.store(mask, Ordering::Relaxed);
        self.advance(pulses);
        mask
    }

    /// Skip ahead one whole step without evaluating it.
    pub fn fast_forward(&mut self) {
        self.advance(PULSES_PER_STEP);
    }

    /// Return to the top of the pattern.
    pub fn reset(&mut self) {
        self.step = 0;
        self.pulse = 0;
        self.euclidean_step = [0; NUM_PARTS];
        self.perturbation = [0; NUM_PARTS];
        self.reroll = true;
        self.shared.status.mask.store(0, Ordering::Relaxed);
        self.publish_position();
    }

    fn evaluate(&mut self, position: Position) -> u8 {
        let params = &self.shared.params;

        // Perturbation is rolled once per pattern cycle and held for the rest
        // of it, even when step 0 itself was skipped.
        if self.reroll {
            self.reroll = false;
            let randomness = (params.randomness() >> 2) as u16;
            for p in self.perturbation.iter_mut() {
                *p = ((self.rng.u8(..) as u16 * randomness) >> 8) as u8;
            }
        }

        let mut triggers = 0u8;
        let mut accents = 0u8;
        for part in 0..NUM_PARTS {
            let bit = 1u8 << part;
            let density = params.density[part].load(Ordering::Relaxed);
            let (fire, accent) = match PartMode::from_u8(params.mode[part].load(Ordering::Relaxed)) {
                PartMode::Topographic => {
                    let offset = part * STEPS_PER_PATTERN as usize + self.step as usize;
                    let level = self
                        .map
                        .level(position, offset)
                        .saturating_add(self.perturbation[part]);
                    let fire = level > 255 - density;
                    (fire, fire && level > ACCENT_THRESHOLD)
                }
                PartMode::Euclidean => euclidean_hit(
                    self.step,
                    &mut self.euclidean_step[part],
                    params.euclidean_length[part].load(Ordering::Relaxed),
                    density,
                ),
            };
            if fire {
                triggers |= bit;
            }
            if accent {
                accents |= bit;
            }
        }
        triggers | (accents << NUM_PARTS)
    }

    fn advance(&mut self, pulses: u8) {
        let mut pulse = self.pulse as u16 + pulses as u16;
        while pulse >= PULSES_PER_STEP as u16 {
            pulse -= PULSES_PER_STEP as u16;
            if self.step & 1 == 0 {
                for sub_step in self.euclidean_step.iter_mut() {
                    *sub_step = sub_step.wrapping_add(1);
                }
            }
            self.step = (self.step + 1) % STEPS_PER_PATTERN;
            if self.step == 0 {
                self.reroll = true;
            }
        }
        self.pulse = pulse as u8;
        self.publish_position();
    }

    fn publish_position(&self) {
        self.shared.status.step.store(self.step, Ordering::Relaxed);
        self.shared.status.pulse.store(self.pulse, Ordering::Relaxed);
    }
}

/// Euclidean lanes run at half resolution: odd steps are silent.
fn euclidean_hit(step: u8, sub_step: &mut u8, raw_length: u8, density: u8) -> (bool, bool) {
    if step & 1 != 0 {
        return (false, false);
    }
    let length = (raw_length >> 3) + 1;
    let filled = density >> 3;
    while *sub_step >= length {
        *sub_step -= length;
    }
    let fire = euclidean_bits(length, filled) & (1u32 << *sub_step) != 0;
    (fire, fire && *sub_step == 0)
}
