//! The per-tick pipeline.
//!
//! A [`Sequencer`] owns both pattern generators, the polyrhythm engine, the
//! envelope slots and the CC governor, and runs them in a fixed order every
//! time the active clock fires. Whoever drives it (internal clock thread or
//! external MIDI clock) holds it behind one lock, so structural edits made
//! between ticks land as a single batch.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use core::time::Duration;

use tg_core::{
    apply_logic, check_engine, interpolate, AtomicF32, DensityMap, Scene, NUM_ENGINES, NUM_PARTS,
};

use crate::dispatch::{CcMessage, Dispatcher, Trigger, TriggerSource};
use crate::envelope::{EnvelopeConfig, EnvelopeSequencer, NUM_ENVELOPES};
use crate::pattern::{EngineShared, PatternGenerator};
use crate::performance::{self, CombineMode, Glitch};
use crate::physics::PositionPhysics;
use crate::polyrhythm::{PolyrhythmEngine, NUM_POLY_CHANNELS};
use crate::throttle::ThrottleQueue;

pub const MIN_BPM: f32 = 30.0;
pub const MAX_BPM: f32 = 300.0;
pub const DEFAULT_BPM: f32 = 120.0;

/// Global performance controls, written by the UI and read every tick.
#[derive(Debug)]
pub struct Controls {
    bpm: AtomicF32,
    swing: AtomicF32,
    morph: AtomicF32,
    probability: AtomicU8,
    glitch: AtomicU8,
    combine: AtomicU8,
    link: AtomicBool,
    poly_active: AtomicBool,
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl Controls {
    pub fn new() -> Self {
        Self {
            bpm: AtomicF32::new(DEFAULT_BPM),
            swing: AtomicF32::new(0.0),
            morph: AtomicF32::new(0.0),
            probability: AtomicU8::new(u8::MAX),
            glitch: AtomicU8::new(0),
            combine: AtomicU8::new(CombineMode::Off as u8),
            link: AtomicBool::new(false),
            poly_active: AtomicBool::new(false),
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm.load()
    }

    pub fn set_bpm(&self, bpm: f32) {
        let bpm = if bpm.is_nan() { DEFAULT_BPM } else { bpm.clamp(MIN_BPM, MAX_BPM) };
        self.bpm.store(bpm);
    }

    pub fn swing(&self) -> f32 {
        self.swing.load()
    }

    pub fn set_swing(&self, swing: f32) {
        self.swing.store(clamp_unit(swing));
    }

    pub fn morph(&self) -> f32 {
        self.morph.load()
    }

    pub fn set_morph(&self, morph: f32) {
        self.morph.store(clamp_unit(morph));
    }

    /// Chance out of 255 that a pattern trigger survives.
    pub fn probability(&self) -> u8 {
        self.probability.load(Ordering::Relaxed)
    }

    pub fn set_probability(&self, value: u8) {
        self.probability.store(value, Ordering::Relaxed);
    }

    /// Chance out of 256 that a landed step is corrupted.
    pub fn glitch(&self) -> u8 {
        self.glitch.load(Ordering::Relaxed)
    }

    pub fn set_glitch(&self, value: u8) {
        self.glitch.store(value, Ordering::Relaxed);
    }

    pub fn combine(&self) -> CombineMode {
        CombineMode::from_u8(self.combine.load(Ordering::Relaxed))
    }

    pub fn set_combine(&self, mode: CombineMode) {
        self.combine.store(mode as u8, Ordering::Relaxed);
    }

    /// Engine B follows engine A's position.
    pub fn link(&self) -> bool {
        self.link.load(Ordering::Relaxed)
    }

    pub fn set_link(&self, on: bool) {
        self.link.store(on, Ordering::Relaxed);
    }

    pub fn poly_active(&self) -> bool {
        self.poly_active.load(Ordering::Relaxed)
    }

    pub fn set_poly_active(&self, on: bool) {
        self.poly_active.store(on, Ordering::Relaxed);
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Sequencer<D: Dispatcher> {
    map: DensityMap,
    engines: [PatternGenerator; NUM_ENGINES],
    poly: PolyrhythmEngine,
    envelopes: [EnvelopeSequencer; NUM_ENVELOPES],
    governor: ThrottleQueue,
    physics: [Option<PositionPhysics>; NUM_ENGINES],
    scenes: [Option<Scene>; 2],
    /// Morph factor last pushed into the engines.
    applied_morph: Option<f32>,
    controls: Arc<Controls>,
    rng: fastrand::Rng,
    dispatcher: D,
}

impl<D: Dispatcher> Sequencer<D> {
    pub fn new(map: DensityMap, dispatcher: D, seed: u64) -> Self {
        Self {
            engines: core::array::from_fn(|e| {
                PatternGenerator::new(map.clone(), seed.wrapping_add(e as u64 + 1))
            }),
            envelopes: core::array::from_fn(|slot| {
                EnvelopeSequencer::new(
                    EnvelopeConfig::default(),
                    seed.wrapping_add((NUM_ENGINES + slot) as u64 + 1),
                )
            }),
            map,
            poly: PolyrhythmEngine::new(),
            governor: ThrottleQueue::default(),
            physics: [None; NUM_ENGINES],
            scenes: [None; 2],
            applied_morph: None,
            controls: Arc::new(Controls::new()),
            rng: fastrand::Rng::with_seed(seed),
            dispatcher,
        }
    }

    pub fn controls(&self) -> &Arc<Controls> {
        &self.controls
    }

    pub fn map(&self) -> &DensityMap {
        &self.map
    }

    pub fn engine(&self, engine: usize) -> &PatternGenerator {
        check_engine(engine);
        &self.engines[engine]
    }

    /// Thread-shared params/status handle of one engine.
    pub fn engine_shared(&self, engine: usize) -> Arc<EngineShared> {
        self.engine(engine).shared().clone()
    }

    pub fn poly(&self) -> &PolyrhythmEngine {
        &self.poly
    }

    pub fn poly_mut(&mut self) -> &mut PolyrhythmEngine {
        &mut self.poly
    }

    pub fn envelope(&self, slot: usize) -> &EnvelopeSequencer {
        check_slot(slot);
        &self.envelopes[slot]
    }

    pub fn set_envelope(&mut self, slot: usize, config: EnvelopeConfig) {
        check_slot(slot);
        self.envelopes[slot].set_config(config);
    }

    /// Load one of the two morph endpoints. The morph is re-applied on the next tick.
    pub fn set_scene(&mut self, slot: usize, scene: Option<Scene>) {
        assert!(slot < 2, "scene slot {} out of range (0..2)", slot);
        self.scenes[slot] = scene;
        self.applied_morph = None;
    }

    pub fn scene(&self, slot: usize) -> Option<&Scene> {
        self.scenes.get(slot).and_then(Option::as_ref)
    }

    /// Snapshot the live engine parameters.
    pub fn capture_scene(&self) -> Scene {
        Scene {
            engines: core::array::from_fn(|e| self.engines[e].params().snapshot()),
        }
    }

    pub fn set_physics(&mut self, engine: usize, physics: Option<PositionPhysics>) {
        check_engine(engine);
        self.physics[engine] = physics;
    }

    pub fn physics(&self, engine: usize) -> Option<&PositionPhysics> {
        check_engine(engine);
        self.physics[engine].as_ref()
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    /// Queue a CC through the governor. False when the window is full.
    pub fn enqueue_cc(&mut self, msg: CcMessage, now: Duration) -> bool {
        self.governor.enqueue(msg, now)
    }

    /// Send a CC right away, bypassing the governor.
    pub fn send_cc_immediate(&mut self, msg: CcMessage) {
        self.dispatcher.send_cc(msg);
    }

    pub fn pending_cc(&self) -> usize {
        self.governor.len()
    }

    pub fn max_cc_rate(&self) -> u32 {
        self.governor.max_rate()
    }

    pub fn set_max_cc_rate(&mut self, rate: u32) {
        self.governor.set_max_rate(rate);
    }

    pub fn clear_governor(&mut self) {
        self.governor.clear();
    }

    /// Rewind every counter to the top of the pattern.
    pub fn reset(&mut self) {
        for engine in self.engines.iter_mut() {
            engine.reset();
        }
        for envelope in self.envelopes.iter_mut() {
            envelope.reset();
        }
        self.poly.reset();
    }

    /// Swing multiplier for the interval before the next tick.
    pub fn interval_scale(&self) -> f32 {
        let shift = self.controls.swing() / 3.0;
        if self.engines[0].step() & 1 == 0 {
            1.0 + shift
        } else {
            1.0 - shift
        }
    }

    /// Run one clock tick covering `pulses` pulses at time `now`.
    pub fn tick(&mut self, pulses: u8, now: Duration) {
        let pulses = pulses.max(1);
        self.apply_morph();
        self.step_physics();

        let landed = [self.engines[0].pulse() == 0, self.engines[1].pulse() == 0];
        let mut masks = [0u8; NUM_ENGINES];
        masks[0] = self.engines[0].tick(pulses);
        masks[1] = if self.controls.link() {
            let position = self.engines[0].params().position();
            self.engines[1].tick_at(pulses, position)
        } else {
            self.engines[1].tick(pulses)
        };

        self.apply_macros(&mut masks, landed);
        self.dispatch_parts(&masks, landed);
        self.tick_envelopes(pulses, now);

        if self.controls.poly_active() {
            if self.poly.is_primed() {
                let fired = self.poly.tick(false);
                self.dispatch_poly(fired);
            }
            for _ in 0..pulses {
                let fired = self.poly.tick(true);
                self.dispatch_poly(fired);
            }
        }

        for msg in self.governor.drain(now) {
            self.dispatcher.send_cc(msg);
        }
    }

    fn apply_morph(&mut self) {
        let factor = self.controls.morph();
        if self.applied_morph == Some(factor) {
            return;
        }
        if let [Some(a), Some(b)] = &self.scenes {
            let scene = interpolate(a, b, factor);
            for (engine, values) in self.engines.iter().zip(scene.engines.iter()) {
                engine.params().apply_scene(values);
            }
            self.applied_morph = Some(factor);
        }
    }

    fn step_physics(&mut self) {
        for (engine, physics) in self.engines.iter().zip(self.physics.iter_mut()) {
            if let Some(physics) = physics {
                engine.params().set_position(physics.step());
            }
        }
    }

    fn apply_macros(&mut self, masks: &mut [u8; NUM_ENGINES], landed: [bool; NUM_ENGINES]) {
        let controls = &self.controls;
        let probability = controls.probability();
        for (mask, landed) in masks.iter_mut().zip(landed) {
            if landed {
                *mask = performance::probability_gate(*mask, probability, &mut self.rng);
            }
        }

        if landed[0] {
            match performance::roll_glitch(controls.glitch(), &mut self.rng) {
                Glitch::Rotate => masks[0] = performance::rotate(masks[0]),
                Glitch::Skip => self.engines[0].fast_forward(),
                Glitch::None => {}
            }
        }

        let (a, b) = performance::combine(controls.combine(), masks[0], masks[1]);
        masks[0] = a;
        masks[1] = b;
    }

    fn dispatch_parts(&mut self, masks: &[u8; NUM_ENGINES], landed: [bool; NUM_ENGINES]) {
        for e in 0..NUM_ENGINES {
            if !landed[e] {
                continue;
            }
            let mask = masks[e];
            let params = self.engines[e].params();
            for part in 0..NUM_PARTS {
                if apply_logic(mask, part, params.logic_mode(part)) {
                    let accented = mask & (1 << (part + NUM_PARTS)) != 0;
                    self.dispatcher
                        .send_trigger(Trigger::new(TriggerSource::part(e, part), accented));
                }
            }
        }
    }

    fn tick_envelopes(&mut self, pulses: u8, now: Duration) {
        for envelope in self.envelopes.iter_mut() {
            let config = *envelope.config();
            if !config.enabled {
                continue;
            }
            let position = self.engines[config.source_engine].params().position();
            for _ in 0..pulses {
                envelope.tick(&self.map, position);
            }
            if let Some(value) = envelope.pending() {
                let msg = CcMessage::new(config.cc_channel, config.param_id, value);
                if self.governor.enqueue(msg, now) {
                    envelope.mark_sent(value);
                }
            }
        }
    }

    fn dispatch_poly(&mut self, fired: [bool; NUM_POLY_CHANNELS]) {
        for (channel, fired) in fired.into_iter().enumerate() {
            if fired {
                let accented = self.poly.channel(channel).slice() == 0;
                self.dispatcher
                    .send_trigger(Trigger::new(TriggerSource::poly(channel), accented));
            }
        }
    }
}

#[inline]
#[track_caller]
fn check_slot(slot: usize) {
    assert!(slot < NUM_ENVELOPES, "envelope slot {} out of range (0..{})", slot, NUM_ENVELOPES);
}
