//! Allocation-free tick path tests.
//!
//! These tests verify that `Sequencer::tick()` does not allocate once the
//! sequencer is built. Every stage of the pipeline is switched on and run
//! for several bars so allocations behind rare branches (glitches, recipe
//! wraps, governor drains) are caught.
//!
//! Runs under plain `cargo test`, no feature flags needed.

use std::time::Duration;

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use tg_core::{DensityMap, PartMode, Position, Scene};
use tg_engine::{
    CcMessage, CombineMode, Dispatcher, EnvelopeConfig, EnvelopeShape, PatternRecipe,
    PositionPhysics, Sequencer, Trigger,
};
use tg_master::ring_dispatcher;

/// Counts instead of storing, so dispatch itself cannot allocate.
#[derive(Default)]
struct Tally {
    triggers: u64,
    ccs: u64,
}

impl Dispatcher for Tally {
    fn send_trigger(&mut self, _trigger: Trigger) {
        self.triggers += 1;
    }

    fn send_cc(&mut self, _msg: CcMessage) {
        self.ccs += 1;
    }
}

const PULSE: Duration = Duration::from_micros(20_833);

fn everything_on<D: Dispatcher>(seq: &mut Sequencer<D>) {
    for e in 0..2 {
        let params = seq.engine(e).params();
        params.set_randomness(200);
        params.set_position(Position::new(100 + e as u8 * 50, 60));
        for part in 0..3 {
            params.set_density(part, 190);
        }
        params.set_mode(1, PartMode::Euclidean);
    }
    let controls = seq.controls().clone();
    controls.set_poly_active(true);
    controls.set_probability(220);
    controls.set_glitch(40);
    controls.set_swing(0.3);
    seq.poly_mut().apply_recipe(PatternRecipe::Interlock);
    seq.set_physics(1, Some(PositionPhysics::new(Position::new(5, 250), 1.7, -2.2)));

    let mut far = Scene::default();
    far.engines[0].position = Position::new(255, 255);
    seq.set_scene(0, Some(Scene::default()));
    seq.set_scene(1, Some(far));

    for (slot, shape) in [
        EnvelopeShape::Smooth,
        EnvelopeShape::Exponential,
        EnvelopeShape::Stepped,
        EnvelopeShape::Random,
    ]
    .into_iter()
    .enumerate()
    {
        seq.set_envelope(
            slot,
            EnvelopeConfig {
                shape,
                source_engine: slot % 2,
                param_id: 70 + slot as u8,
                enabled: true,
                ..Default::default()
            },
        );
    }
}

fn run_bars<D: Dispatcher>(seq: &mut Sequencer<D>, bars: u32, start: u32) {
    let controls = seq.controls().clone();
    assert_no_alloc(|| {
        for i in 0..bars * 96 {
            let pulse = start + i;
            controls.set_morph((pulse % 97) as f32 / 96.0);
            controls.set_combine(CombineMode::from_u8((pulse / 96 % 4) as u8));
            controls.set_link(pulse % 192 >= 96);
            seq.tick(1, PULSE * pulse);
        }
    });
}

#[test]
fn sequencer_tick_alloc_free() {
    let mut seq = Sequencer::new(DensityMap::builtin(), Tally::default(), 11);
    everything_on(&mut seq);
    run_bars(&mut seq, 16, 0);
    assert!(seq.dispatcher().triggers > 0);
    assert!(seq.dispatcher().ccs > 0);
}

#[test]
fn multi_pulse_ticks_alloc_free() {
    let mut seq = Sequencer::new(DensityMap::builtin(), Tally::default(), 12);
    everything_on(&mut seq);
    assert_no_alloc(|| {
        for i in 0..200u32 {
            seq.tick(if i % 2 == 0 { 3 } else { 6 }, PULSE * (i * 4));
        }
    });
    assert!(seq.dispatcher().triggers > 0);
}

#[test]
fn ring_dispatcher_alloc_free() {
    let (tx, mut rx) = ring_dispatcher(1 << 16);
    let mut seq = Sequencer::new(DensityMap::builtin(), tx, 13);
    everything_on(&mut seq);
    run_bars(&mut seq, 8, 0);
    let (triggers, ccs) = rx.drain();
    assert!(!triggers.is_empty());
    assert!(!ccs.is_empty());
    assert_eq!(rx.dropped().triggers, 0);
}
