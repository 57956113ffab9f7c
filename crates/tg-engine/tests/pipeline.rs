//! Whole-pipeline behaviour of the sequencer.

use std::time::Duration;

use tg_core::{DensityMap, LogicMode, PartMode, Position};
use tg_engine::{
    CcMessage, Dispatcher, PatternRecipe, Sequencer, Trigger, TriggerSource,
};

#[derive(Default)]
struct Log {
    events: Vec<(u32, Trigger)>,
    tick: u32,
}

impl Dispatcher for Log {
    fn send_trigger(&mut self, trigger: Trigger) {
        self.events.push((self.tick, trigger));
    }

    fn send_cc(&mut self, _msg: CcMessage) {}
}

fn run(seq: &mut Sequencer<Log>, ticks: u32) {
    for _ in 0..ticks {
        let tick = seq.dispatcher().tick;
        seq.tick(1, Duration::from_micros(20_833 * tick as u64));
        seq.dispatcher_mut().tick += 1;
    }
}

fn sources(seq: &Sequencer<Log>) -> Vec<(u32, TriggerSource)> {
    seq.dispatcher().events.iter().map(|(t, trig)| (*t, trig.source)).collect()
}

#[test]
fn same_seed_same_output() {
    let build = || {
        let mut seq = Sequencer::new(DensityMap::builtin(), Log::default(), 99);
        for e in 0..2 {
            let params = seq.engine(e).params();
            params.set_position(Position::new(70 + e as u8 * 60, 140));
            params.set_randomness(255);
            params.set_density(0, 180);
            params.set_density(2, 220);
        }
        seq.controls().set_probability(180);
        seq.controls().set_poly_active(true);
        seq.poly_mut().apply_recipe(PatternRecipe::Primes);
        seq
    };
    let mut a = build();
    let mut b = build();
    run(&mut a, 500);
    run(&mut b, 500);
    assert!(!a.dispatcher().events.is_empty());
    assert_eq!(a.dispatcher().events, b.dispatcher().events);
}

#[test]
fn euclidean_part_on_eight_step_grid() {
    let mut seq = Sequencer::new(DensityMap::builtin(), Log::default(), 1);
    let params = seq.engine(0).params();
    params.set_mode(0, PartMode::Euclidean);
    // Length (31 >> 3) + 1 = 4, filled 127 >> 3 = 15 gives 2 hits over 4.
    params.set_euclidean_length(0, 31);
    params.set_density(0, 127);
    for part in 1..3 {
        params.set_density(part, 0);
    }
    for part in 0..3 {
        seq.engine(1).params().set_density(part, 0);
    }

    run(&mut seq, 96);
    let kicks: Vec<u32> = sources(&seq)
        .into_iter()
        .filter(|(_, s)| *s == TriggerSource::Part(0))
        .map(|(t, _)| t / 3)
        .collect();
    // Sub-steps advance every other step, so hits land on steps 0, 4, 8, ...
    assert_eq!(kicks, [0, 4, 8, 12, 16, 20, 24, 28]);
}

#[test]
fn accents_follow_euclidean_downbeat() {
    let mut seq = Sequencer::new(DensityMap::builtin(), Log::default(), 1);
    let params = seq.engine(1).params();
    params.set_mode(2, PartMode::Euclidean);
    params.set_euclidean_length(2, 255);
    params.set_density(2, 255);
    run(&mut seq, 96);
    let hats: Vec<(u32, bool)> = seq
        .dispatcher()
        .events
        .iter()
        .filter(|(_, t)| t.source == TriggerSource::Part(5))
        .map(|(tick, t)| (tick / 3, t.accented))
        .collect();
    assert_eq!(hats.len(), 16);
    assert_eq!(hats[0], (0, true));
    assert!(hats[1..].iter().all(|(_, accented)| !accented));
}

#[test]
fn if_hat_gates_on_hat_lane() {
    let mut seq = Sequencer::new(DensityMap::builtin(), Log::default(), 5);
    let params = seq.engine(0).params();
    params.set_position(Position::new(128, 128));
    params.set_density(0, 255);
    params.set_density(2, 160);
    params.set_logic_mode(0, LogicMode::IfHat);

    run(&mut seq, 96);
    let events = sources(&seq);
    for (tick, source) in &events {
        if *source == TriggerSource::Part(0) {
            assert!(events.contains(&(*tick, TriggerSource::Part(2))), "kick without hat at {}", tick);
        }
    }
}

#[test]
fn interlock_odd_channels_start_half_a_cycle_later() {
    let mut seq = Sequencer::new(DensityMap::new([[0; 96]; 25]), Log::default(), 3);
    seq.controls().set_poly_active(true);
    seq.poly_mut().apply_recipe(PatternRecipe::Interlock);
    run(&mut seq, 1);
    let first: Vec<TriggerSource> = sources(&seq).into_iter().map(|(_, s)| s).collect();
    assert_eq!(first, [TriggerSource::Poly(0), TriggerSource::Poly(2), TriggerSource::Poly(4)]);

    // Channel 1 (8/5, phase 0.5) reaches slice 0 after half a bar.
    run(&mut seq, 50);
    let wrapped = seq
        .dispatcher()
        .events
        .iter()
        .find(|(_, t)| t.source == TriggerSource::Poly(1) && t.accented)
        .map(|(tick, _)| *tick);
    assert_eq!(wrapped, Some(47));
}
