//! Controller transport, clock switching and settings.

use std::thread;
use std::time::{Duration, Instant};

use tg_core::{DensityMap, Position, GRID_SIZE, TABLE_LEN};
use tg_engine::{CcMessage, PatternRecipe, TriggerSource};
use tg_master::{
    ring_dispatcher, ClockEvent, ClockResolution, Controller, OutputReceiver, Settings,
};

fn loud_map() -> DensityMap {
    DensityMap::new([[255; TABLE_LEN]; GRID_SIZE * GRID_SIZE])
}

fn controller() -> (Controller, OutputReceiver) {
    let (tx, rx) = ring_dispatcher(4096);
    let ctl = Controller::new(loud_map(), tx, 7);
    for e in 0..2 {
        for part in 0..3 {
            ctl.engine(e).params.set_density(part, 255);
        }
    }
    (ctl, rx)
}

fn wait_for<T>(timeout: Duration, mut poll: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(value) = poll() {
            return Some(value);
        }
        thread::sleep(Duration::from_millis(1));
    }
    None
}

#[test]
fn start_dispatches_downbeat_immediately() {
    let (mut ctl, mut rx) = controller();
    ctl.controls().set_bpm(30.0);
    ctl.start().unwrap();
    // At 30 BPM the second pulse is 83 ms away; the downbeat must not wait for it.
    let first = wait_for(Duration::from_millis(60), || rx.pop_trigger());
    ctl.stop();
    let first = first.expect("no downbeat");
    assert_eq!(first.source, TriggerSource::Part(0));
    assert!(first.accented);
}

#[test]
fn clock_runs_at_tempo() {
    let (mut ctl, _rx) = controller();
    ctl.controls().set_bpm(300.0);
    ctl.start().unwrap();
    thread::sleep(Duration::from_millis(250));
    ctl.stop();
    // 300 BPM is 120 pulses per second.
    let ticks = ctl.transport().ticks();
    assert!((10..=80).contains(&ticks), "ticks {}", ticks);
}

#[test]
fn stop_is_idempotent_and_clears_governor() {
    let (mut ctl, _rx) = controller();
    ctl.stop();
    ctl.start().unwrap();
    assert!(ctl.is_playing());
    assert!(ctl.clock_running());
    assert!(ctl.enqueue_cc(CcMessage::new(0, 7, 100)));
    ctl.stop();
    ctl.stop();
    assert!(!ctl.is_playing());
    assert!(!ctl.clock_running());
    assert_eq!(ctl.pending_cc(), 0);

    let ticks = ctl.transport().ticks();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(ctl.transport().ticks(), ticks);
}

#[test]
fn restart_replaces_the_clock() {
    let (mut ctl, _rx) = controller();
    ctl.start().unwrap();
    ctl.start().unwrap();
    assert!(ctl.clock_running());
    ctl.stop();
    assert!(!ctl.clock_running());
}

#[test]
fn external_sync_hands_over_ticking() {
    let (mut ctl, mut rx) = controller();
    ctl.start().unwrap();
    ctl.set_external_sync(true);
    assert!(!ctl.clock_running());
    let _ = rx.drain();

    let midi = ctl.midi_clock_receiver();
    ctl.start().unwrap();
    assert!(!ctl.clock_running());
    assert_eq!(midi.receive(0xF8), ClockEvent::Ignored);

    assert_eq!(midi.receive(0xFA), ClockEvent::Start);
    for _ in 0..6 {
        assert_eq!(midi.receive(0xF8), ClockEvent::Tick);
    }
    let (triggers, _) = rx.drain();
    // Two landed steps, six parts each.
    assert_eq!(triggers.len(), 12);

    ctl.set_clock_resolution(ClockResolution::Ppqn8);
    midi.receive(0xF8);
    assert_eq!(rx.drain().0.len(), 6);

    midi.receive(0xFC);
    assert_eq!(midi.receive(0xF8), ClockEvent::Ignored);

    ctl.set_external_sync(false);
    assert_eq!(midi.receive(0xFA), ClockEvent::Ignored);
}

#[test]
fn settings_reach_live_state() {
    let (mut ctl, _rx) = controller();
    let settings = Settings::from_toml(
        r#"
        bpm = 140
        swing = 0.5
        link_mode = true
        max_cc_rate = 20
        master_beats = 3

        [[engines]]
        x = 12
        y = 34
        density = [1, 2, 3]

        [[engines]]
        randomness = 200
        "#,
    )
    .unwrap();
    ctl.apply_settings(&settings);

    assert_eq!(ctl.controls().bpm(), 140.0);
    assert!(ctl.controls().link());
    assert_eq!(ctl.engine(0).params.position(), Position::new(12, 34));
    assert_eq!(ctl.engine(0).params.density(2), 3);
    assert_eq!(ctl.engine(1).params.randomness(), 200);
    assert_eq!(ctl.edit(|seq| seq.poly().master_beats()), 3.0);
    assert_eq!(ctl.settings(), settings);
}

#[test]
fn scenes_load_and_save() {
    let (ctl, _rx) = controller();
    ctl.engine(0).params.set_position(Position::new(9, 8));
    let bytes = ctl.save_scene().unwrap();
    assert_eq!(&bytes[..4], b"TGSC");

    ctl.load_scene(0, &bytes).unwrap();
    assert!(ctl.load_scene(1, b"TGSCshort").is_err());
    assert_eq!(ctl.edit(|seq| seq.scene(0).map(|s| s.engines[0].position)), Some(Position::new(9, 8)));
}

#[test]
fn recipes_are_applied_between_ticks() {
    let (ctl, _rx) = controller();
    ctl.apply_recipe(PatternRecipe::Fibonacci);
    ctl.set_poly_channel(5, 40, 3, 1.0);
    ctl.edit(|seq| {
        assert_eq!(seq.poly().channel(0).steps(), 2);
        assert_eq!(seq.poly().channel(5).steps(), 32);
    });
}
