//! Headless controller for topograph.
//!
//! Owns the sequencer and whichever clock drives it, and gives the UI and
//! CLI one API for transport, settings and structural edits.

mod clock;
mod midi_clock;
mod ring_dispatch;
mod settings;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tg_core::{DensityMap, Position, Scene, NUM_ENGINES};
use tg_engine::{
    CcMessage, Controls, Dispatcher, EngineShared, EnvelopeConfig, PatternRecipe,
    PositionPhysics, Sequencer,
};
use tracing::{debug, info, warn};

pub use clock::{base_interval_ns, ClockError, ClockHandle, TickAccumulator, MAX_CATCH_UP};
pub use midi_clock::{ClockEvent, ClockResolution, MidiClockReceiver};
pub use ring_dispatch::{ring_dispatcher, Dropped, OutputReceiver, RingDispatcher};
pub use settings::{EngineSettings, Settings, SettingsError};
pub use tg_formats::FormatError;

/// Transport state shared by the controller and both clock drivers.
#[derive(Debug, Default)]
pub struct Transport {
    playing: AtomicBool,
    external: AtomicBool,
    resolution: AtomicU8,
    ticks: AtomicU64,
}

impl Transport {
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    pub fn is_external(&self) -> bool {
        self.external.load(Ordering::Relaxed)
    }

    pub fn resolution(&self) -> ClockResolution {
        ClockResolution::from_u8(self.resolution.load(Ordering::Relaxed))
    }

    /// Ticks run since the controller was created.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub(crate) fn set_playing(&self, on: bool) {
        self.playing.store(on, Ordering::Relaxed);
    }

    pub(crate) fn set_external(&self, on: bool) {
        self.external.store(on, Ordering::Relaxed);
    }

    pub(crate) fn set_resolution(&self, resolution: ClockResolution) {
        self.resolution.store(resolution as u8, Ordering::Relaxed);
    }

    pub(crate) fn count_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }
}

/// Lock the sequencer, recovering from a panicked holder.
pub(crate) fn lock_sequencer<D: Dispatcher>(
    sequencer: &Mutex<Sequencer<D>>,
) -> MutexGuard<'_, Sequencer<D>> {
    sequencer.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        warn!("sequencer lock poisoned, recovering");
        poisoned.into_inner()
    })
}

#[cfg(feature = "alloc_check")]
pub(crate) fn tick_guarded<D: Dispatcher>(seq: &mut Sequencer<D>, pulses: u8, now: Duration) {
    assert_no_alloc::assert_no_alloc(|| seq.tick(pulses, now));
}

#[cfg(not(feature = "alloc_check"))]
pub(crate) fn tick_guarded<D: Dispatcher>(seq: &mut Sequencer<D>, pulses: u8, now: Duration) {
    seq.tick(pulses, now);
}

/// Headless sequencer controller: owns the sequencer and runs the clock.
pub struct Controller<D: Dispatcher + 'static = RingDispatcher> {
    sequencer: Arc<Mutex<Sequencer<D>>>,
    controls: Arc<Controls>,
    engines: [Arc<EngineShared>; NUM_ENGINES],
    transport: Arc<Transport>,
    origin: Instant,
    clock: Option<ClockHandle>,
}

impl<D: Dispatcher + 'static> Controller<D> {
    pub fn new(map: DensityMap, dispatcher: D, seed: u64) -> Self {
        let sequencer = Sequencer::new(map, dispatcher, seed);
        let controls = sequencer.controls().clone();
        let engines = [sequencer.engine_shared(0), sequencer.engine_shared(1)];
        Self {
            sequencer: Arc::new(Mutex::new(sequencer)),
            controls,
            engines,
            transport: Arc::new(Transport::default()),
            origin: Instant::now(),
            clock: None,
        }
    }

    // --- Shared state ---

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn engine(&self, engine: usize) -> &EngineShared {
        tg_core::check_engine(engine);
        &self.engines[engine]
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Time since the controller was created, the clock origin for CC stamps.
    pub fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Run `f` with the sequencer locked. Edits land between two ticks.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Sequencer<D>) -> R) -> R {
        f(&mut lock_sequencer(&self.sequencer))
    }

    // --- Transport ---

    pub fn start(&mut self) -> Result<(), ClockError> {
        self.stop();
        self.edit(|seq| seq.reset());
        if self.transport.is_external() {
            info!("armed, waiting for external clock");
            return Ok(());
        }
        let clock = ClockHandle::spawn(self.sequencer.clone(), self.transport.clone(), self.origin)?;
        self.clock = Some(clock);
        self.transport.set_playing(true);
        info!(bpm = self.controls.bpm(), "transport started");
        Ok(())
    }

    pub fn stop(&mut self) {
        let was_playing = self.transport.is_playing() || self.clock.is_some();
        if let Some(mut clock) = self.clock.take() {
            clock.stop();
        }
        self.transport.set_playing(false);
        self.edit(|seq| seq.clear_governor());
        if was_playing {
            info!("transport stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    /// Whether the internal clock thread is alive.
    pub fn clock_running(&self) -> bool {
        self.clock.as_ref().is_some_and(ClockHandle::is_running)
    }

    /// Hand ticking over to an external MIDI clock, or take it back.
    pub fn set_external_sync(&mut self, on: bool) {
        if on == self.transport.is_external() {
            return;
        }
        self.stop();
        self.transport.set_external(on);
        info!(external = on, "clock source switched");
    }

    pub fn set_clock_resolution(&self, resolution: ClockResolution) {
        self.transport.set_resolution(resolution);
    }

    pub fn midi_clock_receiver(&self) -> MidiClockReceiver<D> {
        MidiClockReceiver::new(self.sequencer.clone(), self.transport.clone(), self.origin)
    }

    // --- Settings ---

    pub fn apply_settings(&mut self, settings: &Settings) {
        let controls = &self.controls;
        controls.set_bpm(settings.bpm);
        controls.set_swing(settings.swing);
        controls.set_morph(settings.morph);
        controls.set_link(settings.link_mode);
        self.transport.set_resolution(settings.clock_resolution);

        for (shared, engine) in self.engines.iter().zip(settings.engines.iter()) {
            let params = &shared.params;
            params.set_position(Position::new(engine.x, engine.y));
            params.set_randomness(engine.randomness);
            for (part, density) in engine.density.iter().enumerate() {
                params.set_density(part, *density);
            }
        }

        self.edit(|seq| {
            seq.set_max_cc_rate(settings.max_cc_rate);
            seq.poly_mut().set_master_beats(settings.master_beats);
        });
        self.set_external_sync(settings.external_sync);
        debug!(?settings, "settings applied");
    }

    /// Current live state as a settings file.
    pub fn settings(&self) -> Settings {
        let (max_cc_rate, master_beats) =
            self.edit(|seq| (seq.max_cc_rate(), seq.poly().master_beats()));
        Settings {
            bpm: self.controls.bpm(),
            swing: self.controls.swing(),
            clock_resolution: self.transport.resolution(),
            morph: self.controls.morph(),
            link_mode: self.controls.link(),
            external_sync: self.transport.is_external(),
            max_cc_rate,
            master_beats,
            engines: std::array::from_fn(|e| {
                let scene = self.engines[e].params.snapshot();
                EngineSettings {
                    x: scene.position.x,
                    y: scene.position.y,
                    randomness: scene.randomness,
                    density: scene.density,
                }
            }),
        }
    }

    // --- Structural edits ---

    pub fn apply_recipe(&self, recipe: PatternRecipe) {
        self.edit(|seq| seq.poly_mut().apply_recipe(recipe));
        debug!(recipe = recipe.name(), "recipe applied");
    }

    pub fn set_poly_channel(&self, channel: usize, steps: u8, hits: u8, time_division: f32) {
        self.edit(|seq| seq.poly_mut().set_channel(channel, steps, hits, time_division));
    }

    pub fn set_envelope(&self, slot: usize, config: EnvelopeConfig) {
        self.edit(|seq| seq.set_envelope(slot, config));
    }

    pub fn set_physics(&self, engine: usize, physics: Option<PositionPhysics>) {
        self.edit(|seq| seq.set_physics(engine, physics));
    }

    pub fn set_scene(&self, slot: usize, scene: Option<Scene>) {
        self.edit(|seq| seq.set_scene(slot, scene));
    }

    /// Decode a scene record into morph slot `slot`.
    pub fn load_scene(&self, slot: usize, data: &[u8]) -> Result<(), FormatError> {
        let scene = tg_formats::read_scene(data)?;
        self.set_scene(slot, Some(scene));
        Ok(())
    }

    /// Encode the live engine parameters as a scene record.
    pub fn save_scene(&self) -> Result<Vec<u8>, FormatError> {
        let scene = self.edit(|seq| seq.capture_scene());
        tg_formats::write_scene(&scene)
    }

    // --- CC output ---

    pub fn enqueue_cc(&self, msg: CcMessage) -> bool {
        let now = self.now();
        self.edit(|seq| seq.enqueue_cc(msg, now))
    }

    pub fn send_cc_immediate(&self, msg: CcMessage) {
        self.edit(|seq| seq.send_cc_immediate(msg));
    }

    pub fn pending_cc(&self) -> usize {
        self.edit(|seq| seq.pending_cc())
    }
}

impl<D: Dispatcher + 'static> Drop for Controller<D> {
    fn drop(&mut self) {
        if let Some(mut clock) = self.clock.take() {
            clock.stop();
        }
    }
}
