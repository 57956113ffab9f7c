//! Internal clock: a dedicated thread ticking the sequencer at 24 PPQN.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tg_core::timing::tick_interval_ns;
use tg_engine::{Dispatcher, Sequencer, MAX_BPM, MIN_BPM};
use tracing::debug;

use crate::{lock_sequencer, tick_guarded, Transport};

/// A stall longer than this many intervals is dropped instead of replayed.
pub const MAX_CATCH_UP: u64 = 4;

const PARK_THRESHOLD_NS: u64 = 1_000_000;

#[derive(Debug)]
pub enum ClockError {
    /// The OS refused to start the clock thread.
    Spawn(std::io::Error),
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockError::Spawn(e) => write!(f, "failed to spawn clock thread: {}", e),
        }
    }
}

impl std::error::Error for ClockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClockError::Spawn(e) => Some(e),
        }
    }
}

/// Wall-time accumulator deciding how many ticks are due.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickAccumulator {
    pending_ns: u64,
}

impl TickAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add elapsed time, capped at [`MAX_CATCH_UP`] intervals.
    pub fn add(&mut self, elapsed_ns: u64, interval_ns: u64) {
        let cap = interval_ns.saturating_mul(MAX_CATCH_UP);
        self.pending_ns = self.pending_ns.saturating_add(elapsed_ns).min(cap);
    }

    /// Consume one interval if a tick is due.
    pub fn take_tick(&mut self, interval_ns: u64) -> bool {
        if interval_ns > 0 && self.pending_ns >= interval_ns {
            self.pending_ns -= interval_ns;
            true
        } else {
            false
        }
    }

    /// Time left until the next tick is due.
    pub fn remaining(&self, interval_ns: u64) -> u64 {
        interval_ns.saturating_sub(self.pending_ns)
    }

    pub fn reset(&mut self) {
        self.pending_ns = 0;
    }
}

/// Base tick interval at `bpm`, clamped to the supported tempo range.
pub fn base_interval_ns(bpm: f32) -> u64 {
    let bpm = if bpm.is_nan() { tg_engine::DEFAULT_BPM } else { bpm.clamp(MIN_BPM, MAX_BPM) };
    tick_interval_ns(bpm)
}

/// Running clock thread. Dropping it stops the thread.
pub struct ClockHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ClockHandle {
    pub fn spawn<D: Dispatcher + 'static>(
        sequencer: Arc<Mutex<Sequencer<D>>>,
        transport: Arc<Transport>,
        origin: Instant,
    ) -> Result<Self, ClockError> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let thread = thread::Builder::new()
            .name("tg-clock".into())
            .spawn(move || clock_thread(&sequencer, &transport, origin, &stop_flag))
            .map_err(ClockError::Spawn)?;
        Ok(Self { stop, thread: Some(thread) })
    }

    /// Signal, wake and join the thread. Safe to call twice.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Tick once and return the interval until the next tick, swing applied.
fn run_tick<D: Dispatcher>(
    sequencer: &Mutex<Sequencer<D>>,
    transport: &Transport,
    origin: Instant,
) -> u64 {
    let mut seq = lock_sequencer(sequencer);
    tick_guarded(&mut seq, 1, origin.elapsed());
    transport.count_tick();
    let scale = seq.interval_scale() as f64;
    let base = base_interval_ns(seq.controls().bpm());
    (base as f64 * scale) as u64
}

fn clock_thread<D: Dispatcher>(
    sequencer: &Mutex<Sequencer<D>>,
    transport: &Transport,
    origin: Instant,
    stop: &AtomicBool,
) {
    let mut accumulator = TickAccumulator::new();
    // The downbeat goes out before any waiting.
    let mut interval = run_tick(sequencer, transport, origin);
    let mut last = Instant::now();

    while !stop.load(Ordering::Acquire) {
        let now = Instant::now();
        accumulator.add(now.duration_since(last).as_nanos() as u64, interval);
        last = now;

        let mut ticks = 0u32;
        while accumulator.take_tick(interval) {
            interval = run_tick(sequencer, transport, origin);
            ticks += 1;
        }
        if ticks > 1 {
            debug!(ticks, "clock catch-up");
        }

        let remaining = accumulator.remaining(interval);
        if remaining >= PARK_THRESHOLD_NS {
            thread::park_timeout(Duration::from_nanos(remaining));
        } else {
            thread::yield_now();
        }
    }
}
