//! External MIDI clock: real-time bytes drive the sequencer directly.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tg_engine::{Dispatcher, Sequencer};
use tracing::info;

use crate::{lock_sequencer, tick_guarded, Transport};

pub const TIMING_CLOCK: u8 = 0xF8;
pub const START: u8 = 0xFA;
pub const CONTINUE: u8 = 0xFB;
pub const STOP: u8 = 0xFC;

/// Pulse rate of the incoming clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockResolution {
    #[default]
    #[serde(rename = "24ppqn")]
    Ppqn24 = 0,
    #[serde(rename = "8ppqn")]
    Ppqn8 = 1,
    #[serde(rename = "4ppqn")]
    Ppqn4 = 2,
}

impl ClockResolution {
    /// Internal pulses covered by one incoming clock byte.
    pub fn pulses(self) -> u8 {
        match self {
            ClockResolution::Ppqn24 => 1,
            ClockResolution::Ppqn8 => 3,
            ClockResolution::Ppqn4 => 6,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => ClockResolution::Ppqn8,
            2 => ClockResolution::Ppqn4,
            _ => ClockResolution::Ppqn24,
        }
    }
}

/// What a received byte did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockEvent {
    Tick,
    Start,
    Continue,
    Stop,
    Ignored,
}

/// Feeds real-time MIDI bytes into the sequencer. Cheap to clone.
pub struct MidiClockReceiver<D: Dispatcher> {
    sequencer: Arc<Mutex<Sequencer<D>>>,
    transport: Arc<Transport>,
    origin: Instant,
}

impl<D: Dispatcher> Clone for MidiClockReceiver<D> {
    fn clone(&self) -> Self {
        Self {
            sequencer: self.sequencer.clone(),
            transport: self.transport.clone(),
            origin: self.origin,
        }
    }
}

impl<D: Dispatcher> MidiClockReceiver<D> {
    pub(crate) fn new(
        sequencer: Arc<Mutex<Sequencer<D>>>,
        transport: Arc<Transport>,
        origin: Instant,
    ) -> Self {
        Self { sequencer, transport, origin }
    }

    /// Handle one byte. Bytes are ignored unless external sync is on.
    pub fn receive(&self, byte: u8) -> ClockEvent {
        if !self.transport.is_external() {
            return ClockEvent::Ignored;
        }
        match byte {
            TIMING_CLOCK => {
                if !self.transport.is_playing() {
                    return ClockEvent::Ignored;
                }
                let pulses = self.transport.resolution().pulses();
                let mut seq = lock_sequencer(&self.sequencer);
                tick_guarded(&mut seq, pulses, self.origin.elapsed());
                self.transport.count_tick();
                ClockEvent::Tick
            }
            START => {
                lock_sequencer(&self.sequencer).reset();
                self.transport.set_playing(true);
                info!("external start");
                ClockEvent::Start
            }
            CONTINUE => {
                self.transport.set_playing(true);
                info!("external continue");
                ClockEvent::Continue
            }
            STOP => {
                self.transport.set_playing(false);
                lock_sequencer(&self.sequencer).clear_governor();
                info!("external stop");
                ClockEvent::Stop
            }
            _ => ClockEvent::Ignored,
        }
    }
}
