//! Output events and the sink trait they are delivered through.

use tg_core::NUM_PARTS;

use crate::polyrhythm::NUM_POLY_CHANNELS;

/// Velocity of an accented trigger.
pub const ACCENT_VELOCITY: u8 = 127;
/// Velocity of a plain trigger.
pub const NORMAL_VELOCITY: u8 = 96;

/// Where a trigger came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerSource {
    /// Pattern part 0..6: engine A owns 0..3, engine B owns 3..6.
    Part(u8),
    /// Polyrhythm channel 0..6.
    Poly(u8),
}

impl TriggerSource {
    /// Part slot for `part` of `engine`.
    pub fn part(engine: usize, part: usize) -> Self {
        tg_core::check_engine(engine);
        tg_core::check_part(part);
        TriggerSource::Part((engine * NUM_PARTS + part) as u8)
    }

    pub fn poly(channel: usize) -> Self {
        assert!(channel < NUM_POLY_CHANNELS, "poly channel {} out of range", channel);
        TriggerSource::Poly(channel as u8)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Trigger {
    pub source: TriggerSource,
    pub accented: bool,
}

impl Trigger {
    pub fn new(source: TriggerSource, accented: bool) -> Self {
        Self { source, accented }
    }

    pub fn velocity(&self) -> u8 {
        if self.accented {
            ACCENT_VELOCITY
        } else {
            NORMAL_VELOCITY
        }
    }
}

/// A continuous-controller message. Fields are kept in MIDI range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CcMessage {
    pub channel: u8,
    pub controller: u8,
    pub value: u8,
}

impl CcMessage {
    pub fn new(channel: u8, controller: u8, value: u8) -> Self {
        Self {
            channel: channel & 0x0F,
            controller: controller & 0x7F,
            value: value.min(127),
        }
    }

    /// Wire bytes: status, controller, value.
    pub fn to_bytes(&self) -> [u8; 3] {
        [0xB0 | (self.channel & 0x0F), self.controller & 0x7F, self.value.min(127)]
    }
}

/// Sink for everything the sequencer emits.
///
/// Called from the timing thread with the sequencer locked; implementations
/// must not block.
pub trait Dispatcher: Send {
    fn send_trigger(&mut self, trigger: Trigger);
    fn send_cc(&mut self, msg: CcMessage);
}

impl<D: Dispatcher + ?Sized> Dispatcher for alloc::boxed::Box<D> {
    fn send_trigger(&mut self, trigger: Trigger) {
        (**self).send_trigger(trigger)
    }

    fn send_cc(&mut self, msg: CcMessage) {
        (**self).send_cc(msg)
    }
}
