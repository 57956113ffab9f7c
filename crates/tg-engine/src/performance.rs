//! Live performance macros applied to the raw pattern masks.
//!
//! Masks use the generator layout: bits 0-2 trigger, bits 3-5 accent.

use tg_core::NUM_PARTS;

const TRIGGER_BITS: u8 = (1 << NUM_PARTS) - 1;

/// How the two engines' triggers are merged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum CombineMode {
    #[default]
    Off = 0,
    And = 1,
    Or = 2,
    Xor = 3,
}

impl CombineMode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => CombineMode::And,
            2 => CombineMode::Or,
            3 => CombineMode::Xor,
            _ => CombineMode::Off,
        }
    }
}

/// What a glitch roll decided for this step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Glitch {
    None,
    /// Rotate engine A's trigger bits by one part.
    Rotate,
    /// Jump engine A one step ahead.
    Skip,
}

fn triggers(mask: u8) -> u8 {
    mask & TRIGGER_BITS
}

fn accents(mask: u8) -> u8 {
    (mask >> NUM_PARTS) & TRIGGER_BITS
}

fn pack(triggers: u8, accents: u8) -> u8 {
    let triggers = triggers & TRIGGER_BITS;
    triggers | ((accents & triggers) << NUM_PARTS)
}

/// Drop each trigger with chance `1 - probability / 255`.
pub fn probability_gate(mask: u8, probability: u8, rng: &mut fastrand::Rng) -> u8 {
    if probability == u8::MAX {
        return mask;
    }
    let mut kept = 0u8;
    for part in 0..NUM_PARTS {
        let bit = 1 << part;
        if triggers(mask) & bit != 0 && rng.u8(..) < probability {
            kept |= bit;
        }
    }
    pack(kept, accents(mask))
}

/// Roll for a glitch with chance `amount / 256`.
pub fn roll_glitch(amount: u8, rng: &mut fastrand::Rng) -> Glitch {
    if amount == 0 || rng.u8(..) >= amount {
        return Glitch::None;
    }
    if rng.bool() {
        Glitch::Rotate
    } else {
        Glitch::Skip
    }
}

/// Rotate triggers and accents one part up, the hat wrapping to the kick.
pub fn rotate(mask: u8) -> u8 {
    let rot = |bits: u8| ((bits << 1) | (bits >> (NUM_PARTS - 1))) & TRIGGER_BITS;
    pack(rot(triggers(mask)), rot(accents(mask)))
}

/// Merge the engines' masks. With a mode other than `Off` the result lands
/// on engine A and engine B is silenced.
pub fn combine(mode: CombineMode, a: u8, b: u8) -> (u8, u8) {
    let (ta, tb) = (triggers(a), triggers(b));
    let merged = match mode {
        CombineMode::Off => return (a, b),
        CombineMode::And => ta & tb,
        CombineMode::Or => ta | tb,
        CombineMode::Xor => ta ^ tb,
    };
    (pack(merged, accents(a) | accents(b)), 0)
}
