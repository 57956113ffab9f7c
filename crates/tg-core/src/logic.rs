//! Per-part trigger conditioning on sibling state.

use crate::part::check_part;

/// How a part's trigger depends on the other parts of the same mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum LogicMode {
    /// Fire whenever the part fires.
    #[default]
    Pass = 0,
    /// Only when the kick (part 0) is silent.
    NotKick = 1,
    /// Only when the snare (part 1) is silent.
    NotSnare = 2,
    /// Only when the hi-hat (part 2) fires too.
    IfHat = 3,
    /// Only when the previous part (wrapping 0 -> 2) is silent.
    XorPrev = 4,
}

impl LogicMode {
    pub const ALL: [LogicMode; 5] = [
        LogicMode::Pass,
        LogicMode::NotKick,
        LogicMode::NotSnare,
        LogicMode::IfHat,
        LogicMode::XorPrev,
    ];

    /// Decode an atomic-stored mode. Unknown codes fall back to `Pass`.
    pub fn from_u8(value: u8) -> Self {
        Self::ALL.get(value as usize).copied().unwrap_or_default()
    }
}

/// Decide whether `part` fires given the whole trigger `mask`.
///
/// Panics if `part` is not 0, 1 or 2.
pub fn apply(mask: u8, part: usize, mode: LogicMode) -> bool {
    check_part(part);
    let bit = |p: usize| mask & (1 << p) != 0;
    if !bit(part) {
        return false;
    }
    match mode {
        LogicMode::Pass => true,
        LogicMode::NotKick => !bit(0),
        LogicMode::NotSnare => !bit(1),
        LogicMode::IfHat => bit(2),
        LogicMode::XorPrev => !bit((part + 2) % 3),
    }
}
