//! Topographic density map.
//!
//! Twenty-five 96-byte node tables sit on a 5x5 grid. A continuous
//! position `(x, y)` selects a grid cell and blends the four corner tables
//! bilinearly, which is what makes neighbouring positions produce
//! neighbouring rhythms.
//!
//! The map is an immutable resource handle. Cloning shares the tables.

use alloc::sync::Arc;

use crate::density_tables::BUILTIN_NODES;

/// Bytes per node table: three 32-step lanes.
pub const TABLE_LEN: usize = 96;

/// Nodes per grid axis.
pub const GRID_SIZE: usize = 5;

/// One node of the density grid.
pub type DensityTable = [u8; TABLE_LEN];

/// Node index at each grid coordinate, `NODE_GRID[i][j]` with `i` on x.
const NODE_GRID: [[u8; GRID_SIZE]; GRID_SIZE] = [
    [10, 8, 0, 9, 11],
    [15, 7, 13, 12, 6],
    [18, 14, 4, 5, 3],
    [23, 16, 21, 1, 2],
    [24, 19, 17, 20, 22],
];

/// A 2D position on the map. Both axes span the full byte range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: u8,
    pub y: u8,
}

impl Position {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

/// Weighted 8-bit blend: `w = 0` yields (almost) `a`, `w = 255` (almost) `b`.
#[inline]
pub fn u8_mix(a: u8, b: u8, w: u8) -> u8 {
    ((a as u16 * (255 - w as u16) + b as u16 * w as u16) >> 8) as u8
}

/// Shared, immutable set of 25 density tables.
#[derive(Clone, Debug)]
pub struct DensityMap {
    nodes: Arc<[DensityTable; GRID_SIZE * GRID_SIZE]>,
}

impl DensityMap {
    /// Wrap a complete set of node tables.
    pub fn new(nodes: [DensityTable; GRID_SIZE * GRID_SIZE]) -> Self {
        Self { nodes: Arc::new(nodes) }
    }

    /// The stock map shipped with the sequencer.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_NODES)
    }

    /// Node table by its index (0-24).
    pub fn table(&self, index: usize) -> &DensityTable {
        &self.nodes[index]
    }

    /// Node table at grid coordinate `(i, j)`.
    fn node(&self, i: usize, j: usize) -> &DensityTable {
        &self.nodes[NODE_GRID[i][j] as usize]
    }

    /// Bilinearly blended level at `offset` within the tables.
    ///
    /// `offset` is `part * 32 + step` for trigger lanes, or a raw 0-95 index
    /// for envelopes. Out-of-range offsets wrap.
    pub fn level(&self, position: Position, offset: usize) -> u8 {
        let offset = offset % TABLE_LEN;
        let i = (position.x >> 6) as usize;
        let j = (position.y >> 6) as usize;
        let xi = position.x.wrapping_shl(2);
        let yi = position.y.wrapping_shl(2);

        let a = self.node(i, j)[offset];
        let b = self.node(i + 1, j)[offset];
        let c = self.node(i, j + 1)[offset];
        let d = self.node(i + 1, j + 1)[offset];

        u8_mix(u8_mix(a, b, xi), u8_mix(c, d, xi), yi)
    }
}

impl Default for DensityMap {
    fn default() -> Self {
        Self::builtin()
    }
}
