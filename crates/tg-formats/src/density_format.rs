//! Raw density-map resource: 25 node tables of 96 bytes, back to back.

use tg_core::{DensityMap, DensityTable, GRID_SIZE, TABLE_LEN};

use crate::FormatError;

const NODES: usize = GRID_SIZE * GRID_SIZE;

pub const DENSITY_MAP_LEN: usize = NODES * TABLE_LEN;

/// Load a density map from exactly [`DENSITY_MAP_LEN`] bytes.
pub fn load_density_map(data: &[u8]) -> Result<DensityMap, FormatError> {
    if data.len() != DENSITY_MAP_LEN {
        return Err(FormatError::InvalidLength { expected: DENSITY_MAP_LEN, found: data.len() });
    }
    let mut nodes = [[0u8; TABLE_LEN]; NODES];
    for (table, chunk) in nodes.iter_mut().zip(data.chunks_exact(TABLE_LEN)) {
        table.copy_from_slice(chunk);
    }
    Ok(DensityMap::new(nodes))
}

/// Serialize a map in node order.
pub fn write_density_map(map: &DensityMap) -> Vec<u8> {
    let mut out = Vec::with_capacity(DENSITY_MAP_LEN);
    for i in 0..NODES {
        let table: &DensityTable = map.table(i);
        out.extend_from_slice(table);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_core::Position;

    #[test]
    fn builtin_survives_a_round_trip() {
        let builtin = DensityMap::builtin();
        let loaded = load_density_map(&write_density_map(&builtin)).unwrap();
        for i in 0..NODES {
            assert_eq!(loaded.table(i), builtin.table(i));
        }
    }

    #[test]
    fn tables_are_in_node_order() {
        let data: Vec<u8> = (0..DENSITY_MAP_LEN).map(|i| (i / TABLE_LEN) as u8).collect();
        let map = load_density_map(&data).unwrap();
        assert_eq!(map.table(7)[0], 7);
        assert_eq!(map.table(24)[95], 24);
        // Grid (0, 0) is node 10, attenuated twice by the blend.
        assert_eq!(map.level(Position::new(0, 0), 0), 8);
    }

    #[test]
    fn wrong_size_is_rejected() {
        assert_eq!(
            load_density_map(&[0; 100]).unwrap_err(),
            FormatError::InvalidLength { expected: 2400, found: 100 }
        );
        assert!(load_density_map(&vec![0; DENSITY_MAP_LEN + 1]).is_err());
    }
}
