//! Resolve the existing 26-neighbors of a velocity cell.

use crate::topology::NeighborTopology;
use crate::types::{CellKey, NeighborBlock, VelocitySpace};

/// Maps a cell to its neighbors using the block tables and the space's block adjacency.
///
/// Neighbors in missing or empty blocks are skipped; they are not an error.
pub struct NeighborResolver<'a, S: ?Sized> {
    space: &'a S,
    topology: &'a NeighborTopology,
}

impl<'a, S: VelocitySpace + ?Sized> NeighborResolver<'a, S> {
    pub fn new(space: &'a S, topology: &'a NeighborTopology) -> Self {
        debug_assert_eq!(
            space.block_side(),
            topology.side(),
            "topology built for a different block side"
        );
        Self { space, topology }
    }

    /// Write the neighbors of `cell` into `out` (cleared first).
    ///
    /// Same-block neighbors come first, then adjacent blocks in table order.
    pub fn resolve_into(&self, cell: CellKey, out: &mut Vec<CellKey>) {
        out.clear();
        out.extend(
            self.topology
                .local_neighbors(cell.cell)
                .iter()
                .map(|&c| CellKey::new(cell.block, c)),
        );

        for (direction, cells) in self.topology.remote_neighbors(cell.cell) {
            match self.space.block_neighbor(cell.block, direction) {
                NeighborBlock::Occupied(slot) => {
                    debug_assert!(
                        (slot as usize) < self.space.num_blocks(),
                        "neighbor block slot {} out of range",
                        slot
                    );
                    out.extend(cells.iter().map(|&c| CellKey::new(slot, c)));
                }
                NeighborBlock::Missing | NeighborBlock::Empty => {}
            }
        }
    }

    /// Allocating variant of [`NeighborResolver::resolve_into`].
    pub fn resolve(&self, cell: CellKey) -> Vec<CellKey> {
        let mut out = Vec::with_capacity(26);
        self.resolve_into(cell, &mut out);
        out
    }
}
