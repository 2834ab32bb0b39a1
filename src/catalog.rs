//! Flat catalog of the velocity cells of one spatial cell.

use crate::error::ClusterError;
use crate::types::{CellKey, VelocityCell, VelocitySpace};

/// Every velocity cell of a spatial cell, in storage order, plus a descending-value order.
///
/// Position `i` of [`VelocityCatalog::cells`] is the cell whose [`CellKey::flat`] is `i`,
/// so per-cell buffers indexed by flat index line up with the catalog.
#[derive(Debug, Clone)]
pub struct VelocityCatalog {
    block_len: usize,
    cells: Vec<VelocityCell>,
    /// Flat indices sorted by value, highest first; ties by storage order.
    order: Vec<u32>,
}

impl VelocityCatalog {
    /// Enumerate and sort the cells of `space`.
    pub fn from_space<S: VelocitySpace + ?Sized>(space: &S) -> Result<Self, ClusterError> {
        let block_len = space.block_len();
        let num_cells = space.num_cells();
        if num_cells > u32::MAX as usize {
            return Err(ClusterError::InvalidParameter(format!(
                "{} velocity cells exceed the u32 index range",
                num_cells
            )));
        }

        let mut cells = Vec::with_capacity(num_cells);
        for slot in 0..space.num_blocks() as u32 {
            let values = space.block_values(slot);
            if values.len() != block_len {
                return Err(ClusterError::BlockSizeMismatch {
                    slot,
                    expected: block_len,
                    got: values.len(),
                });
            }
            cells.extend(values.iter().enumerate().map(|(cell, &value)| VelocityCell {
                key: CellKey::new(slot, cell as u16),
                value,
            }));
        }

        let mut order: Vec<u32> = (0..cells.len() as u32).collect();
        order.sort_unstable_by(|&a, &b| {
            let (ca, cb) = (&cells[a as usize], &cells[b as usize]);
            cb.value.total_cmp(&ca.value).then(a.cmp(&b))
        });

        Ok(Self {
            block_len,
            cells,
            order,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Cells in storage order.
    #[inline]
    pub fn cells(&self) -> &[VelocityCell] {
        &self.cells
    }

    #[inline]
    pub fn cell(&self, flat: usize) -> &VelocityCell {
        &self.cells[flat]
    }

    #[inline]
    pub fn value(&self, flat: usize) -> f32 {
        self.cells[flat].value
    }

    /// Flat index of `key`; debug-checks that the key belongs to this catalog.
    #[inline]
    pub fn flat(&self, key: CellKey) -> usize {
        let flat = key.flat(self.block_len);
        debug_assert!(
            flat < self.cells.len(),
            "cell {:?} outside the catalog ({} cells)",
            key,
            self.cells.len()
        );
        flat
    }

    /// Flat indices from highest to lowest value.
    #[inline]
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    /// Cells from highest to lowest value.
    pub fn descending(&self) -> impl Iterator<Item = &VelocityCell> + '_ {
        self.order.iter().map(|&flat| &self.cells[flat as usize])
    }
}
