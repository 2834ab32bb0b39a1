//! In-memory sparse velocity mesh.
//!
//! Blocks live on a regular `nx × ny × nz` block grid with ids `x + y*nx + z*nx*ny`.
//! Only allocated blocks carry data; they are stored contiguously by slot in the order
//! they were allocated. Looking past the grid edge yields [`NeighborBlock::Missing`],
//! looking at an unallocated in-grid block yields [`NeighborBlock::Empty`].

use crate::error::ClusterError;
use crate::topology::{cell_coords, cell_index, MAX_BLOCK_SIDE};
use crate::types::{BlockDirection, CellKey, NeighborBlock, VelocitySpace};
use glam::UVec3;
use rustc_hash::FxHashMap;

/// A sparse blocked velocity grid implementing [`VelocitySpace`].
#[derive(Debug, Clone)]
pub struct VelocityMesh {
    side: usize,
    block_len: usize,
    /// Blocks per axis.
    grid: UVec3,
    /// Block id per slot.
    block_ids: Vec<u32>,
    /// Block id -> slot.
    slots: FxHashMap<u32, u32>,
    /// Values of all allocated blocks, `block_len` per slot.
    data: Vec<f32>,
}

impl VelocityMesh {
    /// Create an empty mesh with `grid` blocks per axis and `side³` cells per block.
    ///
    /// The grid must hold at most `u32::MAX` blocks and at most `i32::MAX` cells per axis.
    pub fn new(grid: UVec3, side: usize) -> Result<Self, ClusterError> {
        if side == 0 || side > MAX_BLOCK_SIDE {
            return Err(ClusterError::InvalidBlockSide(side));
        }
        let num_blocks = (grid.x as u64) * (grid.y as u64) * (grid.z as u64);
        if num_blocks == 0 || num_blocks > u32::MAX as u64 {
            return Err(ClusterError::InvalidParameter(format!(
                "block grid {} must hold between 1 and {} blocks",
                grid,
                u32::MAX
            )));
        }
        // Cell coordinates per axis must stay addressable as `i32` for neighbor offsets.
        let max_cells = grid.as_u64vec3() * side as u64;
        if max_cells.max_element() > i32::MAX as u64 {
            return Err(ClusterError::InvalidParameter(format!(
                "block grid {} with side {} exceeds {} cells per axis",
                grid,
                side,
                i32::MAX
            )));
        }

        Ok(Self {
            side,
            block_len: side * side * side,
            grid,
            block_ids: Vec::new(),
            slots: FxHashMap::default(),
            data: Vec::new(),
        })
    }

    /// Blocks per axis.
    #[inline]
    pub fn grid(&self) -> UVec3 {
        self.grid
    }

    /// Velocity cells per axis.
    #[inline]
    pub fn extent(&self) -> UVec3 {
        self.grid * self.side as u32
    }

    /// All allocated values in storage order (`slot * side³ + cell`).
    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn block_id_of(&self, block: UVec3) -> Option<u32> {
        if block.cmplt(self.grid).all() {
            Some(block.x + block.y * self.grid.x + block.z * self.grid.x * self.grid.y)
        } else {
            None
        }
    }

    #[inline]
    pub fn block_coords(&self, id: u32) -> UVec3 {
        let plane = self.grid.x * self.grid.y;
        UVec3::new(id % self.grid.x, (id / self.grid.x) % self.grid.y, id / plane)
    }

    /// Storage slot of an allocated block.
    #[inline]
    pub fn slot_of(&self, block: UVec3) -> Option<u32> {
        let id = self.block_id_of(block)?;
        self.slots.get(&id).copied()
    }

    /// Allocate a zero-filled block (no-op if it exists). Returns its slot.
    pub fn insert_block(&mut self, block: UVec3) -> Result<u32, ClusterError> {
        let id = self
            .block_id_of(block)
            .ok_or(ClusterError::OutOfBounds {
                coords: block,
                extent: self.grid,
            })?;
        if let Some(&slot) = self.slots.get(&id) {
            return Ok(slot);
        }

        let slot = self.block_ids.len() as u32;
        self.block_ids.push(id);
        self.slots.insert(id, slot);
        self.data.resize(self.data.len() + self.block_len, 0.0);
        Ok(slot)
    }

    /// Allocate a block (if needed) and overwrite all of its values.
    pub fn insert_block_values(
        &mut self,
        block: UVec3,
        values: &[f32],
    ) -> Result<u32, ClusterError> {
        if values.len() != self.block_len {
            return Err(ClusterError::BlockSizeMismatch {
                slot: self.slot_of(block).unwrap_or(self.block_ids.len() as u32),
                expected: self.block_len,
                got: values.len(),
            });
        }
        let slot = self.insert_block(block)?;
        let start = slot as usize * self.block_len;
        self.data[start..start + self.block_len].copy_from_slice(values);
        Ok(slot)
    }

    /// Set the value of the cell at global cell coordinates, allocating its block.
    pub fn set(&mut self, cell: UVec3, value: f32) -> Result<CellKey, ClusterError> {
        if !cell.cmplt(self.extent()).all() {
            return Err(ClusterError::OutOfBounds {
                coords: cell,
                extent: self.extent(),
            });
        }
        let side = self.side as u32;
        let slot = self.insert_block(cell / side)?;
        let key = CellKey::new(slot, cell_index(cell % side, self.side));
        self.data[key.flat(self.block_len)] = value;
        Ok(key)
    }

    /// Value at global cell coordinates, if its block is allocated.
    pub fn get(&self, cell: UVec3) -> Option<f32> {
        self.key_of(cell).map(|key| self.data[key.flat(self.block_len)])
    }

    /// Key of the cell at global cell coordinates, if its block is allocated.
    pub fn key_of(&self, cell: UVec3) -> Option<CellKey> {
        if !cell.cmplt(self.extent()).all() {
            return None;
        }
        let side = self.side as u32;
        let slot = self.slot_of(cell / side)?;
        Some(CellKey::new(slot, cell_index(cell % side, self.side)))
    }

    /// Global cell coordinates of `key`.
    pub fn cell_coords(&self, key: CellKey) -> UVec3 {
        let block = self.block_coords(self.block_ids[key.block as usize]);
        block * self.side as u32 + cell_coords(key.cell as usize, self.side)
    }
}

impl VelocitySpace for VelocityMesh {
    #[inline]
    fn block_side(&self) -> usize {
        self.side
    }

    #[inline]
    fn num_blocks(&self) -> usize {
        self.block_ids.len()
    }

    #[inline]
    fn block_id(&self, slot: u32) -> u32 {
        self.block_ids[slot as usize]
    }

    #[inline]
    fn block_values(&self, slot: u32) -> &[f32] {
        let start = slot as usize * self.block_len;
        &self.data[start..start + self.block_len]
    }

    fn block_neighbor(&self, slot: u32, direction: BlockDirection) -> NeighborBlock {
        let origin = self.block_coords(self.block_ids[slot as usize]);
        let offset = direction.offset();
        let target = match (
            origin.x.checked_add_signed(offset.x),
            origin.y.checked_add_signed(offset.y),
            origin.z.checked_add_signed(offset.z),
        ) {
            (Some(x), Some(y), Some(z)) => UVec3::new(x, y, z),
            _ => return NeighborBlock::Missing,
        };
        match self.block_id_of(target) {
            None => NeighborBlock::Missing,
            Some(id) => match self.slots.get(&id) {
                Some(&neighbor) => NeighborBlock::Occupied(neighbor),
                None => NeighborBlock::Empty,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_allocates_block_and_roundtrips() {
        let mut mesh = VelocityMesh::new(UVec3::new(3, 2, 2), 4).unwrap();
        assert_eq!(mesh.extent(), UVec3::new(12, 8, 8));

        let key = mesh.set(UVec3::new(5, 1, 7), 2.5).unwrap();
        assert_eq!(mesh.num_blocks(), 1);
        assert_eq!(mesh.block_values(0).len(), 64);
        assert_eq!(mesh.get(UVec3::new(5, 1, 7)), Some(2.5));
        assert_eq!(mesh.get(UVec3::new(4, 1, 7)), Some(0.0));
        assert_eq!(mesh.get(UVec3::new(0, 0, 0)), None);
        assert_eq!(mesh.cell_coords(key), UVec3::new(5, 1, 7));
        assert_eq!(mesh.block_coords(mesh.block_id(0)), UVec3::new(1, 0, 1));
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut mesh = VelocityMesh::new(UVec3::splat(2), 2).unwrap();
        assert!(matches!(
            mesh.set(UVec3::new(4, 0, 0), 1.0),
            Err(ClusterError::OutOfBounds { .. })
        ));
        assert!(matches!(
            mesh.insert_block_values(UVec3::ZERO, &[1.0; 7]),
            Err(ClusterError::BlockSizeMismatch { got: 7, .. })
        ));
        assert!(VelocityMesh::new(UVec3::new(0, 1, 1), 2).is_err());
        assert!(VelocityMesh::new(UVec3::ONE, 0).is_err());
    }

    #[test]
    fn test_block_neighbor_kinds() {
        let mut mesh = VelocityMesh::new(UVec3::new(3, 1, 1), 2).unwrap();
        let left = mesh.insert_block(UVec3::new(0, 0, 0)).unwrap();
        let right = mesh.insert_block(UVec3::new(2, 0, 0)).unwrap();

        let plus_x = BlockDirection::from_offset(glam::IVec3::X);
        let minus_x = plus_x.opposite();

        assert_eq!(mesh.block_neighbor(left, minus_x), NeighborBlock::Missing);
        assert_eq!(mesh.block_neighbor(left, plus_x), NeighborBlock::Empty);
        assert_eq!(mesh.block_neighbor(right, plus_x), NeighborBlock::Missing);
        assert_eq!(
            mesh.block_neighbor(left, BlockDirection::SELF),
            NeighborBlock::Occupied(left)
        );

        let middle = mesh.insert_block(UVec3::new(1, 0, 0)).unwrap();
        assert_eq!(
            mesh.block_neighbor(left, plus_x),
            NeighborBlock::Occupied(middle)
        );
        assert_eq!(
            mesh.block_neighbor(right, minus_x),
            NeighborBlock::Occupied(middle)
        );
    }

    #[test]
    fn test_oversized_grid_rejected() {
        // 2^30 blocks of side 4 per axis would overflow the cell extent.
        assert!(matches!(
            VelocityMesh::new(UVec3::new(1 << 30, 2, 1), 4),
            Err(ClusterError::InvalidParameter(_))
        ));
        assert!(matches!(
            VelocityMesh::new(UVec3::new((1 << 31) + 3, 1, 1), 1),
            Err(ClusterError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_neighbors_at_far_grid_edge() {
        let nx = i32::MAX as u32;
        let mut mesh = VelocityMesh::new(UVec3::new(nx, 1, 1), 1).unwrap();
        assert_eq!(mesh.extent(), UVec3::new(nx, 1, 1));

        let inner = mesh.insert_block(UVec3::new(nx - 2, 0, 0)).unwrap();
        let last = mesh.insert_block(UVec3::new(nx - 1, 0, 0)).unwrap();
        let plus_x = BlockDirection::from_offset(glam::IVec3::X);

        assert_eq!(mesh.block_neighbor(inner, plus_x), NeighborBlock::Occupied(last));
        assert_eq!(
            mesh.block_neighbor(last, plus_x.opposite()),
            NeighborBlock::Occupied(inner)
        );
        assert_eq!(mesh.block_neighbor(last, plus_x), NeighborBlock::Missing);
        assert_eq!(mesh.get(UVec3::new(nx - 1, 0, 0)), Some(0.0));
    }
}
