//! Core types for velocity-space clustering.

use glam::IVec3;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Identity of one velocity cell within a spatial cell.
///
/// `block` is the storage slot of the owning block (`0..num_blocks`), `cell` the
/// intra-block index (`i + j*side + k*side²`). The pair maps to a flat index into the
/// spatial cell's block storage via [`CellKey::flat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub block: u32,
    pub cell: u16,
}

impl CellKey {
    #[inline]
    pub const fn new(block: u32, cell: u16) -> Self {
        Self { block, cell }
    }

    /// Position in the flattened block storage.
    #[inline]
    pub fn flat(self, block_len: usize) -> usize {
        self.block as usize * block_len + self.cell as usize
    }

    /// Inverse of [`CellKey::flat`].
    #[inline]
    pub fn from_flat(flat: usize, block_len: usize) -> Self {
        debug_assert!(block_len > 0);
        Self::new((flat / block_len) as u32, (flat % block_len) as u16)
    }
}

/// One velocity-space sample: identity plus amplitude.
///
/// Equality and hashing use the identity only. There is no `Ord`; sort by value with
/// [`VelocityCell::cmp_by_value`].
#[derive(Debug, Clone, Copy)]
pub struct VelocityCell {
    pub key: CellKey,
    pub value: f32,
}

impl PartialEq for VelocityCell {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for VelocityCell {}

impl Hash for VelocityCell {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl VelocityCell {
    /// Ascending by value (`total_cmp`), ties broken by identity.
    #[inline]
    pub fn cmp_by_value(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp(&other.value)
            .then_with(|| self.key.cmp(&other.key))
    }
}

/// Direction from a block to one of its 27 neighbors (including itself).
///
/// Encoded base-3 as `(dx+1) + 3(dy+1) + 9(dz+1)` for offsets in `{-1, 0, 1}³`,
/// so [`BlockDirection::SELF`] is 13.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockDirection(u8);

impl BlockDirection {
    pub const COUNT: usize = 27;
    pub const SELF: Self = Self(13);

    #[inline]
    pub const fn new(id: u8) -> Option<Self> {
        if (id as usize) < Self::COUNT {
            Some(Self(id))
        } else {
            None
        }
    }

    /// Direction for a block offset with every component in `{-1, 0, 1}`.
    #[inline]
    pub fn from_offset(offset: IVec3) -> Self {
        debug_assert!(
            offset.cmpge(IVec3::NEG_ONE).all() && offset.cmple(IVec3::ONE).all(),
            "block offset out of range: {}",
            offset
        );
        let d = offset + IVec3::ONE;
        Self((d.x + 3 * d.y + 9 * d.z) as u8)
    }

    #[inline]
    pub fn offset(self) -> IVec3 {
        let id = self.0 as i32;
        IVec3::new(id % 3, (id / 3) % 3, id / 9) - IVec3::ONE
    }

    #[inline]
    pub fn opposite(self) -> Self {
        Self(26 - self.0)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }
}

/// What a block sees when it looks in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborBlock {
    /// No block reference at all (edge of the velocity grid).
    Missing,
    /// The shared empty sentinel: the block exists in the grid but holds no data.
    Empty,
    /// An occupied block, by storage slot.
    Occupied(u32),
}

/// Read-only view of one spatial cell's velocity blocks.
///
/// This is the seam to the surrounding simulation: implement it for the host's
/// spatial-cell type to cluster its data in place. [`crate::VelocityMesh`] is a
/// self-contained implementation.
pub trait VelocitySpace {
    /// Cells per block edge.
    fn block_side(&self) -> usize;

    /// Number of occupied blocks; slots are `0..num_blocks()`.
    fn num_blocks(&self) -> usize;

    /// Global id of the block stored at `slot`.
    fn block_id(&self, slot: u32) -> u32 {
        slot
    }

    /// Sample values of the block at `slot`, indexed by intra-block cell index.
    fn block_values(&self, slot: u32) -> &[f32];

    /// Neighbor of the block at `slot` in `direction`.
    fn block_neighbor(&self, slot: u32, direction: BlockDirection) -> NeighborBlock;

    #[inline]
    fn block_len(&self) -> usize {
        let side = self.block_side();
        side * side * side
    }

    #[inline]
    fn num_cells(&self) -> usize {
        self.num_blocks() * self.block_len()
    }
}

impl<T: VelocitySpace + ?Sized> VelocitySpace for &T {
    #[inline]
    fn block_side(&self) -> usize {
        (**self).block_side()
    }
    #[inline]
    fn num_blocks(&self) -> usize {
        (**self).num_blocks()
    }
    #[inline]
    fn block_id(&self, slot: u32) -> u32 {
        (**self).block_id(slot)
    }
    #[inline]
    fn block_values(&self, slot: u32) -> &[f32] {
        (**self).block_values(slot)
    }
    #[inline]
    fn block_neighbor(&self, slot: u32, direction: BlockDirection) -> NeighborBlock {
        (**self).block_neighbor(slot, direction)
    }
}
