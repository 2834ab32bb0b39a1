//! Intra-block neighbor tables for blocked velocity grids.
//!
//! A block is a cube of `side³` velocity cells indexed `i + j*side + k*side²`. For every
//! cell index the tables list its 26-neighborhood split into:
//! - local neighbors: indices inside the same block
//! - remote neighbors: grouped by the adjacent block they live in, with the wrapped
//!   index inside that block
//!
//! The tables depend only on `side`. [`NeighborTopology::shared`] builds them once per
//! side and hands out the same `Arc` afterwards.

use crate::error::ClusterError;
use crate::types::BlockDirection;
use glam::{IVec3, UVec3};
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};


/// Largest supported block side; `side³` must fit a `u16` cell index.
pub const MAX_BLOCK_SIDE: usize = 40;

/// Neighbors of a cell that all live in the same adjacent block.
#[derive(Debug, Clone, Copy)]
struct RemoteGroup {
    direction: BlockDirection,
    start: u32,
    len: u8,
}

/// Precomputed neighbor tables for one block side.
///
/// Immutable after construction; safe to share across threads.
#[derive(Debug)]
pub struct NeighborTopology {
    side: usize,
    /// Start index into `local_cells` for each cell, plus final length.
    /// Length: side³ + 1
    local_offsets: Vec<u32>,
    local_cells: Vec<u16>,
    /// Start index into `remote_groups` for each cell, plus final length.
    /// Length: side³ + 1
    remote_offsets: Vec<u32>,
    remote_groups: Vec<RemoteGroup>,
    /// Wrapped target indices, referenced by `RemoteGroup::start..start+len`.
    remote_cells: Vec<u16>,
}

/// Cell coordinates inside a block for an intra-block index.
#[inline]
pub fn cell_coords(index: usize, side: usize) -> UVec3 {
    UVec3::new(
        (index % side) as u32,
        ((index / side) % side) as u32,
        (index / (side * side)) as u32,
    )
}

/// Intra-block index for cell coordinates.
#[inline]
pub fn cell_index(coords: UVec3, side: usize) -> u16 {
    debug_assert!(coords.cmplt(UVec3::splat(side as u32)).all());
    (coords.x as usize + coords.y as usize * side + coords.z as usize * side * side) as u16
}

/// The 26 offsets of the 3×3×3 neighborhood, without the center.
fn neighbor_offsets() -> impl Iterator<Item = IVec3> {
    (-1..=1)
        .flat_map(|dz| (-1..=1).flat_map(move |dy| (-1..=1).map(move |dx| IVec3::new(dx, dy, dz))))
        .filter(|&offset| offset != IVec3::ZERO)
}

impl NeighborTopology {
    /// Build the tables for blocks of `side³` cells.
    pub fn new(side: usize) -> Result<Self, ClusterError> {
        if side == 0 || side > MAX_BLOCK_SIDE {
            return Err(ClusterError::InvalidBlockSide(side));
        }

        let block_len = side * side * side;
        let extent = IVec3::splat(side as i32);

        let mut local_offsets = Vec::with_capacity(block_len + 1);
        let mut local_cells = Vec::with_capacity(block_len * 26);
        let mut remote_offsets = Vec::with_capacity(block_len + 1);
        let mut remote_groups = Vec::new();
        let mut remote_cells = Vec::new();

        // Per-cell groups in first-seen order; at most 7 blocks are touched by one cell
        // (26 when side == 1).
        let mut pending: Vec<(BlockDirection, Vec<u16>)> = Vec::with_capacity(26);

        for index in 0..block_len {
            local_offsets.push(local_cells.len() as u32);
            remote_offsets.push(remote_groups.len() as u32);
            pending.clear();

            let coords = cell_coords(index, side).as_ivec3();
            for offset in neighbor_offsets() {
                let target = coords + offset;
                let inside = target.cmpge(IVec3::ZERO).all() && target.cmplt(extent).all();
                if inside {
                    local_cells.push(cell_index(target.as_uvec3(), side));
                    continue;
                }

                // Step into the adjacent block and wrap to the opposite face.
                let block_shift = target.div_euclid(extent);
                let wrapped = target.rem_euclid(extent);
                let direction = BlockDirection::from_offset(block_shift);
                let cell = cell_index(wrapped.as_uvec3(), side);

                match pending.iter_mut().find(|(d, _)| *d == direction) {
                    Some((_, cells)) => cells.push(cell),
                    None => pending.push((direction, vec![cell])),
                }
            }

            for (direction, cells) in pending.drain(..) {
                remote_groups.push(RemoteGroup {
                    direction,
                    start: remote_cells.len() as u32,
                    len: cells.len() as u8,
                });
                remote_cells.extend_from_slice(&cells);
            }
        }

        local_offsets.push(local_cells.len() as u32);
        remote_offsets.push(remote_groups.len() as u32);

        Ok(Self {
            side,
            local_offsets,
            local_cells,
            remote_offsets,
            remote_groups,
            remote_cells,
        })
    }

    /// Tables for `side`, built on first use and cached for the process lifetime.
    pub fn shared(side: usize) -> Result<Arc<Self>, ClusterError> {
        static CACHE: OnceLock<Mutex<FxHashMap<usize, Arc<NeighborTopology>>>> = OnceLock::new();

        let cache = CACHE.get_or_init(Default::default);
        // Entries are inserted fully built, so a poisoned lock still holds valid tables.
        let mut guard = cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(topology) = guard.get(&side) {
            return Ok(Arc::clone(topology));
        }

        let topology = Arc::new(Self::new(side)?);
        guard.insert(side, Arc::clone(&topology));
        Ok(topology)
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    /// Cells per block (`side³`).
    #[inline]
    pub fn block_len(&self) -> usize {
        self.local_offsets.len() - 1
    }

    /// Same-block neighbors of `cell`.
    #[inline]
    pub fn local_neighbors(&self, cell: u16) -> &[u16] {
        let i = cell as usize;
        let start = self.local_offsets[i] as usize;
        let end = self.local_offsets[i + 1] as usize;
        &self.local_cells[start..end]
    }

    /// Cross-block neighbors of `cell`, one `(direction, indices)` entry per adjacent block.
    #[inline]
    pub fn remote_neighbors(&self, cell: u16) -> RemoteNeighbors<'_> {
        let i = cell as usize;
        let start = self.remote_offsets[i] as usize;
        let end = self.remote_offsets[i + 1] as usize;
        RemoteNeighbors {
            groups: self.remote_groups[start..end].iter(),
            cells: &self.remote_cells,
        }
    }

    /// Total neighbors of `cell` (always 26).
    #[inline]
    pub fn neighbor_count(&self, cell: u16) -> usize {
        self.local_neighbors(cell).len()
            + self
                .remote_neighbors(cell)
                .map(|(_, cells)| cells.len())
                .sum::<usize>()
    }
}

/// Iterator over the remote neighbor groups of one cell.
#[derive(Debug, Clone)]
pub struct RemoteNeighbors<'a> {
    groups: std::slice::Iter<'a, RemoteGroup>,
    cells: &'a [u16],
}

impl<'a> Iterator for RemoteNeighbors<'a> {
    type Item = (BlockDirection, &'a [u16]);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let group = self.groups.next()?;
        let start = group.start as usize;
        Some((
            group.direction,
            &self.cells[start..start + group.len as usize],
        ))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.groups.size_hint()
    }
}

impl ExactSizeIterator for RemoteNeighbors<'_> {}
