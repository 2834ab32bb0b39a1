//! Merge-find registry for clusters found during the descending walk.
//!
//! Instead of a parent-pointer forest, each cluster owns one record in an arena and
//! every id ever folded into it (its aliases) redirects straight to that record. A merge
//! rewrites the redirects of the side with fewer aliases, so `find` is O(1) and a merge
//! costs O(aliases moved). This suits the walk, which does few merges of large clusters.

use super::constants::FIRST_CLUSTER_ID;
use rustc_hash::{FxHashMap, FxHashSet};

/// Stable handle to a cluster: the id it was created with.
///
/// Handles stay valid after merges; they resolve to whichever record absorbed them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterHandle(u32);

impl ClusterHandle {
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Rebuild a handle from an id previously returned by [`ClusterHandle::raw`].
    #[inline]
    pub(crate) fn from_raw(id: u32) -> Self {
        debug_assert!(id >= FIRST_CLUSTER_ID, "reserved id used as a handle");
        Self(id)
    }

    #[inline]
    fn arena_index(self) -> usize {
        debug_assert!(self.0 >= FIRST_CLUSTER_ID, "reserved id used as a handle");
        (self.0 - FIRST_CLUSTER_ID) as usize
    }

    #[inline]
    fn from_arena_index(index: usize) -> Self {
        Self(FIRST_CLUSTER_ID + index as u32)
    }
}

/// Id and size of a live cluster, as seen by merge triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterSummary {
    pub id: u32,
    pub members: u32,
}

#[derive(Debug)]
struct ClusterRecord {
    /// Representative id: the smallest id folded into this record.
    id: u32,
    members: u32,
    /// Every creation id that resolves to this record.
    aliases: FxHashSet<u32>,
    /// Crossing-edge counts keyed by a creation id of the neighboring cluster.
    edges: FxHashMap<u32, u32>,
}

/// Arena of cluster records plus the id -> record redirect table.
#[derive(Debug, Default)]
pub struct ClusterRegistry {
    /// Indexed by `creation id - FIRST_CLUSTER_ID`; retired records are `None`.
    records: Vec<Option<ClusterRecord>>,
    /// Indexed like `records`; arena index of the live record each id resolves to.
    redirect: Vec<u32>,
    merges: usize,
}

impl ClusterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(clusters: usize) -> Self {
        Self {
            records: Vec::with_capacity(clusters),
            redirect: Vec::with_capacity(clusters),
            merges: 0,
        }
    }

    /// Start a new single-member cluster with the next unused id.
    pub fn create(&mut self) -> ClusterHandle {
        let index = self.records.len();
        let handle = ClusterHandle::from_arena_index(index);

        let mut aliases = FxHashSet::default();
        aliases.insert(handle.0);
        self.records.push(Some(ClusterRecord {
            id: handle.0,
            members: 1,
            aliases,
            edges: FxHashMap::default(),
        }));
        self.redirect.push(index as u32);
        handle
    }

    #[inline]
    fn slot(&self, handle: ClusterHandle) -> usize {
        self.redirect[handle.arena_index()] as usize
    }

    #[inline]
    fn record(&self, handle: ClusterHandle) -> &ClusterRecord {
        match &self.records[self.slot(handle)] {
            Some(record) => record,
            None => unreachable!("cluster {} redirects to a retired record", handle.0),
        }
    }

    #[inline]
    fn record_mut(&mut self, handle: ClusterHandle) -> &mut ClusterRecord {
        let slot = self.slot(handle);
        match &mut self.records[slot] {
            Some(record) => record,
            None => unreachable!("cluster {} redirects to a retired record", handle.0),
        }
    }

    /// Current representative id of the cluster containing `handle`.
    #[inline]
    pub fn find(&self, handle: ClusterHandle) -> u32 {
        self.record(handle).id
    }

    /// Whether `id` has been folded into the cluster containing `handle`.
    #[inline]
    pub fn contains(&self, handle: ClusterHandle, id: u32) -> bool {
        self.record(handle).aliases.contains(&id)
    }

    #[inline]
    pub fn same_cluster(&self, a: ClusterHandle, b: ClusterHandle) -> bool {
        self.slot(a) == self.slot(b)
    }

    #[inline]
    pub fn members(&self, handle: ClusterHandle) -> u32 {
        self.record(handle).members
    }

    #[inline]
    pub fn summary(&self, handle: ClusterHandle) -> ClusterSummary {
        let record = self.record(handle);
        ClusterSummary {
            id: record.id,
            members: record.members,
        }
    }

    /// Add members without a merge.
    #[inline]
    pub fn append_member(&mut self, handle: ClusterHandle, count: u32) {
        self.record_mut(handle).members += count;
    }

    /// Count one crossing edge between two different clusters, on both sides.
    pub fn record_edge(&mut self, a: ClusterHandle, b: ClusterHandle) {
        debug_assert!(!self.same_cluster(a, b), "edge inside one cluster");
        *self.record_mut(a).edges.entry(b.0).or_insert(0) += 1;
        *self.record_mut(b).edges.entry(a.0).or_insert(0) += 1;
    }

    /// Crossing edges from the cluster of `a` to the cluster of `b`.
    pub fn edges_between(&self, a: ClusterHandle, b: ClusterHandle) -> u32 {
        let target = self.slot(b);
        self.record(a)
            .edges
            .iter()
            .filter(|&(&other, _)| self.slot(ClusterHandle(other)) == target)
            .map(|(_, &count)| count)
            .sum()
    }

    /// Fold two distinct live clusters into one. Returns a handle of the survivor.
    ///
    /// The record with more aliases survives and absorbs the other; the absorbed
    /// record is retired. The merged id is the smaller of the two ids.
    pub fn merge(&mut self, a: ClusterHandle, b: ClusterHandle) -> ClusterHandle {
        let (slot_a, slot_b) = (self.slot(a), self.slot(b));
        debug_assert_ne!(slot_a, slot_b, "merging a cluster with itself");

        let aliases_a = self.record(a).aliases.len();
        let aliases_b = self.record(b).aliases.len();
        let (keep, drop) = if aliases_a >= aliases_b {
            (slot_a, slot_b)
        } else {
            (slot_b, slot_a)
        };

        let Some(loser) = self.records[drop].take() else {
            unreachable!("merging a retired cluster record");
        };
        for &alias in &loser.aliases {
            self.redirect[ClusterHandle(alias).arena_index()] = keep as u32;
        }

        let Some(survivor) = self.records[keep].as_mut() else {
            unreachable!("merging into a retired cluster record");
        };
        debug_assert!(loser.id != survivor.id);
        survivor.id = survivor.id.min(loser.id);
        survivor.members += loser.members;
        survivor.aliases.extend(loser.aliases);
        for (other, count) in loser.edges {
            *survivor.edges.entry(other).or_insert(0) += count;
        }
        let ClusterRecord { aliases, edges, .. } = survivor;
        edges.retain(|other, _| !aliases.contains(other));

        self.merges += 1;
        ClusterHandle::from_arena_index(keep)
    }

    /// Merge adjacent clusters whose crossing-edge count is large relative to their
    /// surface (`edges / members^(2/3) > ratio`), until no pair qualifies.
    ///
    /// Returns the number of merges performed.
    pub fn merge_by_connectivity(&mut self, ratio: f64) -> usize {
        let mut total = 0;
        loop {
            let mut merged = 0;
            for index in 0..self.records.len() {
                if self.records[index].is_none() {
                    continue;
                }
                let handle = ClusterHandle::from_arena_index(index);
                while let Some(target) = self.strongest_neighbor(handle, ratio) {
                    log::trace!(
                        "connectivity merge: {} <- {} ({} edges)",
                        self.find(handle),
                        self.find(target),
                        self.edges_between(handle, target)
                    );
                    self.merge(handle, target);
                    merged += 1;
                }
            }
            total += merged;
            if merged == 0 {
                return total;
            }
        }
    }

    /// Lowest-indexed live neighbor of `handle` passing the connectivity ratio.
    fn strongest_neighbor(&self, handle: ClusterHandle, ratio: f64) -> Option<ClusterHandle> {
        let own = self.slot(handle);
        let record = self.record(handle);
        let surface = (record.members as f64).powf(2.0 / 3.0);

        let mut per_neighbor: FxHashMap<usize, u32> = FxHashMap::default();
        for (&other, &count) in &record.edges {
            let slot = self.slot(ClusterHandle(other));
            if slot != own {
                *per_neighbor.entry(slot).or_insert(0) += count;
            }
        }

        per_neighbor
            .into_iter()
            .filter(|&(_, count)| count as f64 / surface > ratio)
            .map(|(slot, _)| slot)
            .min()
            .map(ClusterHandle::from_arena_index)
    }

    /// Number of ids handed out by [`ClusterRegistry::create`].
    #[inline]
    pub fn created(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn merges(&self) -> usize {
        self.merges
    }

    /// Number of clusters that have not been absorbed.
    pub fn live(&self) -> usize {
        self.records.iter().filter(|r| r.is_some()).count()
    }

    /// Summaries of live clusters, ordered by id.
    pub fn live_summaries(&self) -> Vec<ClusterSummary> {
        let mut out: Vec<ClusterSummary> = self
            .records
            .iter()
            .flatten()
            .map(|r| ClusterSummary {
                id: r.id,
                members: r.members,
            })
            .collect();
        out.sort_unstable_by_key(|s| s.id);
        out
    }
}
