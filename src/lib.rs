//! Velocity-space population clustering.
//!
//! Given the velocity cells of one spatial cell, stored as cubic blocks of `side³` cells,
//! this crate partitions the cells into connected clusters by walking them from the
//! highest value down and growing, merging or cutting clusters according to a
//! [`ClusteringPolicy`]. Each velocity cell receives a cluster id; ids `0` and `1` are
//! reserved for background and unreached cells.
//!
//! # Example
//!
//! ```
//! use glam::UVec3;
//! use vspace_populations::{cluster_with, ClusterConfig, ClusteringPolicy, VelocityMesh};
//!
//! // One 4³ block with two separated 2-cell populations.
//! let mut mesh = VelocityMesh::new(UVec3::ONE, 4).unwrap();
//! mesh.set(UVec3::new(0, 0, 0), 5.0).unwrap();
//! mesh.set(UVec3::new(1, 0, 0), 4.0).unwrap();
//! mesh.set(UVec3::new(3, 3, 3), 3.0).unwrap();
//! mesh.set(UVec3::new(3, 3, 2), 2.0).unwrap();
//!
//! let config = ClusterConfig {
//!     policy: ClusteringPolicy::AlwaysMerge,
//!     background_floor: Some(1.0),
//! };
//! let output = cluster_with(&mesh, config).expect("clustering should succeed");
//! assert_eq!(output.num_clusters(), 2);
//! assert_eq!(output.ids.len(), 64);
//! ```

mod catalog;
pub mod clustering;
mod error;
mod mesh;
mod resolver;
pub mod topology;
mod types;
pub mod validation;

pub use catalog::VelocityCatalog;
pub use clustering::constants::{BACKGROUND_ID, FIRST_CLUSTER_ID, NO_CLUSTER_ID};
pub use clustering::policy::{AlwaysMerge, ClusteringPolicy, MergeTrigger, NeverMerge, SizeGate};
pub use clustering::registry::{ClusterHandle, ClusterRegistry, ClusterSummary};
pub use clustering::ClusterStats;
pub use error::ClusterError;
pub use mesh::VelocityMesh;
pub use resolver::NeighborResolver;
pub use topology::NeighborTopology;
pub use types::{BlockDirection, CellKey, NeighborBlock, VelocityCell, VelocitySpace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Conditionally parallel iterator over a slice.
macro_rules! maybe_par_iter {
    ($slice:expr) => {{
        #[cfg(feature = "parallel")]
        {
            $slice.par_iter()
        }
        #[cfg(not(feature = "parallel"))]
        {
            $slice.iter()
        }
    }};
}

/// Configuration for one clustering invocation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClusterConfig {
    /// How clusters grow and merge. Defaults to [`ClusteringPolicy::size_gated`].
    pub policy: ClusteringPolicy,

    /// Cells with a value below this floor are background: they get [`BACKGROUND_ID`]
    /// and never join or connect clusters. `None` clusters every cell.
    pub background_floor: Option<f32>,
}

impl ClusterConfig {
    pub fn new(policy: ClusteringPolicy) -> Self {
        Self {
            policy,
            background_floor: None,
        }
    }

    pub fn with_background_floor(mut self, floor: f32) -> Self {
        self.background_floor = Some(floor);
        self
    }

    /// Reject parameters that cannot produce a meaningful clustering.
    pub fn validate(&self) -> Result<(), ClusterError> {
        self.policy.validate()?;
        validate_floor(self.background_floor)
    }
}

pub(crate) fn validate_floor(floor: Option<f32>) -> Result<(), ClusterError> {
    match floor {
        Some(f) if f.is_nan() => Err(ClusterError::InvalidParameter(
            "background floor is NaN".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Cluster ids of every velocity cell plus the clusters they refer to.
#[derive(Debug, Clone)]
pub struct ClusterOutput {
    /// One id per velocity cell, indexed by [`CellKey::flat`].
    pub ids: Vec<u32>,
    /// Surviving clusters, ordered by id.
    pub clusters: Vec<ClusterSummary>,
    pub stats: ClusterStats,
}

impl ClusterOutput {
    #[inline]
    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    pub fn summary(&self, id: u32) -> Option<ClusterSummary> {
        self.clusters
            .binary_search_by_key(&id, |s| s.id)
            .ok()
            .map(|i| self.clusters[i])
    }

    /// Flat indices of the cells carrying `id`.
    pub fn cells_in(&self, id: u32) -> impl Iterator<Item = usize> + '_ {
        self.ids
            .iter()
            .enumerate()
            .filter(move |&(_, &c)| c == id)
            .map(|(flat, _)| flat)
    }
}

/// Cluster a velocity space with default settings.
pub fn cluster<S: VelocitySpace + ?Sized>(space: &S) -> Result<ClusterOutput, ClusterError> {
    cluster_with(space, ClusterConfig::default())
}

/// Cluster a velocity space with explicit configuration.
pub fn cluster_with<S: VelocitySpace + ?Sized>(
    space: &S,
    config: ClusterConfig,
) -> Result<ClusterOutput, ClusterError> {
    let mut ids = vec![NO_CLUSTER_ID; space.num_cells()];
    let clustered = clustering::cluster_policy(space, &config, &mut ids)?;
    Ok(ClusterOutput {
        ids,
        clusters: clustered.clusters,
        stats: clustered.stats,
    })
}

/// Cluster into a caller-provided buffer, one id per velocity cell at its flat index.
///
/// `out` must hold at least `num_blocks * side³` entries; entries past that are left
/// untouched. An empty velocity space writes nothing.
pub fn cluster_into<S: VelocitySpace + ?Sized>(
    space: &S,
    config: &ClusterConfig,
    out: &mut [u32],
) -> Result<ClusterStats, ClusterError> {
    clustering::cluster_policy(space, config, out).map(|c| c.stats)
}

/// Descending walk with a caller-supplied merge rule.
///
/// ```
/// use glam::UVec3;
/// use vspace_populations::{cluster_with_trigger, ClusterSummary, VelocityMesh};
///
/// let mut mesh = VelocityMesh::new(UVec3::ONE, 2).unwrap();
/// mesh.insert_block_values(UVec3::ZERO, &[8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]).unwrap();
///
/// // Merge only while both sides are tiny.
/// let tiny = |a: ClusterSummary, b: ClusterSummary| a.members + b.members <= 2;
/// let mut ids = vec![0; 8];
/// let stats = cluster_with_trigger(&mesh, None, &tiny, &mut ids).unwrap();
/// assert_eq!(stats.cells, 8);
/// assert!(ids.iter().all(|&id| id >= 2));
/// ```
pub fn cluster_with_trigger<S, T>(
    space: &S,
    background_floor: Option<f32>,
    trigger: &T,
    out: &mut [u32],
) -> Result<ClusterStats, ClusterError>
where
    S: VelocitySpace + ?Sized,
    T: MergeTrigger,
{
    clustering::cluster_trigger(space, background_floor, trigger, out).map(|c| c.stats)
}

/// Cluster many independent spatial cells, in parallel with the `parallel` feature.
///
/// Results are in input order; one failing cell does not affect the others.
pub fn cluster_many<S>(
    spaces: &[S],
    config: &ClusterConfig,
) -> Vec<Result<ClusterOutput, ClusterError>>
where
    S: VelocitySpace + Sync,
{
    maybe_par_iter!(spaces)
        .map(|space| cluster_with(space, *config))
        .collect()
}
