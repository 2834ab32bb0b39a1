//! Clustering driver: catalog, walk, optional post-pass, output.

pub mod constants;
mod expansion;
pub mod policy;
pub mod registry;
pub(crate) mod timing;
mod walk;

use std::sync::Arc;

use crate::catalog::VelocityCatalog;
use crate::error::ClusterError;
use crate::resolver::NeighborResolver;
use crate::topology::NeighborTopology;
use crate::types::VelocitySpace;
use crate::ClusterConfig;
use constants::{BACKGROUND_ID, NO_CLUSTER_ID};
use policy::{AlwaysMerge, ClusteringPolicy, MergeTrigger, NeverMerge, SizeGate};
use registry::ClusterSummary;
use timing::{LapTimer, TimingBuilder};
use walk::{Assignment, Contact};

/// Counters describing one clustering invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterStats {
    /// Velocity cells in the spatial cell (ids written).
    pub cells: usize,
    /// Cells below the background floor (id 0).
    pub background_cells: usize,
    /// Cells the walk never reached (id 1).
    pub unassigned_cells: usize,
    /// Cluster ids handed out.
    pub clusters_created: usize,
    pub merges: usize,
    /// Clusters left after all merges.
    pub clusters: usize,
}

/// Stats plus the surviving clusters, ordered by id.
pub(crate) struct Clustered {
    pub stats: ClusterStats,
    pub clusters: Vec<ClusterSummary>,
}

enum Algorithm<'t> {
    Expansion {
        threshold: f32,
    },
    Walk {
        contact: Contact<'t>,
        connectivity_ratio: Option<f64>,
    },
}

struct Prepared {
    topology: Arc<NeighborTopology>,
    catalog: VelocityCatalog,
}

fn prepare<S: VelocitySpace + ?Sized>(
    space: &S,
    out_len: usize,
) -> Result<Prepared, ClusterError> {
    let topology = NeighborTopology::shared(space.block_side())?;
    let catalog = VelocityCatalog::from_space(space)?;
    if out_len < catalog.len() {
        return Err(ClusterError::OutputTooSmall {
            needed: catalog.len(),
            got: out_len,
        });
    }
    Ok(Prepared { topology, catalog })
}

/// Run one of the built-in policies and write one id per velocity cell into `out`.
pub(crate) fn cluster_policy<S: VelocitySpace + ?Sized>(
    space: &S,
    config: &ClusterConfig,
    out: &mut [u32],
) -> Result<Clustered, ClusterError> {
    config.validate()?;

    let mut lap = LapTimer::start();
    let prepared = prepare(space, out.len())?;
    let mut tb = TimingBuilder::new();
    tb.set_catalog(lap.lap());

    let gate;
    let algorithm = match config.policy {
        ClusteringPolicy::ThresholdExpansion { value_threshold } => Algorithm::Expansion {
            threshold: value_threshold,
        },
        ClusteringPolicy::AlwaysMerge => Algorithm::Walk {
            contact: Contact::Merge(&AlwaysMerge),
            connectivity_ratio: None,
        },
        ClusteringPolicy::SizeGated {
            fraction,
            expected_cells,
        } => {
            gate = SizeGate::new(
                fraction,
                expected_cells.unwrap_or(prepared.catalog.len()),
            );
            Algorithm::Walk {
                contact: Contact::Merge(&gate),
                connectivity_ratio: None,
            }
        }
        ClusteringPolicy::ConnectivityRatio { ratio } => Algorithm::Walk {
            contact: Contact::CountEdges,
            connectivity_ratio: Some(ratio),
        },
        ClusteringPolicy::NoMerge => Algorithm::Walk {
            contact: Contact::Merge(&NeverMerge),
            connectivity_ratio: None,
        },
    };

    Ok(execute(
        space,
        &prepared,
        config.background_floor,
        algorithm,
        out,
        config.policy.name(),
        lap,
        tb,
    ))
}

/// Descending walk merging whenever `trigger` agrees.
pub(crate) fn cluster_trigger<S: VelocitySpace + ?Sized>(
    space: &S,
    background_floor: Option<f32>,
    trigger: &dyn MergeTrigger,
    out: &mut [u32],
) -> Result<Clustered, ClusterError> {
    crate::validate_floor(background_floor)?;

    let mut lap = LapTimer::start();
    let prepared = prepare(space, out.len())?;
    let mut tb = TimingBuilder::new();
    tb.set_catalog(lap.lap());

    let algorithm = Algorithm::Walk {
        contact: Contact::Merge(trigger),
        connectivity_ratio: None,
    };
    Ok(execute(
        space,
        &prepared,
        background_floor,
        algorithm,
        out,
        "custom",
        lap,
        tb,
    ))
}

#[allow(clippy::too_many_arguments)]
fn execute<S: VelocitySpace + ?Sized>(
    space: &S,
    prepared: &Prepared,
    background_floor: Option<f32>,
    algorithm: Algorithm<'_>,
    out: &mut [u32],
    policy_name: &str,
    mut lap: LapTimer,
    mut tb: TimingBuilder,
) -> Clustered {
    let catalog = &prepared.catalog;
    if catalog.is_empty() {
        log::debug!("{}: empty velocity space, nothing to cluster", policy_name);
        return Clustered {
            stats: ClusterStats::default(),
            clusters: Vec::new(),
        };
    }

    let resolver = NeighborResolver::new(space, &prepared.topology);
    let mut assignment = Assignment::new(catalog, background_floor);

    match algorithm {
        Algorithm::Expansion { threshold } => {
            expansion::threshold_expansion(&resolver, catalog, &mut assignment, threshold);
            tb.set_walk(lap.lap());
        }
        Algorithm::Walk {
            contact,
            connectivity_ratio,
        } => {
            walk::descending_walk(&resolver, catalog, &mut assignment, contact);
            tb.set_walk(lap.lap());
            if let Some(ratio) = connectivity_ratio {
                let merged = assignment.registry.merge_by_connectivity(ratio);
                log::trace!("{}: post-pass merged {} clusters", policy_name, merged);
                tb.set_post_pass(lap.lap());
            }
        }
    }

    assignment.write_into(out);
    tb.set_write(lap.lap());

    let registry = &assignment.registry;
    let stats = ClusterStats {
        cells: catalog.len(),
        background_cells: assignment.count(BACKGROUND_ID),
        unassigned_cells: assignment.count(NO_CLUSTER_ID),
        clusters_created: registry.created(),
        merges: registry.merges(),
        clusters: registry.live(),
    };
    log::debug!(
        "{}: {} cells, {} background, {} unassigned, {} clusters created, {} merges, {} left",
        policy_name,
        stats.cells,
        stats.background_cells,
        stats.unassigned_cells,
        stats.clusters_created,
        stats.merges,
        stats.clusters
    );

    let timings = tb.finish();
    timings.report(stats.cells, policy_name);

    Clustered {
        stats,
        clusters: registry.live_summaries(),
    }
}
