//! Structural validation of cluster assignments.
//!
//! Checks that every cluster is connected under 26-adjacency and that reported member
//! counts agree with the per-cell ids. Useful for testing policies and for catching
//! regressions in the merge bookkeeping.

use crate::catalog::VelocityCatalog;
use crate::clustering::constants::{BACKGROUND_ID, FIRST_CLUSTER_ID, NO_CLUSTER_ID};
use crate::error::ClusterError;
use crate::resolver::NeighborResolver;
use crate::topology::NeighborTopology;
use crate::types::VelocitySpace;
use crate::ClusterOutput;
use rustc_hash::FxHashMap;

/// Validation report for one cluster assignment.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Number of velocity cells checked.
    pub num_cells: usize,
    /// Cells carrying the background id.
    pub background_cells: usize,
    /// Cells carrying the no-cluster id.
    pub unassigned_cells: usize,
    /// Distinct cluster ids found.
    pub num_clusters: usize,
    /// Members of the largest cluster.
    pub largest_cluster: usize,

    /// Cluster ids whose cells split into more than one connected component.
    pub disconnected_clusters: Vec<u32>,
    /// Cluster ids whose reported member count differs from the cells carrying them.
    pub member_mismatches: Vec<u32>,
    /// Cluster ids present in the cells but missing from the reported clusters.
    pub unreported_clusters: Vec<u32>,
}

impl ValidationReport {
    /// Every cluster connected and all bookkeeping consistent.
    pub fn is_valid(&self) -> bool {
        self.disconnected_clusters.is_empty()
            && self.member_mismatches.is_empty()
            && self.unreported_clusters.is_empty()
    }

    /// Valid, and every non-background cell belongs to a cluster.
    pub fn is_perfect(&self) -> bool {
        self.is_valid() && self.unassigned_cells == 0
    }

    /// Format a summary of any issues found.
    pub fn summary(&self) -> String {
        if self.is_perfect() {
            return "Perfect".to_string();
        }

        let mut issues = Vec::new();
        if !self.disconnected_clusters.is_empty() {
            issues.push(format!(
                "{} disconnected clusters (first: {})",
                self.disconnected_clusters.len(),
                self.disconnected_clusters[0]
            ));
        }
        if !self.member_mismatches.is_empty() {
            issues.push(format!(
                "{} clusters with wrong member counts",
                self.member_mismatches.len()
            ));
        }
        if !self.unreported_clusters.is_empty() {
            issues.push(format!(
                "{} unreported clusters",
                self.unreported_clusters.len()
            ));
        }
        if self.unassigned_cells > 0 {
            issues.push(format!("{} unassigned cells", self.unassigned_cells));
        }
        issues.join(", ")
    }
}

/// Check connectivity of every cluster in `ids` (one id per velocity cell, flat order).
pub fn validate_assignment<S: VelocitySpace + ?Sized>(
    space: &S,
    ids: &[u32],
) -> Result<ValidationReport, ClusterError> {
    let topology = NeighborTopology::shared(space.block_side())?;
    let catalog = VelocityCatalog::from_space(space)?;
    let n = catalog.len();
    if ids.len() < n {
        return Err(ClusterError::OutputTooSmall {
            needed: n,
            got: ids.len(),
        });
    }
    let ids = &ids[..n];
    let resolver = NeighborResolver::new(space, &topology);

    let mut report = ValidationReport {
        num_cells: n,
        ..Default::default()
    };

    let mut components: FxHashMap<u32, (usize, usize)> = FxHashMap::default();
    let mut visited = vec![false; n];
    let mut stack = Vec::new();
    let mut neighbors = Vec::with_capacity(26);

    for start in 0..n {
        match ids[start] {
            BACKGROUND_ID => report.background_cells += 1,
            NO_CLUSTER_ID => report.unassigned_cells += 1,
            _ => {}
        }
        let id = ids[start];
        if id < FIRST_CLUSTER_ID || visited[start] {
            continue;
        }

        // Flood the component of `start` through cells sharing its id.
        let mut size = 0;
        visited[start] = true;
        stack.push(start);
        while let Some(flat) = stack.pop() {
            size += 1;
            resolver.resolve_into(catalog.cell(flat).key, &mut neighbors);
            for &neighbor in &neighbors {
                let other = catalog.flat(neighbor);
                if !visited[other] && ids[other] == id {
                    visited[other] = true;
                    stack.push(other);
                }
            }
        }

        let entry = components.entry(id).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += size;
    }

    let mut disconnected: Vec<u32> = components
        .iter()
        .filter(|&(_, &(count, _))| count > 1)
        .map(|(&id, _)| id)
        .collect();
    disconnected.sort_unstable();

    report.num_clusters = components.len();
    report.largest_cluster = components.values().map(|&(_, size)| size).max().unwrap_or(0);
    report.disconnected_clusters = disconnected;
    Ok(report)
}

/// [`validate_assignment`] plus a cross-check of the reported cluster summaries.
pub fn validate_output<S: VelocitySpace + ?Sized>(
    space: &S,
    output: &ClusterOutput,
) -> Result<ValidationReport, ClusterError> {
    let mut report = validate_assignment(space, &output.ids)?;

    let mut counts: FxHashMap<u32, u32> = FxHashMap::default();
    for &id in &output.ids {
        if id >= FIRST_CLUSTER_ID {
            *counts.entry(id).or_insert(0) += 1;
        }
    }

    for summary in &output.clusters {
        if counts.get(&summary.id).copied().unwrap_or(0) != summary.members {
            report.member_mismatches.push(summary.id);
        }
    }
    let mut unreported: Vec<u32> = counts
        .keys()
        .copied()
        .filter(|&id| output.summary(id).is_none())
        .collect();
    unreported.sort_unstable();
    report.unreported_clusters = unreported;

    Ok(report)
}
