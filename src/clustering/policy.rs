//! Merge policies for the descending walk.

use super::constants::{
    DEFAULT_CONNECTIVITY_RATIO, DEFAULT_SIZE_FRACTION, DEFAULT_VALUE_THRESHOLD,
};
use super::registry::ClusterSummary;
use crate::error::ClusterError;

/// Decides whether two different adjacent clusters merge when the walk finds a contact.
///
/// Closures `Fn(ClusterSummary, ClusterSummary) -> bool` implement this trait.
pub trait MergeTrigger {
    fn should_merge(&self, a: ClusterSummary, b: ClusterSummary) -> bool;
}

impl<F> MergeTrigger for F
where
    F: Fn(ClusterSummary, ClusterSummary) -> bool,
{
    #[inline]
    fn should_merge(&self, a: ClusterSummary, b: ClusterSummary) -> bool {
        self(a, b)
    }
}

/// Merge on first contact.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysMerge;

impl MergeTrigger for AlwaysMerge {
    #[inline]
    fn should_merge(&self, _a: ClusterSummary, _b: ClusterSummary) -> bool {
        true
    }
}

/// Never merge: each cell joins the first assigned neighbor it sees.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverMerge;

impl MergeTrigger for NeverMerge {
    #[inline]
    fn should_merge(&self, _a: ClusterSummary, _b: ClusterSummary) -> bool {
        false
    }
}

/// Merge only when one side is still small: fewer members than `fraction * expected_cells`.
#[derive(Debug, Clone, Copy)]
pub struct SizeGate {
    limit: f64,
}

impl SizeGate {
    pub fn new(fraction: f64, expected_cells: usize) -> Self {
        Self {
            limit: fraction * expected_cells as f64,
        }
    }

    /// Member count below which a cluster is still mergeable.
    #[inline]
    pub fn limit(&self) -> f64 {
        self.limit
    }
}

impl MergeTrigger for SizeGate {
    #[inline]
    fn should_merge(&self, a: ClusterSummary, b: ClusterSummary) -> bool {
        (a.members as f64) < self.limit || (b.members as f64) < self.limit
    }
}

/// Built-in clustering policies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClusteringPolicy {
    /// Grow one cluster at a time breadth-first from the highest unassigned cell,
    /// absorbing neighbors with `value >= value_threshold`. Unreached cells keep
    /// the no-cluster id.
    ThresholdExpansion { value_threshold: f32 },

    /// Descending walk, merging on every contact between two clusters.
    AlwaysMerge,

    /// Descending walk, merging only while one side has fewer than
    /// `fraction * expected_cells` members. `expected_cells` defaults to the number of
    /// cells in the spatial cell.
    SizeGated {
        fraction: f64,
        expected_cells: Option<usize>,
    },

    /// Descending walk without merges that counts crossing edges, followed by a
    /// post-pass merging clusters with `edges / members^(2/3) > ratio`.
    ConnectivityRatio { ratio: f64 },

    /// Descending walk without merges.
    NoMerge,
}

impl Default for ClusteringPolicy {
    fn default() -> Self {
        Self::size_gated()
    }
}

impl ClusteringPolicy {
    pub fn threshold_expansion() -> Self {
        Self::ThresholdExpansion {
            value_threshold: DEFAULT_VALUE_THRESHOLD,
        }
    }

    pub fn size_gated() -> Self {
        Self::SizeGated {
            fraction: DEFAULT_SIZE_FRACTION,
            expected_cells: None,
        }
    }

    pub fn connectivity_ratio() -> Self {
        Self::ConnectivityRatio {
            ratio: DEFAULT_CONNECTIVITY_RATIO,
        }
    }

    /// Short name for logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ThresholdExpansion { .. } => "threshold-expansion",
            Self::AlwaysMerge => "always-merge",
            Self::SizeGated { .. } => "size-gated",
            Self::ConnectivityRatio { .. } => "connectivity-ratio",
            Self::NoMerge => "no-merge",
        }
    }

    pub fn validate(&self) -> Result<(), ClusterError> {
        match *self {
            Self::ThresholdExpansion { value_threshold } if value_threshold.is_nan() => Err(
                ClusterError::InvalidParameter("value threshold is NaN".to_string()),
            ),
            Self::SizeGated { fraction, .. } if !(fraction.is_finite() && fraction >= 0.0) => {
                Err(ClusterError::InvalidParameter(format!(
                    "size fraction must be finite and non-negative, got {}",
                    fraction
                )))
            }
            Self::ConnectivityRatio { ratio } if !(ratio.is_finite() && ratio >= 0.0) => {
                Err(ClusterError::InvalidParameter(format!(
                    "connectivity ratio must be finite and non-negative, got {}",
                    ratio
                )))
            }
            _ => Ok(()),
        }
    }
}
