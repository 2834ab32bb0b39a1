//! Error types for population clustering.

use glam::UVec3;
use std::fmt;

/// Errors reported at the clustering API boundary.
///
/// Internal invariant violations (a neighbor outside the catalog, a merge of a retired
/// cluster) are not represented here; they are programming faults and are checked with
/// debug assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterError {
    /// Block side length outside `1..=MAX_BLOCK_SIDE`.
    InvalidBlockSide(usize),

    /// A block exposed a value slice whose length is not `side³`.
    BlockSizeMismatch {
        slot: u32,
        expected: usize,
        got: usize,
    },

    /// The caller-provided output buffer cannot hold one id per velocity cell.
    OutputTooSmall { needed: usize, got: usize },

    /// Cell or block coordinates outside the velocity mesh.
    OutOfBounds { coords: UVec3, extent: UVec3 },

    /// A configuration parameter is out of range or not finite.
    InvalidParameter(String),
}

impl fmt::Display for ClusterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterError::InvalidBlockSide(side) => {
                write!(
                    f,
                    "invalid block side: need 1..={}, got {}",
                    crate::topology::MAX_BLOCK_SIDE,
                    side
                )
            }
            ClusterError::BlockSizeMismatch {
                slot,
                expected,
                got,
            } => {
                write!(
                    f,
                    "block {} has {} values, expected {}",
                    slot, got, expected
                )
            }
            ClusterError::OutputTooSmall { needed, got } => {
                write!(
                    f,
                    "output buffer too small: need {} ids, got {}",
                    needed, got
                )
            }
            ClusterError::OutOfBounds { coords, extent } => {
                write!(f, "coordinates {} outside extent {}", coords, extent)
            }
            ClusterError::InvalidParameter(msg) => {
                write!(f, "invalid parameter: {}", msg)
            }
        }
    }
}

impl std::error::Error for ClusterError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mentions_values() {
        let err = ClusterError::OutputTooSmall { needed: 64, got: 8 };
        assert_eq!(err.to_string(), "output buffer too small: need 64 ids, got 8");

        let err = ClusterError::InvalidBlockSide(0);
        assert!(err.to_string().contains("got 0"));
    }
}
