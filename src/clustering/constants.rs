//! Reserved ids and default policy parameters.

/// Cells excluded by the background floor.
pub const BACKGROUND_ID: u32 = 0;

/// Cells never reached by the walk.
pub const NO_CLUSTER_ID: u32 = 1;

/// Id of the first cluster; later clusters count up from here.
pub const FIRST_CLUSTER_ID: u32 = 2;

/// Default value threshold for the threshold-expansion policy.
pub const DEFAULT_VALUE_THRESHOLD: f32 = -100.0;

/// Default size-gate fraction of the expected cell count.
pub const DEFAULT_SIZE_FRACTION: f64 = 0.002;

/// Default crossing-edge / members^(2/3) ratio above which clusters merge.
pub const DEFAULT_CONNECTIVITY_RATIO: f64 = 2.5;
