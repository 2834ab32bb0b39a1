//! Zero-cost timing instrumentation for the clustering driver.
//!
//! When the `timing` feature is enabled, each invocation collects phase timings and
//! reports them on stderr. When disabled, all types are zero-sized and all methods
//! compile away.

#[cfg(feature = "timing")]
mod real;
#[cfg(not(feature = "timing"))]
mod stub;

#[cfg(feature = "timing")]
pub use real::*;
#[cfg(not(feature = "timing"))]
pub use stub::*;
