//! Reference implementations of the external capabilities.
//!
//! These make the crate usable end to end without an external feature stack:
//! a Harris corner detector with intensity-centroid orientation, an oriented
//! normalized-patch descriptor, and a brute-force L2 matcher. Any of them can
//! be swapped for another implementation of the corresponding trait.

mod brute;
mod harris;
mod patch;

pub use brute::BruteForceMatcher;
pub use harris::HarrisDetector;
pub use patch::PatchExtractor;
