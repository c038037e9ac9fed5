//! Affine-covariant feature matching between two images.
//!
//! A plain detector/descriptor pipeline matches well only under small
//! viewpoint changes. This crate compensates by synthesizing a family of
//! affine-warped views of each image (tilt + in-plane rotation), running a
//! conventional detector, extractor, and matcher independently per view, and
//! fusing the per-view-pair matches back into a single correspondence list in
//! original-image coordinates.
//!
//! The detector, extractor, and matcher are pluggable capabilities (see
//! [`FeatureDetector`], [`DescriptorExtractor`], [`DescriptorMatcher`]);
//! reference implementations live in [`adapters`]. [`AffMatcherHelper`] is
//! the two-image entry point, either with a fixed tilt bound or growing the
//! view set until enough matches survive filtering.

pub mod adapters;
pub mod lowlevel;

mod features;
mod image;
mod matcher;
mod pipeline;
mod simulate;
pub(crate) mod trace;
mod util;
mod views;
mod warp;

pub use crate::features::external::{DescriptorExtractor, DescriptorMatcher, FeatureDetector};
pub use crate::features::{DMatch, Descriptors, FeatureSet, KeyPoint};
pub use crate::image::{ImageView, OwnedImage};
pub use crate::matcher::filter::{ratio_filter, suppress_duplicates};
pub use crate::matcher::{AffDescriptorMatcher, ViewPair, ViewPairSet};
pub use crate::pipeline::{AffMatcherHelper, CancelToken, HelperConfig, MatchReport};
pub use crate::simulate::{simulate_catalog, simulate_entries, WarpedView};
pub use crate::util::error::{AffMatchError, AffMatchResult};
pub use crate::views::{level_for_max_tilt, tilt_for_level, ViewCatalog, ViewParams, MAX_VIEWS};
pub use crate::warp::AffineMap;
