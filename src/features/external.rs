//! Capability traits for the underlying detector, extractor, and matcher.
//!
//! The core drives these through narrow interfaces and makes no thread-safety
//! assumption about implementations: calls into a given instance are always
//! serialized by the pipeline. Reference implementations live in
//! [`crate::adapters`].

use crate::features::{DMatch, Descriptors, KeyPoint};
use crate::image::ImageView;
use crate::util::AffMatchResult;

/// Detects salient locations in an image.
pub trait FeatureDetector: Send {
    /// Returns keypoints in image coordinates.
    ///
    /// When a mask is given, keypoints must only be reported where the mask is
    /// non-zero. The `view_id` field of returned keypoints is not trusted; the
    /// simulator overwrites it.
    fn detect(
        &self,
        image: ImageView<'_, u8>,
        mask: Option<ImageView<'_, u8>>,
    ) -> AffMatchResult<Vec<KeyPoint>>;
}

/// Computes fixed-width descriptors for detected keypoints.
pub trait DescriptorExtractor: Send {
    /// Computes one descriptor row per surviving keypoint.
    ///
    /// Implementations may drop keypoints for which no descriptor can be
    /// computed; afterwards row `i` of the result describes `keypoints[i]`.
    fn compute(
        &self,
        image: ImageView<'_, u8>,
        keypoints: &mut Vec<KeyPoint>,
    ) -> AffMatchResult<Descriptors>;
}

/// Matches query descriptors against train descriptors.
///
/// Distances are non-negative and smaller is better. Match indices refer to
/// the row ordering of the given matrices.
pub trait DescriptorMatcher: Send {
    /// Returns up to `k` nearest train matches per query row, best first.
    fn knn_match(
        &self,
        query: &Descriptors,
        train: &Descriptors,
        k: usize,
    ) -> AffMatchResult<Vec<Vec<DMatch>>>;

    /// Returns all train matches within `max_distance` per query row,
    /// ordered by ascending distance.
    fn radius_match(
        &self,
        query: &Descriptors,
        train: &Descriptors,
        max_distance: f32,
    ) -> AffMatchResult<Vec<Vec<DMatch>>>;
}
