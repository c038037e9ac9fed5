//! High-level two-image matching facade.
//!
//! `AffMatcherHelper` owns the external detector, extractor, and matcher
//! handles, simulates views of both images, runs the partitioned matcher, and
//! filters the unified match list. Single-shot matching builds the full view
//! catalog for a tilt bound; the progressive entry point grows the catalog
//! level by level until enough matches survive filtering.

mod progressive;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::features::external::{DescriptorExtractor, DescriptorMatcher, FeatureDetector};
use crate::features::{DMatch, KeyPoint};
use crate::image::ImageView;
use crate::matcher::filter::{ratio_filter, suppress_duplicates};
use crate::matcher::{AffDescriptorMatcher, ViewPairSet};
use crate::simulate::simulate_catalog;
use crate::trace::diag;
use crate::util::{AffMatchError, AffMatchResult};
use crate::views::ViewCatalog;

/// Neighbors fetched per query for the distance-ratio test.
const RATIO_TEST_K: usize = 2;

/// Configuration for the matching facade.
#[derive(Clone, Debug)]
pub struct HelperConfig {
    /// Progressive matching stops once this many filtered matches survive.
    pub target_matches: usize,
    /// Highest tilt level the progressive loop may reach.
    pub max_level: usize,
    /// Enables parallel view warps when the `rayon` feature is available.
    ///
    /// When the feature is disabled, setting this is a configuration error.
    pub parallel: bool,
    /// Pixel radius for duplicate suppression; `None` disables the pass.
    pub duplicate_radius: Option<f32>,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            target_matches: 64,
            max_level: 5,
            parallel: false,
            duplicate_radius: None,
        }
    }
}

impl HelperConfig {
    /// Validates the configuration, returning an error if any parameter is invalid.
    pub fn validate(&self) -> AffMatchResult<()> {
        if self.target_matches == 0 {
            return Err(AffMatchError::InvalidConfig {
                reason: "target_matches must be at least 1",
            });
        }
        if let Some(radius) = self.duplicate_radius {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(AffMatchError::InvalidConfig {
                    reason: "duplicate_radius must be a positive finite value",
                });
            }
        }
        #[cfg(not(feature = "rayon"))]
        if self.parallel {
            return Err(AffMatchError::ParallelUnavailable);
        }
        Ok(())
    }
}

/// Cooperative cancellation handle for the progressive loop.
///
/// Cancellation is observed at level boundaries only; a level in flight runs
/// to completion.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Result of a two-image match.
#[derive(Clone, Debug)]
pub struct MatchReport {
    /// View-tagged keypoints of the first image, in simulation order.
    pub keypoints_a: Vec<KeyPoint>,
    /// View-tagged keypoints of the second image, in simulation order.
    pub keypoints_b: Vec<KeyPoint>,
    /// Filtered matches; indices refer to the keypoint vectors above.
    pub matches: Vec<DMatch>,
    /// Tilt level the pipeline ran at (or stopped at, when progressive).
    pub level_reached: usize,
    /// True when the progressive loop hit the tilt ceiling before reaching
    /// its match target.
    pub reached_ceiling: bool,
}

/// Two-image affine-covariant matching pipeline.
pub struct AffMatcherHelper {
    detector: Box<dyn FeatureDetector>,
    extractor: Box<dyn DescriptorExtractor>,
    matcher: AffDescriptorMatcher,
    cfg: HelperConfig,
    cancel: Option<CancelToken>,
}

impl AffMatcherHelper {
    /// Creates a helper around the three external capabilities.
    pub fn new(
        detector: Box<dyn FeatureDetector>,
        extractor: Box<dyn DescriptorExtractor>,
        matcher: Box<dyn DescriptorMatcher>,
    ) -> Self {
        Self {
            detector,
            extractor,
            matcher: AffDescriptorMatcher::new(matcher),
            cfg: HelperConfig::default(),
            cancel: None,
        }
    }

    /// Replaces the helper configuration.
    ///
    /// Use `try_with_config` for validation of the configuration.
    pub fn with_config(mut self, cfg: HelperConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Replaces the helper configuration with validation.
    pub fn try_with_config(mut self, cfg: HelperConfig) -> AffMatchResult<Self> {
        cfg.validate()?;
        self.cfg = cfg;
        Ok(self)
    }

    /// Installs a cancellation token checked at level boundaries.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &HelperConfig {
        &self.cfg
    }

    /// Matches two images with the full view catalog for `max_tilt`.
    ///
    /// Simulates every catalog view of both images, runs the partitioned
    /// matcher over all view pairs with k = 2, and applies the distance-ratio
    /// filter (and duplicate suppression when configured).
    pub fn match_with_max_tilt(
        &self,
        image_a: ImageView<'_, u8>,
        image_b: ImageView<'_, u8>,
        ratio: f32,
        max_tilt: f32,
    ) -> AffMatchResult<MatchReport> {
        self.cfg.validate()?;
        validate_ratio(ratio)?;
        diag!("match_with_max_tilt", max_tilt = max_tilt);

        let catalog = ViewCatalog::for_max_tilt(max_tilt)?;
        let features_a = simulate_catalog(
            image_a,
            &catalog,
            self.detector.as_ref(),
            self.extractor.as_ref(),
            self.cfg.parallel,
        )?;
        let features_b = simulate_catalog(
            image_b,
            &catalog,
            self.detector.as_ref(),
            self.extractor.as_ref(),
            self.cfg.parallel,
        )?;
        if features_a.is_empty() && features_b.is_empty() {
            return Err(AffMatchError::EmptyFeatureSets);
        }

        let rows = if features_a.is_empty() || features_b.is_empty() {
            Vec::new()
        } else {
            self.matcher
                .knn_match_sets(&features_a, &features_b, &ViewPairSet::new(), RATIO_TEST_K)?
        };
        let matches =
            self.filtered_matches(&rows, ratio, features_a.keypoints(), features_b.keypoints());
        diag!(
            "matched",
            matches = matches.len(),
            level = catalog.max_level()
        );

        let (keypoints_a, _) = features_a.into_parts();
        let (keypoints_b, _) = features_b.into_parts();
        Ok(MatchReport {
            keypoints_a,
            keypoints_b,
            matches,
            level_reached: catalog.max_level(),
            reached_ceiling: false,
        })
    }

    /// Matches two images, growing the view set until enough matches survive.
    ///
    /// Starts from the identity view and adds one tilt level per iteration,
    /// re-simulating only the new views and matching only view pairs that
    /// involve them. Stops once the filtered match count reaches
    /// `target_matches` or the configured tilt ceiling; hitting the ceiling is
    /// reported in the result, not as an error.
    pub fn match_increasing_tilt(
        &self,
        image_a: ImageView<'_, u8>,
        image_b: ImageView<'_, u8>,
        ratio: f32,
    ) -> AffMatchResult<MatchReport> {
        progressive::run(self, image_a, image_b, ratio)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, CancelToken::is_cancelled)
    }

    fn filtered_matches(
        &self,
        rows: &[Vec<DMatch>],
        ratio: f32,
        keypoints_a: &[KeyPoint],
        keypoints_b: &[KeyPoint],
    ) -> Vec<DMatch> {
        let matches = ratio_filter(rows, ratio);
        match self.cfg.duplicate_radius {
            Some(radius) => suppress_duplicates(&matches, keypoints_a, keypoints_b, radius),
            None => matches,
        }
    }
}

fn validate_ratio(ratio: f32) -> AffMatchResult<()> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(AffMatchError::InvalidConfig {
            reason: "ratio must be a positive finite value",
        });
    }
    Ok(())
}
