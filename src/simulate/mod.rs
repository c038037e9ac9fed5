//! View simulation: warp an image per view, detect and describe on the warp,
//! and map the features back into original-image coordinates.
//!
//! For each catalog entry the image is rotated onto an enlarged canvas,
//! anti-alias filtered, and compressed along the x axis. Detection and
//! description run on the warped image; surviving keypoints travel back
//! through the inverse affine, get their orientation corrected by the view
//! rotation, and are tagged with the view id. Warps may run in parallel, but
//! calls into the external detector and extractor are always serialized in
//! catalog order, so the concatenated output is deterministic.

use crate::features::external::{DescriptorExtractor, FeatureDetector};
use crate::features::FeatureSet;
use crate::image::{ImageView, OwnedImage};
use crate::trace::diag;
use crate::util::math::wrap_deg_0_360;
use crate::util::{AffMatchError, AffMatchResult};
use crate::views::{ViewCatalog, ViewParams};
use crate::warp::{
    anti_alias_sigma, compress_x_u8, gaussian_blur_x_u8, rotate_expand_u8, AffineMap,
};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Smallest warped dimension still worth detecting in.
const MIN_WARPED_DIM: usize = 4;

/// Fill value for canvas padding outside the rotated content.
const PAD_FILL: u8 = 0;

/// A warped view with its coverage mask and coordinate maps.
pub struct WarpedView {
    /// Parameters the view was built from.
    pub params: ViewParams,
    /// The warped image.
    pub image: OwnedImage,
    /// 1 where the warped pixel's pre-image lies inside the original extent.
    pub mask: OwnedImage,
    /// Original coordinates to warped coordinates.
    pub forward: AffineMap,
    /// Warped coordinates back to original coordinates.
    pub backward: AffineMap,
}

enum Prepared {
    /// Trivial view: detect directly on the original image.
    Trivial,
    /// Warped view ready for detection.
    Warped(Box<WarpedView>),
    /// View too small after compression; contributes nothing.
    Skipped,
}

/// Warps an image for one view entry.
///
/// Returns `None` when the compressed canvas falls below the minimum useful
/// size. Trivial entries (t = 1, phi = 0) still produce a warp here; the
/// simulation pipeline short-circuits them before calling this.
pub fn warp_view(
    image: ImageView<'_, u8>,
    params: &ViewParams,
) -> AffMatchResult<Option<WarpedView>> {
    let (rotated, rotation) = rotate_expand_u8(image, params.phi_deg, PAD_FILL);
    let blurred = gaussian_blur_x_u8(rotated.view(), anti_alias_sigma(params.tilt));
    let (tilted, compression) = compress_x_u8(blurred.view(), params.tilt);
    if tilted.width() < MIN_WARPED_DIM || tilted.height() < MIN_WARPED_DIM {
        return Ok(None);
    }

    let forward = compression.compose(&rotation);
    let backward = forward.invert()?;
    let mask = coverage_mask(
        &backward,
        tilted.width(),
        tilted.height(),
        image.width(),
        image.height(),
    );
    Ok(Some(WarpedView {
        params: *params,
        image: tilted,
        mask,
        forward,
        backward,
    }))
}

fn coverage_mask(
    backward: &AffineMap,
    width: usize,
    height: usize,
    src_width: usize,
    src_height: usize,
) -> OwnedImage {
    let max_x = src_width as f32 - 1.0;
    let max_y = src_height as f32 - 1.0;
    let epsilon = 1e-3;
    let mut data = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let (sx, sy) = backward.apply(x as f32, y as f32);
            if sx >= -epsilon && sx <= max_x + epsilon && sy >= -epsilon && sy <= max_y + epsilon {
                data[y * width + x] = 1;
            }
        }
    }
    OwnedImage::new(data, width, height).expect("mask is contiguous")
}

fn is_trivial(params: &ViewParams) -> bool {
    params.tilt <= 1.0 + 1e-6 && params.phi_deg.abs() < 1e-6
}

fn prepare_view(image: ImageView<'_, u8>, params: &ViewParams) -> AffMatchResult<Prepared> {
    if is_trivial(params) {
        return Ok(Prepared::Trivial);
    }
    Ok(match warp_view(image, params)? {
        Some(warped) => Prepared::Warped(Box::new(warped)),
        None => Prepared::Skipped,
    })
}

fn mask_allows(mask: &OwnedImage, x: f32, y: f32) -> bool {
    if !x.is_finite() || !y.is_finite() || x < -0.5 || y < -0.5 {
        return false;
    }
    let px = x.round() as usize;
    let py = y.round() as usize;
    matches!(mask.view().get(px, py), Some(&value) if value != 0)
}

fn detect_on_view(
    image: ImageView<'_, u8>,
    params: &ViewParams,
    prepared: &Prepared,
    detector: &dyn FeatureDetector,
    extractor: &dyn DescriptorExtractor,
) -> AffMatchResult<FeatureSet> {
    match prepared {
        Prepared::Skipped => Ok(FeatureSet::empty()),
        Prepared::Trivial => {
            let mut keypoints = detector.detect(image, None)?;
            let descriptors = extractor.compute(image, &mut keypoints)?;
            for kp in keypoints.iter_mut() {
                kp.view_id = params.view_id;
            }
            FeatureSet::new(keypoints, descriptors)
        }
        Prepared::Warped(warped) => {
            let view = warped.image.view();
            let mut keypoints = detector.detect(view, Some(warped.mask.view()))?;
            // Detections on canvas padding are dropped even if the detector
            // ignored the mask.
            keypoints.retain(|kp| mask_allows(&warped.mask, kp.x, kp.y));
            let descriptors = extractor.compute(view, &mut keypoints)?;
            for kp in keypoints.iter_mut() {
                let (ox, oy) = warped.backward.apply(kp.x, kp.y);
                kp.x = ox;
                kp.y = oy;
                kp.angle_deg = wrap_deg_0_360(kp.angle_deg - warped.params.phi_deg);
                kp.view_id = params.view_id;
            }
            FeatureSet::new(keypoints, descriptors)
        }
    }
}

/// Simulates every view of a catalog and concatenates the results.
pub fn simulate_catalog(
    image: ImageView<'_, u8>,
    catalog: &ViewCatalog,
    detector: &dyn FeatureDetector,
    extractor: &dyn DescriptorExtractor,
    parallel: bool,
) -> AffMatchResult<FeatureSet> {
    simulate_entries(image, catalog.entries(), detector, extractor, parallel)
}

/// Simulates a slice of view entries and concatenates the results.
///
/// Per-view detector or extractor failures skip the view with a diagnostic;
/// the call fails only when every attempted view fails. A view producing zero
/// keypoints is not a failure. `parallel` is ignored when the `rayon` feature
/// is disabled.
pub fn simulate_entries(
    image: ImageView<'_, u8>,
    entries: &[ViewParams],
    detector: &dyn FeatureDetector,
    extractor: &dyn DescriptorExtractor,
    parallel: bool,
) -> AffMatchResult<FeatureSet> {
    let use_parallel = parallel && cfg!(feature = "rayon");
    diag!("simulate", views = entries.len(), parallel = use_parallel);
    if entries.is_empty() {
        return Ok(FeatureSet::empty());
    }

    let prepared: Vec<AffMatchResult<Prepared>> = if use_parallel {
        #[cfg(feature = "rayon")]
        {
            entries
                .par_iter()
                .map(|params| prepare_view(image, params))
                .collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            entries
                .iter()
                .map(|params| prepare_view(image, params))
                .collect()
        }
    } else {
        entries
            .iter()
            .map(|params| prepare_view(image, params))
            .collect()
    };

    let mut out = FeatureSet::empty();
    let mut attempted = 0usize;
    let mut failed = 0usize;
    let mut last_reason = String::new();
    for (params, prepared) in entries.iter().zip(prepared) {
        let prepared = match prepared {
            Ok(Prepared::Skipped) => {
                diag!("view_skipped", view_id = params.view_id, tilt = params.tilt);
                continue;
            }
            Ok(prepared) => prepared,
            Err(err) => {
                attempted += 1;
                failed += 1;
                last_reason = err.to_string();
                diag!("view_warp_failed", view_id = params.view_id);
                continue;
            }
        };

        attempted += 1;
        match detect_on_view(image, params, &prepared, detector, extractor) {
            Ok(fragment) => {
                diag!(
                    "view_simulated",
                    view_id = params.view_id,
                    keypoints = fragment.len()
                );
                out.append(fragment)?;
            }
            Err(err) => {
                failed += 1;
                last_reason = err.to_string();
                diag!("view_detect_failed", view_id = params.view_id);
            }
        }
    }

    if attempted > 0 && failed == attempted {
        return Err(AffMatchError::ViewSimulationFailed {
            reason: last_reason,
        });
    }
    Ok(out)
}
