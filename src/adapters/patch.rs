//! Oriented normalized-patch descriptor extractor.

use crate::features::external::DescriptorExtractor;
use crate::features::{Descriptors, KeyPoint};
use crate::image::ImageView;
use crate::util::math::sin_cos_deg;
use crate::util::AffMatchResult;

/// Samples a square intensity patch in the keypoint's local frame.
///
/// The sampling grid is rotated by the keypoint orientation, then the patch is
/// normalized to zero mean and unit L2 norm, which makes the descriptor
/// invariant to in-plane rotation and affine brightness changes. Keypoints
/// whose patch leaves the image are dropped.
#[derive(Clone, Debug)]
pub struct PatchExtractor {
    /// Patch half-width; the descriptor has `(2 * radius + 1)^2` elements.
    pub patch_radius: usize,
}

impl Default for PatchExtractor {
    fn default() -> Self {
        Self { patch_radius: 8 }
    }
}

impl PatchExtractor {
    /// Creates an extractor with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the descriptor width in elements.
    pub fn descriptor_len(&self) -> usize {
        let side = 2 * self.patch_radius + 1;
        side * side
    }

    fn sample_patch(&self, image: ImageView<'_, u8>, kp: &KeyPoint) -> Option<Vec<f32>> {
        let radius = self.patch_radius as isize;
        let (sin_a, cos_a) = sin_cos_deg(kp.angle_deg);
        let mut values = Vec::with_capacity(self.descriptor_len());
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let u = cos_a * dx as f32 - sin_a * dy as f32;
                let v = sin_a * dx as f32 + cos_a * dy as f32;
                values.push(image.sample_bilinear(kp.x + u, kp.y + v)?);
            }
        }

        let n = values.len() as f32;
        let mean = values.iter().sum::<f32>() / n;
        let mut norm_sq = 0.0f32;
        for value in values.iter_mut() {
            *value -= mean;
            norm_sq += *value * *value;
        }
        let norm = norm_sq.sqrt();
        if norm > 1e-6 {
            for value in values.iter_mut() {
                *value /= norm;
            }
        }
        Some(values)
    }
}

impl DescriptorExtractor for PatchExtractor {
    fn compute(
        &self,
        image: ImageView<'_, u8>,
        keypoints: &mut Vec<KeyPoint>,
    ) -> AffMatchResult<Descriptors> {
        let mut survivors = Vec::with_capacity(keypoints.len());
        let mut descriptors = Descriptors::empty(self.descriptor_len());
        for kp in keypoints.iter() {
            if let Some(row) = self.sample_patch(image, kp) {
                descriptors.push_row(&row)?;
                survivors.push(*kp);
            }
        }
        *keypoints = survivors;
        Ok(descriptors)
    }
}
