//! Harris corner detector with intensity-centroid orientation.

use crate::features::external::FeatureDetector;
use crate::features::KeyPoint;
use crate::image::ImageView;
use crate::util::math::wrap_deg_0_360;
use crate::util::AffMatchResult;

/// Harris corner detector.
///
/// Responses use the averaged structure tensor over `block_size` with Sobel
/// gradients; corners survive an absolute threshold and 3x3 non-maximum
/// suppression. Orientation is assigned from the intensity centroid within
/// `orientation_radius`, so descriptors sampled in the keypoint frame stay
/// comparable under in-plane rotation.
#[derive(Clone, Debug)]
pub struct HarrisDetector {
    /// Odd window size for the structure tensor sums.
    pub block_size: usize,
    /// Harris trace weight.
    pub k: f32,
    /// Absolute corner response threshold.
    pub threshold: f32,
    /// Radius of the intensity-centroid orientation patch.
    pub orientation_radius: usize,
    /// Keep at most this many strongest corners.
    pub max_keypoints: usize,
}

impl Default for HarrisDetector {
    fn default() -> Self {
        Self {
            block_size: 3,
            k: 0.04,
            threshold: 1e6,
            orientation_radius: 7,
            max_keypoints: 500,
        }
    }
}

impl HarrisDetector {
    /// Creates a detector with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    fn orientation(&self, image: ImageView<'_, u8>, cx: usize, cy: usize) -> f32 {
        let radius = self.orientation_radius as isize;
        let r2 = (radius * radius) as f32;
        let mut m10 = 0.0f32;
        let mut m01 = 0.0f32;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if ((dx * dx + dy * dy) as f32) > r2 {
                    continue;
                }
                let x = cx as isize + dx;
                let y = cy as isize + dy;
                if x < 0 || y < 0 {
                    continue;
                }
                if let Some(&value) = image.get(x as usize, y as usize) {
                    m10 += dx as f32 * value as f32;
                    m01 += dy as f32 * value as f32;
                }
            }
        }
        if m10 == 0.0 && m01 == 0.0 {
            return 0.0;
        }
        wrap_deg_0_360(m01.atan2(m10).to_degrees())
    }
}

impl FeatureDetector for HarrisDetector {
    fn detect(
        &self,
        image: ImageView<'_, u8>,
        mask: Option<ImageView<'_, u8>>,
    ) -> AffMatchResult<Vec<KeyPoint>> {
        let width = image.width();
        let height = image.height();
        let half_block = self.block_size / 2;
        let margin = half_block + 1;
        if width <= 2 * margin || height <= 2 * margin {
            return Ok(Vec::new());
        }

        // Sobel gradients, normalized to per-pixel derivative scale.
        let mut gx = vec![0.0f32; width * height];
        let mut gy = vec![0.0f32; width * height];
        for y in 1..height - 1 {
            let above = image.row(y - 1).expect("row in bounds");
            let here = image.row(y).expect("row in bounds");
            let below = image.row(y + 1).expect("row in bounds");
            for x in 1..width - 1 {
                let horiz = (above[x + 1] as f32 + 2.0 * here[x + 1] as f32
                    + below[x + 1] as f32)
                    - (above[x - 1] as f32 + 2.0 * here[x - 1] as f32 + below[x - 1] as f32);
                let vert = (below[x - 1] as f32 + 2.0 * below[x] as f32 + below[x + 1] as f32)
                    - (above[x - 1] as f32 + 2.0 * above[x] as f32 + above[x + 1] as f32);
                gx[y * width + x] = horiz / 8.0;
                gy[y * width + x] = vert / 8.0;
            }
        }

        // Averaged structure tensor and Harris response.
        let window = (self.block_size * self.block_size) as f32;
        let hb = half_block as isize;
        let mut response = vec![0.0f32; width * height];
        for y in margin..height - margin {
            for x in margin..width - margin {
                let mut sxx = 0.0f32;
                let mut syy = 0.0f32;
                let mut sxy = 0.0f32;
                for by in -hb..=hb {
                    for bx in -hb..=hb {
                        let idx = (y as isize + by) as usize * width + (x as isize + bx) as usize;
                        let dx = gx[idx];
                        let dy = gy[idx];
                        sxx += dx * dx;
                        syy += dy * dy;
                        sxy += dx * dy;
                    }
                }
                sxx /= window;
                syy /= window;
                sxy /= window;
                let det = sxx * syy - sxy * sxy;
                let trace = sxx + syy;
                response[y * width + x] = det - self.k * trace * trace;
            }
        }

        // Threshold, mask, and 3x3 non-maximum suppression.
        let mut keypoints = Vec::new();
        for y in margin..height - margin {
            for x in margin..width - margin {
                let r = response[y * width + x];
                if r <= self.threshold {
                    continue;
                }
                if let Some(mask) = mask {
                    if !matches!(mask.get(x, y), Some(&value) if value != 0) {
                        continue;
                    }
                }
                let mut is_max = true;
                'nms: for dy in -1isize..=1 {
                    for dx in -1isize..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let idx = (y as isize + dy) as usize * width + (x as isize + dx) as usize;
                        if response[idx] > r {
                            is_max = false;
                            break 'nms;
                        }
                    }
                }
                if !is_max {
                    continue;
                }
                let mut kp = KeyPoint::new(x as f32, y as f32, (2 * self.orientation_radius + 1) as f32);
                kp.angle_deg = self.orientation(image, x, y);
                kp.response = r;
                keypoints.push(kp);
            }
        }

        keypoints.sort_by(|a, b| {
            b.response
                .total_cmp(&a.response)
                .then_with(|| (a.y.total_cmp(&b.y)).then(a.x.total_cmp(&b.x)))
        });
        keypoints.truncate(self.max_keypoints);
        Ok(keypoints)
    }
}

#[cfg(test)]
mod tests {
    use super::HarrisDetector;
    use crate::features::external::FeatureDetector;
    use crate::image::ImageView;

    fn bright_square(width: usize, height: usize, x0: usize, y0: usize, side: usize) -> Vec<u8> {
        let mut data = vec![0u8; width * height];
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                data[y * width + x] = 255;
            }
        }
        data
    }

    #[test]
    fn finds_square_corners() {
        let data = bright_square(64, 64, 20, 24, 16);
        let view = ImageView::from_slice(&data, 64, 64).unwrap();
        let keypoints = HarrisDetector::new().detect(view, None).unwrap();
        assert!(keypoints.len() >= 4);
        for corner in [(20.0, 24.0), (35.0, 24.0), (20.0, 39.0), (35.0, 39.0)] {
            let hit = keypoints
                .iter()
                .any(|kp| (kp.x - corner.0).abs() <= 2.0 && (kp.y - corner.1).abs() <= 2.0);
            assert!(hit, "no corner near {corner:?}");
        }
    }

    #[test]
    fn flat_image_yields_nothing() {
        let data = vec![128u8; 32 * 32];
        let view = ImageView::from_slice(&data, 32, 32).unwrap();
        let keypoints = HarrisDetector::new().detect(view, None).unwrap();
        assert!(keypoints.is_empty());
    }

    #[test]
    fn mask_excludes_corners() {
        let data = bright_square(64, 64, 20, 24, 16);
        let view = ImageView::from_slice(&data, 64, 64).unwrap();
        let mask = vec![0u8; 64 * 64];
        let mask_view = ImageView::from_slice(&mask, 64, 64).unwrap();
        let keypoints = HarrisDetector::new().detect(view, Some(mask_view)).unwrap();
        assert!(keypoints.is_empty());
    }
}
