//! Center rotation onto an enlarged canvas.

use crate::image::{ImageView, OwnedImage};
use crate::util::math::sin_cos_deg;
use crate::warp::AffineMap;

/// Rotates a grayscale image by `phi_deg` about its center.
///
/// The output canvas is enlarged to fit the rotated content, so no source
/// pixel is clipped. Destination pixels whose pre-image falls outside the
/// source are set to `fill`. Returns the rotated image together with the
/// forward map from source coordinates to canvas coordinates.
pub fn rotate_expand_u8(src: ImageView<'_, u8>, phi_deg: f32, fill: u8) -> (OwnedImage, AffineMap) {
    let width = src.width();
    let height = src.height();
    let (sin_p, cos_p) = sin_cos_deg(phi_deg);
    let (abs_sin, abs_cos) = (sin_p.abs(), cos_p.abs());

    // The epsilon absorbs float noise at axis-aligned angles, where the exact
    // extent would otherwise ceil one pixel too far.
    let out_width =
        (((width as f32 * abs_cos + height as f32 * abs_sin) - 1e-3).ceil() as usize).max(1);
    let out_height =
        (((width as f32 * abs_sin + height as f32 * abs_cos) - 1e-3).ceil() as usize).max(1);

    let cx_src = (width as f32 - 1.0) * 0.5;
    let cy_src = (height as f32 - 1.0) * 0.5;
    let cx_dst = (out_width as f32 - 1.0) * 0.5;
    let cy_dst = (out_height as f32 - 1.0) * 0.5;

    let forward = AffineMap::rotation(phi_deg, cx_src, cy_src, cx_dst, cy_dst);
    // Exact analytic inverse; avoids a fallible 2x2 inversion for det == 1.
    let backward = AffineMap::rotation(-phi_deg, cx_dst, cy_dst, cx_src, cy_src);

    let mut out = vec![fill; out_width * out_height];
    for y in 0..out_height {
        for x in 0..out_width {
            let (sx, sy) = backward.apply(x as f32, y as f32);
            if let Some(value) = src.sample_bilinear(sx, sy) {
                out[y * out_width + x] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    let img = OwnedImage::new(out, out_width, out_height).expect("rotation output is contiguous");
    (img, forward)
}
