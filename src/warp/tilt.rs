//! Anti-alias filtering and anisotropic x-axis compression.

use crate::image::{ImageView, OwnedImage};
use crate::warp::AffineMap;

/// Gaussian sigma for the anti-alias blur applied before compressing by `tilt`.
///
/// `0.8 * sqrt(tilt^2 - 1)`; zero at `tilt == 1`, where no blur is needed.
pub fn anti_alias_sigma(tilt: f32) -> f32 {
    0.8 * (tilt * tilt - 1.0).max(0.0).sqrt()
}

/// Applies a 1-D Gaussian blur along the x axis with replicated borders.
///
/// A non-positive `sigma` returns an unblurred copy.
pub fn gaussian_blur_x_u8(src: ImageView<'_, u8>, sigma: f32) -> OwnedImage {
    let width = src.width();
    let height = src.height();

    if sigma <= 0.0 {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            data.extend_from_slice(src.row(y).expect("row in bounds"));
        }
        return OwnedImage::new(data, width, height).expect("copy is contiguous");
    }

    let radius = ((3.0 * sigma).ceil() as usize).max(1);
    let mut kernel = Vec::with_capacity(2 * radius + 1);
    let denom = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;
    for i in 0..=(2 * radius) {
        let d = i as f32 - radius as f32;
        let w = (-d * d / denom).exp();
        kernel.push(w);
        sum += w;
    }
    for w in kernel.iter_mut() {
        *w /= sum;
    }

    let mut out = vec![0u8; width * height];
    for y in 0..height {
        let row = src.row(y).expect("row in bounds");
        for x in 0..width {
            let mut acc = 0.0f32;
            for (i, w) in kernel.iter().enumerate() {
                let offset = x as isize + i as isize - radius as isize;
                let sx = offset.clamp(0, width as isize - 1) as usize;
                acc += w * row[sx] as f32;
            }
            out[y * width + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }

    OwnedImage::new(out, width, height).expect("blur output is contiguous")
}

/// Compresses the x axis by `tilt` using bilinear sampling.
///
/// At integer tilts the sample positions land on exact pixel taps. Returns the
/// compressed image together with the forward map `x' = x / tilt`.
pub fn compress_x_u8(src: ImageView<'_, u8>, tilt: f32) -> (OwnedImage, AffineMap) {
    let width = src.width();
    let height = src.height();
    let out_width = ((width as f32 / tilt).round() as usize).max(1);

    let mut out = vec![0u8; out_width * height];
    let max_x = width as f32 - 1.0;
    for y in 0..height {
        let row = src.row(y).expect("row in bounds");
        for x in 0..out_width {
            let sx = (x as f32 * tilt).min(max_x);
            let x0 = sx.floor() as usize;
            let x1 = (x0 + 1).min(width - 1);
            let fx = sx - x0 as f32;
            let value = row[x0] as f32 * (1.0 - fx) + row[x1] as f32 * fx;
            out[y * out_width + x] = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    let img = OwnedImage::new(out, out_width, height).expect("compression output is contiguous");
    (img, AffineMap::x_compression(tilt))
}
