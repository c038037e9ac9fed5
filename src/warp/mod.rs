//! Affine maps and the warping primitives used for view simulation.
//!
//! A simulated view is the composition of a center rotation onto an enlarged
//! canvas and an anisotropic compression along the x axis. `AffineMap` is the
//! 2x3 forward transform from original-image coordinates to warped-image
//! coordinates; feature locations travel back through its inverse.

mod rotate;
mod tilt;

pub use rotate::rotate_expand_u8;
pub use tilt::{anti_alias_sigma, compress_x_u8, gaussian_blur_x_u8};

use crate::util::math::sin_cos_deg;
use crate::util::{AffMatchError, AffMatchResult};

/// 2x3 affine transform `(x, y) -> (a*x + b*y + c, d*x + e*y + f)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineMap {
    m: [f32; 6],
}

impl AffineMap {
    /// Returns the identity transform.
    pub fn identity() -> Self {
        Self {
            m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        }
    }

    /// Creates a transform from row-major coefficients `[a, b, c, d, e, f]`.
    pub fn from_coefficients(m: [f32; 6]) -> Self {
        Self { m }
    }

    /// Returns the row-major coefficients `[a, b, c, d, e, f]`.
    pub fn coefficients(&self) -> [f32; 6] {
        self.m
    }

    /// Rotation by `phi_deg` taking `(cx_src, cy_src)` onto `(cx_dst, cy_dst)`.
    ///
    /// The forward map rotates content by `+phi_deg`: a source point at angle
    /// theta from the source center lands at angle `theta + phi_deg` from the
    /// destination center.
    pub fn rotation(phi_deg: f32, cx_src: f32, cy_src: f32, cx_dst: f32, cy_dst: f32) -> Self {
        let (sin_p, cos_p) = sin_cos_deg(phi_deg);
        Self {
            m: [
                cos_p,
                -sin_p,
                cx_dst - cos_p * cx_src + sin_p * cy_src,
                sin_p,
                cos_p,
                cy_dst - sin_p * cx_src - cos_p * cy_src,
            ],
        }
    }

    /// Anisotropic compression of the x axis by `tilt` (`x' = x / tilt`).
    pub fn x_compression(tilt: f32) -> Self {
        Self {
            m: [1.0 / tilt, 0.0, 0.0, 0.0, 1.0, 0.0],
        }
    }

    /// Returns `self` applied after `inner` (`self . inner`).
    pub fn compose(&self, inner: &AffineMap) -> Self {
        let [a1, b1, c1, d1, e1, f1] = inner.m;
        let [a2, b2, c2, d2, e2, f2] = self.m;
        Self {
            m: [
                a2 * a1 + b2 * d1,
                a2 * b1 + b2 * e1,
                a2 * c1 + b2 * f1 + c2,
                d2 * a1 + e2 * d1,
                d2 * b1 + e2 * e1,
                d2 * c1 + e2 * f1 + f2,
            ],
        }
    }

    /// Applies the transform to a point.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.m;
        (a * x + b * y + c, d * x + e * y + f)
    }

    /// Returns the inverse transform.
    pub fn invert(&self) -> AffMatchResult<Self> {
        let [a, b, c, d, e, f] = self.m;
        let det = a * e - b * d;
        if !det.is_finite() || det.abs() < 1e-12 {
            return Err(AffMatchError::DegenerateAffineMap);
        }
        let inv_det = 1.0 / det;
        let ia = e * inv_det;
        let ib = -b * inv_det;
        let id = -d * inv_det;
        let ie = a * inv_det;
        Ok(Self {
            m: [ia, ib, -(ia * c + ib * f), id, ie, -(id * c + ie * f)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::AffineMap;

    #[test]
    fn rotation_composed_with_inverse_is_identity() {
        let fwd = AffineMap::rotation(37.0, 10.0, 20.0, 30.0, 15.0);
        let inv = fwd.invert().unwrap();
        let (x, y) = inv.apply(fwd.apply(3.0, 7.0).0, fwd.apply(3.0, 7.0).1);
        assert!((x - 3.0).abs() < 1e-4);
        assert!((y - 7.0).abs() < 1e-4);
    }

    #[test]
    fn compression_scales_x_only() {
        let map = AffineMap::x_compression(2.0);
        let (x, y) = map.apply(8.0, 5.0);
        assert!((x - 4.0).abs() < 1e-6);
        assert!((y - 5.0).abs() < 1e-6);
    }

    #[test]
    fn singular_map_fails_to_invert() {
        let map = AffineMap::from_coefficients([1.0, 2.0, 0.0, 2.0, 4.0, 0.0]);
        assert!(map.invert().is_err());
    }
}
