//! Low-level building blocks for custom simulation pipelines.
//!
//! These expose the warping primitives behind the view simulator for
//! advanced use cases beyond the high-level `AffMatcherHelper` API.

pub use crate::simulate::warp_view;
pub use crate::warp::{anti_alias_sigma, compress_x_u8, gaussian_blur_x_u8, rotate_expand_u8};
