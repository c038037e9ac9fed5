//! Decoding image files into the pipeline's grayscale buffers.
//!
//! Available when the `image-io` feature is enabled. The matching core only
//! consumes single-channel data, so color inputs are collapsed to luma before
//! they enter the pipeline.

use crate::image::OwnedImage;
use crate::util::{AffMatchError, AffMatchResult};
use std::path::Path;

impl OwnedImage {
    /// Decodes an image file into a grayscale buffer.
    ///
    /// The failed path is carried in the error so callers matching several
    /// files can tell which one was rejected.
    pub fn load_gray<P: AsRef<Path>>(path: P) -> AffMatchResult<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|err| AffMatchError::ImageIo {
            reason: format!("{}: {err}", path.display()),
        })?;
        Self::from_luma(decoded.to_luma8())
    }

    /// Wraps a decoded grayscale buffer, taking ownership of its pixels.
    pub fn from_luma(img: image::GrayImage) -> AffMatchResult<Self> {
        let width = img.width() as usize;
        let height = img.height() as usize;
        OwnedImage::new(img.into_raw(), width, height)
    }
}
