//! Error types for affmatch.

use thiserror::Error;

/// Result alias for affmatch operations.
pub type AffMatchResult<T> = std::result::Result<T, AffMatchError>;

/// Errors that can occur when running affmatch operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AffMatchError {
    /// The provided dimensions are invalid (must be non-zero).
    #[error("invalid dimensions: width={width} height={height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The backing buffer is too small for the requested view.
    #[error("buffer too small: needed={needed} got={got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A configuration parameter is invalid.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// The requested index is out of bounds for a collection.
    #[error("index out of bounds: {context} index={index} len={len}")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
    /// The affine map is singular and cannot be inverted.
    #[error("degenerate affine map")]
    DegenerateAffineMap,
    /// The view catalog would exceed the supported view count.
    #[error("view catalog too large: requested={requested} max={max}")]
    TooManyViews { requested: usize, max: usize },
    /// A keypoint carries a view tag outside the supported range.
    #[error("invalid view tag: view_id={view_id} max={max}")]
    InvalidViewTag { view_id: u32, max: u32 },
    /// Query and train descriptors differ in column count.
    #[error("descriptor shape mismatch: query_cols={query_cols} train_cols={train_cols}")]
    DescriptorShapeMismatch {
        query_cols: usize,
        train_cols: usize,
    },
    /// The keypoint count does not match the descriptor row count.
    #[error("feature set size mismatch: keypoints={keypoints} rows={rows}")]
    FeatureSetSizeMismatch { keypoints: usize, rows: usize },
    /// Neither image produced any features.
    #[error("both feature sets are empty")]
    EmptyFeatureSets,
    /// Every simulated view failed to produce features.
    #[error("view simulation failed: {reason}")]
    ViewSimulationFailed { reason: String },
    /// An external detector, extractor, or matcher reported a failure.
    #[error("external stage failed: {reason}")]
    External { reason: String },
    /// Cooperative cancellation was observed at a level boundary.
    #[error("cancelled at level boundary")]
    Cancelled,
    /// Parallel execution was requested without the `rayon` feature.
    #[error("parallel execution requires the `rayon` feature")]
    ParallelUnavailable,
    /// Loading or decoding an image failed.
    #[error("image i/o failed: {reason}")]
    ImageIo { reason: String },
}
