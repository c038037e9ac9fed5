//! Keypoints, descriptors, matches, and the view-tagged feature set.
//!
//! A `FeatureSet` pairs an ordered keypoint sequence with a dense descriptor
//! matrix of equal cardinality; insertion order is stable and is the identity
//! used by match indices. Every keypoint carries the id of the simulated view
//! it originated from, which is the sole coupling between the view simulator
//! and the partitioned matcher.

pub mod external;

use crate::util::{AffMatchError, AffMatchResult};

/// A detected salient image location in original-image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyPoint {
    /// X coordinate (column) in pixels.
    pub x: f32,
    /// Y coordinate (row) in pixels.
    pub y: f32,
    /// Diameter of the meaningful neighborhood.
    pub size: f32,
    /// Orientation in degrees, in [0, 360).
    pub angle_deg: f32,
    /// Detector response strength.
    pub response: f32,
    /// Id of the simulated view this keypoint was detected in.
    ///
    /// Detectors need not set this; the simulator overwrites it on every
    /// keypoint it emits.
    pub view_id: u32,
}

impl KeyPoint {
    /// Creates a keypoint with zero orientation, response, and view tag.
    pub fn new(x: f32, y: f32, size: f32) -> Self {
        Self {
            x,
            y,
            size,
            angle_deg: 0.0,
            response: 0.0,
            view_id: 0,
        }
    }
}

/// Descriptor match between a query and a train keypoint.
///
/// Indices refer to the original (pre-partition) feature set ordering, and
/// distance is non-negative with smaller meaning a better match.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DMatch {
    /// Index into the query feature set.
    pub query_idx: usize,
    /// Index into the train feature set.
    pub train_idx: usize,
    /// Descriptor distance reported by the underlying matcher.
    pub distance: f32,
}

impl DMatch {
    /// Creates a match record.
    pub fn new(query_idx: usize, train_idx: usize, distance: f32) -> Self {
        Self {
            query_idx,
            train_idx,
            distance,
        }
    }
}

/// Dense row-major `f32` descriptor matrix.
#[derive(Clone, Debug)]
pub struct Descriptors {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
}

impl Descriptors {
    /// Creates a matrix from a contiguous row-major buffer.
    pub fn new(data: Vec<f32>, rows: usize, cols: usize) -> AffMatchResult<Self> {
        let needed = rows
            .checked_mul(cols)
            .ok_or(AffMatchError::InvalidDimensions {
                width: cols,
                height: rows,
            })?;
        if data.len() != needed {
            return Err(AffMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// Creates an empty matrix with the given column count.
    pub fn empty(cols: usize) -> Self {
        Self {
            data: Vec::new(),
            rows: 0,
            cols,
        }
    }

    /// Returns the number of descriptor rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the descriptor width in elements.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns true when the matrix holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Reserves capacity for `additional` more rows.
    pub fn reserve_rows(&mut self, additional: usize) {
        self.data.reserve(additional.saturating_mul(self.cols));
    }

    /// Returns descriptor row `i`.
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        if i >= self.rows {
            return None;
        }
        let start = i * self.cols;
        self.data.get(start..start + self.cols)
    }

    /// Appends one descriptor row, enforcing a consistent width.
    pub fn push_row(&mut self, row: &[f32]) -> AffMatchResult<()> {
        if row.len() != self.cols {
            return Err(AffMatchError::DescriptorShapeMismatch {
                query_cols: self.cols,
                train_cols: row.len(),
            });
        }
        self.data.extend_from_slice(row);
        self.rows += 1;
        Ok(())
    }

    /// Appends all rows of `other`, enforcing a consistent width.
    pub fn extend(&mut self, mut other: Descriptors) -> AffMatchResult<()> {
        if other.rows == 0 {
            return Ok(());
        }
        if self.rows == 0 {
            *self = other;
            return Ok(());
        }
        if self.cols != other.cols {
            return Err(AffMatchError::DescriptorShapeMismatch {
                query_cols: self.cols,
                train_cols: other.cols,
            });
        }
        self.data.append(&mut other.data);
        self.rows += other.rows;
        Ok(())
    }
}

/// Keypoints and their descriptors, tagged with originating view ids.
#[derive(Clone, Debug)]
pub struct FeatureSet {
    keypoints: Vec<KeyPoint>,
    descriptors: Descriptors,
}

impl FeatureSet {
    /// Creates a feature set, enforcing equal keypoint and row counts.
    pub fn new(keypoints: Vec<KeyPoint>, descriptors: Descriptors) -> AffMatchResult<Self> {
        if keypoints.len() != descriptors.rows() {
            return Err(AffMatchError::FeatureSetSizeMismatch {
                keypoints: keypoints.len(),
                rows: descriptors.rows(),
            });
        }
        Ok(Self {
            keypoints,
            descriptors,
        })
    }

    /// Creates an empty feature set.
    pub fn empty() -> Self {
        Self {
            keypoints: Vec::new(),
            descriptors: Descriptors::empty(0),
        }
    }

    /// Returns the number of features.
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    /// Returns true when the set holds no features.
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Returns the keypoints in insertion order.
    pub fn keypoints(&self) -> &[KeyPoint] {
        &self.keypoints
    }

    /// Returns the descriptor matrix; row `i` describes keypoint `i`.
    pub fn descriptors(&self) -> &Descriptors {
        &self.descriptors
    }

    /// Appends another feature set, preserving both insertion orders.
    pub fn append(&mut self, other: FeatureSet) -> AffMatchResult<()> {
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            *self = other;
            return Ok(());
        }
        let FeatureSet {
            mut keypoints,
            descriptors,
        } = other;
        self.descriptors.extend(descriptors)?;
        self.keypoints.append(&mut keypoints);
        Ok(())
    }

    /// Consumes the set, returning keypoints and descriptors.
    pub fn into_parts(self) -> (Vec<KeyPoint>, Descriptors) {
        (self.keypoints, self.descriptors)
    }
}
