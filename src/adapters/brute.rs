//! Brute-force L2 descriptor matcher.

use crate::features::external::DescriptorMatcher;
use crate::features::{DMatch, Descriptors};
use crate::util::{AffMatchError, AffMatchResult};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Exhaustive nearest-neighbor matcher over L2 descriptor distance.
///
/// Distances within a row are sorted ascending with the train index as a
/// deterministic tie-break. With the `rayon` feature and `parallel` set,
/// query rows are matched in parallel; row order in the output is unchanged,
/// so parallel results are identical to sequential ones. Without the feature
/// the flag is ignored.
#[derive(Clone, Debug, Default)]
pub struct BruteForceMatcher {
    /// Match query rows on a worker pool when the `rayon` feature is enabled.
    pub parallel: bool,
}

impl BruteForceMatcher {
    /// Creates a sequential brute-force matcher.
    pub fn new() -> Self {
        Self::default()
    }

    fn use_parallel(&self) -> bool {
        self.parallel && cfg!(feature = "rayon")
    }

    fn check_shapes(query: &Descriptors, train: &Descriptors) -> AffMatchResult<()> {
        if !query.is_empty() && !train.is_empty() && query.cols() != train.cols() {
            return Err(AffMatchError::DescriptorShapeMismatch {
                query_cols: query.cols(),
                train_cols: train.cols(),
            });
        }
        Ok(())
    }

    fn row_distances(query: &Descriptors, train: &Descriptors, i: usize) -> Vec<(usize, f32)> {
        let q = query.row(i).expect("query row in bounds");
        let mut distances: Vec<(usize, f32)> = (0..train.rows())
            .map(|j| {
                let t = train.row(j).expect("train row in bounds");
                (j, l2_distance(q, t))
            })
            .collect();
        distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        distances
    }

    fn match_rows<F>(&self, query: &Descriptors, select: F) -> Vec<Vec<DMatch>>
    where
        F: Fn(usize) -> Vec<DMatch> + Sync + Send,
    {
        if self.use_parallel() {
            #[cfg(feature = "rayon")]
            {
                return (0..query.rows()).into_par_iter().map(|i| select(i)).collect();
            }
        }
        (0..query.rows()).map(|i| select(i)).collect()
    }
}

impl DescriptorMatcher for BruteForceMatcher {
    fn knn_match(
        &self,
        query: &Descriptors,
        train: &Descriptors,
        k: usize,
    ) -> AffMatchResult<Vec<Vec<DMatch>>> {
        Self::check_shapes(query, train)?;
        if train.is_empty() || k == 0 {
            return Ok(vec![Vec::new(); query.rows()]);
        }
        Ok(self.match_rows(query, |i| {
            Self::row_distances(query, train, i)
                .into_iter()
                .take(k)
                .map(|(j, distance)| DMatch::new(i, j, distance))
                .collect()
        }))
    }

    fn radius_match(
        &self,
        query: &Descriptors,
        train: &Descriptors,
        max_distance: f32,
    ) -> AffMatchResult<Vec<Vec<DMatch>>> {
        Self::check_shapes(query, train)?;
        if train.is_empty() {
            return Ok(vec![Vec::new(); query.rows()]);
        }
        Ok(self.match_rows(query, |i| {
            Self::row_distances(query, train, i)
                .into_iter()
                .take_while(|&(_, distance)| distance <= max_distance)
                .map(|(j, distance)| DMatch::new(i, j, distance))
                .collect()
        }))
    }
}

#[cfg(not(feature = "simd"))]
fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let d = x - y;
        sum += d * d;
    }
    sum.sqrt()
}

#[cfg(feature = "simd")]
fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    use wide::f32x8;

    const LANES: usize = 8;

    #[inline]
    fn load_f32x8(slice: &[f32]) -> f32x8 {
        f32x8::from([
            slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
        ])
    }

    let len = a.len().min(b.len());
    let simd_end = len / LANES * LANES;
    let mut acc = f32x8::ZERO;
    let mut i = 0;
    while i < simd_end {
        let diff = load_f32x8(&a[i..]) - load_f32x8(&b[i..]);
        acc += diff * diff;
        i += LANES;
    }
    let arr = acc.to_array();
    let mut sum = arr.iter().sum::<f32>();
    while i < len {
        let d = a[i] - b[i];
        sum += d * d;
        i += 1;
    }
    sum.sqrt()
}

#[cfg(test)]
mod tests {
    use super::BruteForceMatcher;
    use crate::features::external::DescriptorMatcher;
    use crate::features::Descriptors;

    fn descriptors(rows: &[&[f32]]) -> Descriptors {
        let cols = rows.first().map_or(0, |row| row.len());
        let data: Vec<f32> = rows.iter().flat_map(|row| row.iter().copied()).collect();
        Descriptors::new(data, rows.len(), cols).unwrap()
    }

    #[test]
    fn knn_returns_sorted_neighbors() {
        let query = descriptors(&[&[0.0, 0.0]]);
        let train = descriptors(&[&[3.0, 4.0], &[0.0, 1.0], &[6.0, 8.0]]);
        let rows = BruteForceMatcher::new().knn_match(&query, &train, 2).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0][0].train_idx, 1);
        assert!((rows[0][0].distance - 1.0).abs() < 1e-6);
        assert_eq!(rows[0][1].train_idx, 0);
        assert!((rows[0][1].distance - 5.0).abs() < 1e-6);
    }

    #[test]
    fn ties_break_by_train_index() {
        let query = descriptors(&[&[0.0]]);
        let train = descriptors(&[&[2.0], &[2.0], &[-2.0]]);
        let rows = BruteForceMatcher::new().knn_match(&query, &train, 3).unwrap();
        let order: Vec<usize> = rows[0].iter().map(|m| m.train_idx).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn radius_match_honors_the_cutoff() {
        let query = descriptors(&[&[0.0, 0.0]]);
        let train = descriptors(&[&[3.0, 4.0], &[0.0, 1.0], &[6.0, 8.0]]);
        let rows = BruteForceMatcher::new()
            .radius_match(&query, &train, 5.0)
            .unwrap();
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0][0].train_idx, 1);
        assert_eq!(rows[0][1].train_idx, 0);
    }

    #[test]
    fn mismatched_widths_are_rejected() {
        let query = descriptors(&[&[0.0, 0.0]]);
        let train = descriptors(&[&[0.0, 0.0, 0.0]]);
        assert!(BruteForceMatcher::new().knn_match(&query, &train, 1).is_err());
    }
}
