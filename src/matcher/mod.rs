//! Per-view-pair descriptor matching with global index bookkeeping.
//!
//! `AffDescriptorMatcher` partitions two view-tagged feature sets by view id,
//! runs the underlying matcher on selected view pairs only, and merges the
//! per-pair results back into one list whose indices refer to the original
//! feature set ordering. Pairs run in ascending (query view, train view)
//! order and the underlying matcher's row order is preserved within a pair,
//! so the merged output is deterministic.

pub mod filter;

use std::collections::BTreeSet;

use crate::features::external::DescriptorMatcher;
use crate::features::{DMatch, Descriptors, FeatureSet};
use crate::trace::diag;
use crate::util::{AffMatchError, AffMatchResult};
use crate::views::MAX_VIEWS;

/// Ordered (query view id, train view id) pair.
pub type ViewPair = (u32, u32);

/// Set of admissible view pairs; an empty set means "all pairs".
pub type ViewPairSet = BTreeSet<ViewPair>;

/// One partition of a feature set: descriptor rows of a single view together
/// with each row's index in the original set.
struct ViewBucket {
    bookkeeping: Vec<usize>,
    descriptors: Descriptors,
}

impl ViewBucket {
    fn new(cols: usize) -> Self {
        Self {
            bookkeeping: Vec::new(),
            descriptors: Descriptors::empty(cols),
        }
    }

    fn reserve(&mut self, n: usize) {
        self.bookkeeping.reserve(n);
        self.descriptors.reserve_rows(n);
    }

    fn add(&mut self, global_idx: usize, row: &[f32]) -> AffMatchResult<()> {
        self.bookkeeping.push(global_idx);
        self.descriptors.push_row(row)
    }

    fn global_idx(&self, local_idx: usize) -> AffMatchResult<usize> {
        self.bookkeeping
            .get(local_idx)
            .copied()
            .ok_or(AffMatchError::IndexOutOfBounds {
                index: local_idx,
                len: self.bookkeeping.len(),
                context: "bookkeeping",
            })
    }

    fn is_empty(&self) -> bool {
        self.bookkeeping.is_empty()
    }
}

/// Matcher that partitions by simulated view and delegates per pair.
pub struct AffDescriptorMatcher {
    inner: Box<dyn DescriptorMatcher>,
}

impl AffDescriptorMatcher {
    /// Wraps an underlying descriptor matcher.
    pub fn new(inner: Box<dyn DescriptorMatcher>) -> Self {
        Self { inner }
    }

    /// Returns the single best train match per query keypoint.
    ///
    /// Equivalent to the first-neighbor projection of
    /// [`AffDescriptorMatcher::knn_match_sets`] with `k == 1`.
    pub fn match_sets(
        &self,
        query: &FeatureSet,
        train: &FeatureSet,
        pairs: &ViewPairSet,
    ) -> AffMatchResult<Vec<DMatch>> {
        let rows = self.knn_match_sets(query, train, pairs, 1)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }

    /// Returns up to `k` nearest train matches per query keypoint.
    ///
    /// Rows are emitted per view pair in ascending (query view, train view)
    /// order, preserving the underlying matcher's order within a pair.
    pub fn knn_match_sets(
        &self,
        query: &FeatureSet,
        train: &FeatureSet,
        pairs: &ViewPairSet,
        k: usize,
    ) -> AffMatchResult<Vec<Vec<DMatch>>> {
        self.match_partitioned(query, train, pairs, |matcher, q, t| {
            matcher.knn_match(q, t, k)
        })
    }

    /// Returns all train matches within `max_distance` per query keypoint.
    pub fn radius_match_sets(
        &self,
        query: &FeatureSet,
        train: &FeatureSet,
        pairs: &ViewPairSet,
        max_distance: f32,
    ) -> AffMatchResult<Vec<Vec<DMatch>>> {
        self.match_partitioned(query, train, pairs, |matcher, q, t| {
            matcher.radius_match(q, t, max_distance)
        })
    }

    fn match_partitioned<F>(
        &self,
        query: &FeatureSet,
        train: &FeatureSet,
        pairs: &ViewPairSet,
        run: F,
    ) -> AffMatchResult<Vec<Vec<DMatch>>>
    where
        F: Fn(&dyn DescriptorMatcher, &Descriptors, &Descriptors) -> AffMatchResult<Vec<Vec<DMatch>>>,
    {
        if !query.is_empty()
            && !train.is_empty()
            && query.descriptors().cols() != train.descriptors().cols()
        {
            return Err(AffMatchError::DescriptorShapeMismatch {
                query_cols: query.descriptors().cols(),
                train_cols: train.descriptors().cols(),
            });
        }

        let query_buckets = split_by_views(query)?;
        let train_buckets = split_by_views(train)?;
        diag!(
            "partitioned_match",
            query_views = query_buckets.len(),
            train_views = train_buckets.len(),
            restricted = !pairs.is_empty()
        );

        let mut out = Vec::new();
        for (u, query_bucket) in query_buckets.iter().enumerate() {
            for (v, train_bucket) in train_buckets.iter().enumerate() {
                if !pairs.is_empty() && !pairs.contains(&(u as u32, v as u32)) {
                    continue;
                }
                if query_bucket.is_empty() || train_bucket.is_empty() {
                    continue;
                }
                let rows = run(
                    self.inner.as_ref(),
                    &query_bucket.descriptors,
                    &train_bucket.descriptors,
                )?;
                for row in rows {
                    let mut mapped = Vec::with_capacity(row.len());
                    for m in row {
                        mapped.push(DMatch::new(
                            query_bucket.global_idx(m.query_idx)?,
                            train_bucket.global_idx(m.train_idx)?,
                            m.distance,
                        ));
                    }
                    out.push(mapped);
                }
            }
        }

        diag!("partitioned_rows", rows = out.len());
        Ok(out)
    }
}

/// Splits a feature set into per-view buckets with local-to-global indices.
fn split_by_views(set: &FeatureSet) -> AffMatchResult<Vec<ViewBucket>> {
    let keypoints = set.keypoints();
    let mut num_views = 0usize;
    for kp in keypoints {
        if (kp.view_id as usize) >= MAX_VIEWS {
            return Err(AffMatchError::InvalidViewTag {
                view_id: kp.view_id,
                max: MAX_VIEWS as u32,
            });
        }
        num_views = num_views.max(kp.view_id as usize + 1);
    }

    let cols = set.descriptors().cols();
    let mut buckets: Vec<ViewBucket> = (0..num_views).map(|_| ViewBucket::new(cols)).collect();
    if num_views > 0 {
        // Splits are rarely balanced; reserve 1.5x the even share per view.
        let per_view = keypoints.len() / num_views * 3 / 2 + 1;
        for bucket in buckets.iter_mut() {
            bucket.reserve(per_view);
        }
    }

    for (idx, kp) in keypoints.iter().enumerate() {
        let row = set
            .descriptors()
            .row(idx)
            .ok_or(AffMatchError::IndexOutOfBounds {
                index: idx,
                len: set.descriptors().rows(),
                context: "descriptor row",
            })?;
        buckets[kp.view_id as usize].add(idx, row)?;
    }
    Ok(buckets)
}
