//! Ratio filtering and duplicate suppression over unified match lists.

use crate::features::{DMatch, KeyPoint};

/// Applies Lowe's distance-ratio test to knn match rows.
///
/// The first neighbor of a row is kept when its distance is below `ratio`
/// times the second neighbor's distance. Rows with fewer than two neighbors
/// are accepted unconditionally; empty rows contribute nothing. Distances are
/// assumed to minimize.
pub fn ratio_filter(rows: &[Vec<DMatch>], ratio: f32) -> Vec<DMatch> {
    let mut kept = Vec::new();
    for row in rows {
        match row.as_slice() {
            [] => {}
            [best] => kept.push(*best),
            [best, second, ..] => {
                if best.distance < ratio * second.distance {
                    kept.push(*best);
                }
            }
        }
    }
    kept
}

/// Drops matches whose endpoints nearly coincide with a better match.
///
/// Two matches are duplicates when both their query and their train keypoints
/// lie within `radius_px` (Chebyshev distance) of each other, measured in
/// original-image coordinates. The match with the larger distance loses; ties
/// are broken in favor of the lower (query, train) index pair. Output keeps
/// the input order. A non-positive radius disables suppression.
///
/// Match indices must be in bounds of the given keypoint slices.
pub fn suppress_duplicates(
    matches: &[DMatch],
    query_keypoints: &[KeyPoint],
    train_keypoints: &[KeyPoint],
    radius_px: f32,
) -> Vec<DMatch> {
    if radius_px <= 0.0 || matches.len() < 2 {
        return matches.to_vec();
    }

    let mut order: Vec<usize> = (0..matches.len()).collect();
    order.sort_by(|&a, &b| {
        matches[a]
            .distance
            .total_cmp(&matches[b].distance)
            .then_with(|| {
                (matches[a].query_idx, matches[a].train_idx)
                    .cmp(&(matches[b].query_idx, matches[b].train_idx))
            })
    });

    let mut keep = vec![false; matches.len()];
    let mut kept: Vec<usize> = Vec::new();
    'outer: for &idx in &order {
        let m = &matches[idx];
        for &winner in &kept {
            let w = &matches[winner];
            if within(query_keypoints, m.query_idx, w.query_idx, radius_px)
                && within(train_keypoints, m.train_idx, w.train_idx, radius_px)
            {
                continue 'outer;
            }
        }
        keep[idx] = true;
        kept.push(idx);
    }

    matches
        .iter()
        .enumerate()
        .filter_map(|(idx, m)| keep[idx].then_some(*m))
        .collect()
}

fn within(keypoints: &[KeyPoint], a: usize, b: usize, radius_px: f32) -> bool {
    let (ka, kb) = (&keypoints[a], &keypoints[b]);
    (ka.x - kb.x).abs().max((ka.y - kb.y).abs()) <= radius_px
}
