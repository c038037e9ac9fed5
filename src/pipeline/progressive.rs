//! The incremental-tilt controller.
//!
//! Runs the progressive loop as an explicit state machine so cancellation is
//! a single check per level transition. Each level simulates only the views
//! the catalog introduces at that level and matches only view pairs that
//! involve a new view; match rows from earlier levels are retained, so no
//! view pair is ever matched twice.

use super::{AffMatcherHelper, MatchReport, RATIO_TEST_K};
use crate::features::{DMatch, FeatureSet};
use crate::image::ImageView;
use crate::matcher::ViewPairSet;
use crate::simulate::simulate_entries;
use crate::trace::diag;
use crate::util::{AffMatchError, AffMatchResult};
use crate::views::ViewCatalog;

enum Phase {
    LevelStart,
    Simulate,
    Match,
    Filter,
    Evaluate,
    Done { reached_ceiling: bool },
}

pub(super) fn run(
    helper: &AffMatcherHelper,
    image_a: ImageView<'_, u8>,
    image_b: ImageView<'_, u8>,
    ratio: f32,
) -> AffMatchResult<MatchReport> {
    helper.cfg.validate()?;
    super::validate_ratio(ratio)?;
    diag!("match_increasing_tilt", max_level = helper.cfg.max_level);

    let catalog = ViewCatalog::for_level(helper.cfg.max_level)?;
    let mut features_a = FeatureSet::empty();
    let mut features_b = FeatureSet::empty();
    let mut raw_rows: Vec<Vec<DMatch>> = Vec::new();
    let mut filtered: Vec<DMatch> = Vec::new();
    let mut level = 0usize;
    let reached_ceiling;

    let mut phase = Phase::LevelStart;
    loop {
        phase = match phase {
            Phase::LevelStart => {
                if helper.is_cancelled() {
                    return Err(AffMatchError::Cancelled);
                }
                diag!("level_start", level = level);
                Phase::Simulate
            }
            Phase::Simulate => {
                let entries = catalog.level_entries(level);
                let fragment_a = simulate_level(helper, image_a, entries, &features_a, level)?;
                features_a.append(fragment_a)?;
                let fragment_b = simulate_level(helper, image_b, entries, &features_b, level)?;
                features_b.append(fragment_b)?;
                Phase::Match
            }
            Phase::Match => {
                if !features_a.is_empty() && !features_b.is_empty() {
                    let pairs = pairs_for_level(&catalog, level);
                    let rows = helper.matcher.knn_match_sets(
                        &features_a,
                        &features_b,
                        &pairs,
                        RATIO_TEST_K,
                    )?;
                    diag!("level_matched", level = level, rows = rows.len());
                    raw_rows.extend(rows);
                }
                Phase::Filter
            }
            Phase::Filter => {
                filtered = helper.filtered_matches(
                    &raw_rows,
                    ratio,
                    features_a.keypoints(),
                    features_b.keypoints(),
                );
                Phase::Evaluate
            }
            Phase::Evaluate => {
                diag!("level_filtered", level = level, matches = filtered.len());
                if filtered.len() >= helper.cfg.target_matches {
                    Phase::Done {
                        reached_ceiling: false,
                    }
                } else if level >= catalog.max_level() {
                    Phase::Done {
                        reached_ceiling: true,
                    }
                } else {
                    level += 1;
                    Phase::LevelStart
                }
            }
            Phase::Done {
                reached_ceiling: ceiling,
            } => {
                reached_ceiling = ceiling;
                break;
            }
        };
    }

    if features_a.is_empty() && features_b.is_empty() {
        return Err(AffMatchError::EmptyFeatureSets);
    }
    let (keypoints_a, _) = features_a.into_parts();
    let (keypoints_b, _) = features_b.into_parts();
    Ok(MatchReport {
        keypoints_a,
        keypoints_b,
        matches: filtered,
        level_reached: level,
        reached_ceiling,
    })
}

/// Simulates one level's entries, tolerating a failed level once earlier
/// levels already produced features.
fn simulate_level(
    helper: &AffMatcherHelper,
    image: ImageView<'_, u8>,
    entries: &[crate::views::ViewParams],
    accumulated: &FeatureSet,
    level: usize,
) -> AffMatchResult<FeatureSet> {
    match simulate_entries(
        image,
        entries,
        helper.detector.as_ref(),
        helper.extractor.as_ref(),
        helper.cfg.parallel,
    ) {
        Ok(fragment) => Ok(fragment),
        Err(AffMatchError::ViewSimulationFailed { reason }) if !accumulated.is_empty() => {
            diag!(
                "level_simulation_failed",
                level = level,
                reason = reason.as_str()
            );
            Ok(FeatureSet::empty())
        }
        Err(err) => Err(err),
    }
}

/// All view pairs where at least one side was introduced at `level`.
///
/// Ids below the level span were matched at earlier levels; the rectangle
/// they cover is excluded so their rows are never recomputed.
fn pairs_for_level(catalog: &ViewCatalog, level: usize) -> ViewPairSet {
    let (start, end) = catalog.level_span(level);
    let mut pairs = ViewPairSet::new();
    for u in 0..end {
        for v in 0..end {
            if u >= start || v >= start {
                pairs.insert((u as u32, v as u32));
            }
        }
    }
    pairs
}
