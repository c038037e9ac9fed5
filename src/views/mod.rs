//! Enumeration of the simulated (tilt, rotation) view parameters.
//!
//! Tilt levels follow the geometric series `t = 2^(n/2)`; each tilt samples
//! in-plane rotations at a step of `72 / t` degrees over [0, 180). Finer
//! rotation steps at larger tilts preserve angular coverage of the viewing
//! hemisphere. View ids are assigned in production order and are stable under
//! catalog growth, so a catalog built for level `n` is a prefix of one built
//! for level `n + 1`.

use crate::trace::diag;
use crate::util::{AffMatchError, AffMatchResult};

/// Upper bound on the number of simulated views a catalog may hold.
///
/// Generous for any practical tilt ceiling; exceeding it is a configuration
/// error, not a runtime condition.
pub const MAX_VIEWS: usize = 1024;

/// Half-turn of in-plane rotations; the other half is covered by symmetry.
const ROTATION_SPAN_DEG: f32 = 180.0;

/// Rotation step at unit tilt, shrinking as `72 / t` for larger tilts.
const BASE_ROTATION_STEP_DEG: f32 = 72.0;

/// Parameters of one simulated view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewParams {
    /// Anisotropic scaling factor along the compressed axis, `>= 1`.
    pub tilt: f32,
    /// In-plane rotation in degrees, in [0, 180).
    pub phi_deg: f32,
    /// Stable id of this view within its catalog.
    pub view_id: u32,
}

impl ViewParams {
    /// Returns true for the untransformed view (t = 1, phi = 0).
    pub fn is_identity(&self) -> bool {
        self.view_id == 0
    }
}

/// Tilt value for a level in the `2^(n/2)` series.
pub fn tilt_for_level(level: usize) -> f32 {
    2f32.powf(level as f32 / 2.0)
}

/// Largest level whose tilt does not exceed `max_tilt`.
pub fn level_for_max_tilt(max_tilt: f32) -> usize {
    let bound = max_tilt * (1.0 + 1e-4);
    let mut level = 0;
    while tilt_for_level(level + 1) <= bound {
        level += 1;
    }
    level
}

/// Deterministic catalog of view parameters up to a tilt level.
#[derive(Clone, Debug)]
pub struct ViewCatalog {
    entries: Vec<ViewParams>,
    level_starts: Vec<usize>,
}

impl ViewCatalog {
    /// Builds the catalog for all levels through `max_level`.
    pub fn for_level(max_level: usize) -> AffMatchResult<Self> {
        let mut entries = Vec::new();
        let mut level_starts = Vec::with_capacity(max_level + 2);

        for level in 0..=max_level {
            level_starts.push(entries.len());
            if level == 0 {
                entries.push(ViewParams {
                    tilt: 1.0,
                    phi_deg: 0.0,
                    view_id: 0,
                });
                continue;
            }
            let tilt = tilt_for_level(level);
            let step = BASE_ROTATION_STEP_DEG / tilt;
            let mut idx = 0usize;
            while (idx as f32) * step < ROTATION_SPAN_DEG - 1e-3 {
                if entries.len() >= MAX_VIEWS {
                    return Err(AffMatchError::TooManyViews {
                        requested: entries.len() + 1,
                        max: MAX_VIEWS,
                    });
                }
                entries.push(ViewParams {
                    tilt,
                    phi_deg: (idx as f32) * step,
                    view_id: entries.len() as u32,
                });
                idx += 1;
            }
        }
        level_starts.push(entries.len());

        diag!("view_catalog", max_level = max_level, views = entries.len());
        Ok(Self {
            entries,
            level_starts,
        })
    }

    /// Builds the catalog for all tilts up to `max_tilt`.
    pub fn for_max_tilt(max_tilt: f32) -> AffMatchResult<Self> {
        if !max_tilt.is_finite() || max_tilt < 1.0 {
            return Err(AffMatchError::InvalidConfig {
                reason: "max_tilt must be finite and at least 1",
            });
        }
        Self::for_level(level_for_max_tilt(max_tilt))
    }

    /// Returns all entries in id order.
    pub fn entries(&self) -> &[ViewParams] {
        &self.entries
    }

    /// Returns the number of views in the catalog.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the catalog holds no views.
    ///
    /// Never true for a built catalog; the identity view is always present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the highest tilt level the catalog covers.
    pub fn max_level(&self) -> usize {
        self.level_starts.len().saturating_sub(2)
    }

    /// Returns the id range `[start, end)` of the entries introduced by `level`.
    pub fn level_span(&self, level: usize) -> (usize, usize) {
        let start = self
            .level_starts
            .get(level)
            .copied()
            .unwrap_or(self.entries.len());
        let end = self
            .level_starts
            .get(level + 1)
            .copied()
            .unwrap_or(self.entries.len());
        (start, end)
    }

    /// Returns only the entries introduced by `level`.
    ///
    /// The incremental counterpart of [`ViewCatalog::entries`]: callers that
    /// already simulated earlier levels pass this slice to avoid recomputing
    /// views they hold.
    pub fn level_entries(&self, level: usize) -> &[ViewParams] {
        let (start, end) = self.level_span(level);
        &self.entries[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::{level_for_max_tilt, tilt_for_level, ViewCatalog};

    #[test]
    fn tilt_series_is_geometric() {
        assert!((tilt_for_level(0) - 1.0).abs() < 1e-6);
        assert!((tilt_for_level(2) - 2.0).abs() < 1e-6);
        assert!((tilt_for_level(4) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn level_lookup_rounds_down() {
        assert_eq!(level_for_max_tilt(1.0), 0);
        assert_eq!(level_for_max_tilt(1.5), 1);
        assert_eq!(level_for_max_tilt(2.0), 2);
        assert_eq!(level_for_max_tilt(5.7), 5);
    }

    #[test]
    fn identity_view_is_first() {
        let catalog = ViewCatalog::for_level(3).unwrap();
        let first = catalog.entries()[0];
        assert!(first.is_identity());
        assert!((first.tilt - 1.0).abs() < 1e-6);
        assert!(first.phi_deg.abs() < 1e-6);
    }

    #[test]
    fn rejects_sub_unit_max_tilt() {
        assert!(ViewCatalog::for_max_tilt(0.5).is_err());
        assert!(ViewCatalog::for_max_tilt(f32::NAN).is_err());
    }
}
