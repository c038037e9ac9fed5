use affmatch::{level_for_max_tilt, tilt_for_level, AffMatchError, ViewCatalog, MAX_VIEWS};

#[test]
fn catalog_sizes_match_the_rotation_budget() {
    // 1 identity view, 4 rotations at sqrt(2), 5 rotations at 2.
    let catalog = ViewCatalog::for_max_tilt(2.0).unwrap();
    assert_eq!(catalog.len(), 10);
    assert_eq!(catalog.level_entries(0).len(), 1);
    assert_eq!(catalog.level_entries(1).len(), 4);
    assert_eq!(catalog.level_entries(2).len(), 5);
    assert_eq!(catalog.max_level(), 2);
}

#[test]
fn identity_view_has_id_zero() {
    let catalog = ViewCatalog::for_max_tilt(4.0).unwrap();
    let first = catalog.entries()[0];
    assert!(first.is_identity());
    assert_eq!(first.view_id, 0);
    assert!((first.tilt - 1.0).abs() < 1e-6);
}

#[test]
fn ids_are_assigned_in_production_order() {
    let catalog = ViewCatalog::for_level(4).unwrap();
    for (idx, entry) in catalog.entries().iter().enumerate() {
        assert_eq!(entry.view_id as usize, idx);
    }
}

#[test]
fn growing_the_catalog_preserves_earlier_entries() {
    let small = ViewCatalog::for_level(2).unwrap();
    let large = ViewCatalog::for_level(4).unwrap();
    assert!(small.len() < large.len());
    for (a, b) in small.entries().iter().zip(large.entries()) {
        assert_eq!(a.view_id, b.view_id);
        assert!((a.tilt - b.tilt).abs() < 1e-6);
        assert!((a.phi_deg - b.phi_deg).abs() < 1e-6);
    }
}

#[test]
fn rotations_cover_the_half_turn_with_tilt_scaled_steps() {
    let catalog = ViewCatalog::for_level(3).unwrap();
    for entry in catalog.entries() {
        assert!(entry.phi_deg >= 0.0);
        assert!(entry.phi_deg < 180.0);
        assert!(entry.tilt >= 1.0);
    }

    // At t = 2 the rotation step is 72 / 2 = 36 degrees.
    let level2 = catalog.level_entries(2);
    assert!((level2[1].phi_deg - 36.0).abs() < 1e-4);
    // Larger tilts use finer steps.
    let level3 = catalog.level_entries(3);
    let step2 = level2[1].phi_deg - level2[0].phi_deg;
    let step3 = level3[1].phi_deg - level3[0].phi_deg;
    assert!(step3 < step2);
}

#[test]
fn tilt_bound_limits_included_levels() {
    let catalog = ViewCatalog::for_max_tilt(3.0).unwrap();
    for entry in catalog.entries() {
        assert!(entry.tilt <= 3.0 + 1e-3);
    }
    assert_eq!(catalog.max_level(), level_for_max_tilt(3.0));
}

#[test]
fn default_ceiling_stays_under_six() {
    assert!(tilt_for_level(5) < 6.0);
    assert!(tilt_for_level(5) > 5.5);
}

#[test]
fn level_span_matches_level_entries() {
    let catalog = ViewCatalog::for_level(3).unwrap();
    let mut total = 0;
    for level in 0..=3 {
        let (start, end) = catalog.level_span(level);
        assert_eq!(start, total);
        assert_eq!(end - start, catalog.level_entries(level).len());
        total = end;
    }
    assert_eq!(total, catalog.len());
}

#[test]
fn oversized_catalogs_are_rejected() {
    let err = ViewCatalog::for_level(14).err().unwrap();
    assert!(matches!(
        err,
        AffMatchError::TooManyViews { max, .. } if max == MAX_VIEWS
    ));
    assert!(ViewCatalog::for_level(13).is_ok());
}
