use affmatch::adapters::{HarrisDetector, PatchExtractor};
use affmatch::lowlevel::warp_view;
use affmatch::{
    simulate_catalog, simulate_entries, AffMatchError, AffMatchResult, DescriptorExtractor,
    Descriptors, FeatureDetector, ImageView, KeyPoint, ViewCatalog, ViewParams,
};

struct FixedDetector {
    points: Vec<(f32, f32)>,
}

impl FeatureDetector for FixedDetector {
    fn detect(
        &self,
        image: ImageView<'_, u8>,
        mask: Option<ImageView<'_, u8>>,
    ) -> AffMatchResult<Vec<KeyPoint>> {
        let mut out = Vec::new();
        for &(x, y) in &self.points {
            if x < 0.0 || y < 0.0 || x >= image.width() as f32 || y >= image.height() as f32 {
                continue;
            }
            if let Some(mask) = mask {
                let inside = matches!(
                    mask.get(x.round() as usize, y.round() as usize),
                    Some(&value) if value != 0
                );
                if !inside {
                    continue;
                }
            }
            out.push(KeyPoint::new(x, y, 4.0));
        }
        Ok(out)
    }
}

struct GridDetector {
    step: usize,
    margin: usize,
}

impl FeatureDetector for GridDetector {
    fn detect(
        &self,
        image: ImageView<'_, u8>,
        mask: Option<ImageView<'_, u8>>,
    ) -> AffMatchResult<Vec<KeyPoint>> {
        let mut out = Vec::new();
        let mut y = self.margin;
        while y + self.margin < image.height() {
            let mut x = self.margin;
            while x + self.margin < image.width() {
                let inside = mask.map_or(true, |mask| {
                    matches!(mask.get(x, y), Some(&value) if value != 0)
                });
                if inside {
                    out.push(KeyPoint::new(x as f32, y as f32, 4.0));
                }
                x += self.step;
            }
            y += self.step;
        }
        Ok(out)
    }
}

/// Descriptor rows are the keypoint coordinates at compute time.
struct CoordExtractor;

impl DescriptorExtractor for CoordExtractor {
    fn compute(
        &self,
        _image: ImageView<'_, u8>,
        keypoints: &mut Vec<KeyPoint>,
    ) -> AffMatchResult<Descriptors> {
        let mut descriptors = Descriptors::empty(2);
        for kp in keypoints.iter() {
            descriptors.push_row(&[kp.x, kp.y])?;
        }
        Ok(descriptors)
    }
}

struct FailingDetector;

impl FeatureDetector for FailingDetector {
    fn detect(
        &self,
        _image: ImageView<'_, u8>,
        _mask: Option<ImageView<'_, u8>>,
    ) -> AffMatchResult<Vec<KeyPoint>> {
        Err(AffMatchError::External {
            reason: "detector offline".to_string(),
        })
    }
}

fn flat_image(width: usize, height: usize) -> Vec<u8> {
    vec![90u8; width * height]
}

fn bright_square(width: usize, height: usize, x0: usize, y0: usize, side: usize) -> Vec<u8> {
    let mut data = vec![0u8; width * height];
    for y in y0..y0 + side {
        for x in x0..x0 + side {
            data[y * width + x] = 255;
        }
    }
    data
}

#[test]
fn identity_simulation_round_trips_exactly() {
    let data = flat_image(64, 64);
    let view = ImageView::from_slice(&data, 64, 64).unwrap();
    let catalog = ViewCatalog::for_max_tilt(1.0).unwrap();
    let detector = FixedDetector {
        points: vec![(8.0, 9.0), (30.5, 41.25), (60.0, 3.0)],
    };

    let features = simulate_catalog(view, &catalog, &detector, &CoordExtractor, false).unwrap();
    assert_eq!(features.len(), 3);
    for (kp, &(x, y)) in features.keypoints().iter().zip(&detector.points) {
        assert_eq!(kp.view_id, 0);
        assert!((kp.x - x).abs() < 1e-6);
        assert!((kp.y - y).abs() < 1e-6);
    }
}

#[test]
fn simulated_view_ids_exist_in_catalog() {
    let data = flat_image(96, 80);
    let view = ImageView::from_slice(&data, 96, 80).unwrap();
    let catalog = ViewCatalog::for_max_tilt(2.0).unwrap();
    let detector = GridDetector { step: 12, margin: 6 };

    let features = simulate_catalog(view, &catalog, &detector, &CoordExtractor, false).unwrap();
    assert!(!features.is_empty());
    for kp in features.keypoints() {
        assert!((kp.view_id as usize) < catalog.len());
        assert!(kp.x > -1.0 && kp.x < 96.0);
        assert!(kp.y > -1.0 && kp.y < 80.0);
    }
    // Every catalog view that was simulated contributed under its own id.
    let present: std::collections::BTreeSet<u32> =
        features.keypoints().iter().map(|kp| kp.view_id).collect();
    assert!(present.contains(&0));
    assert!(present.len() > 1);
}

#[test]
fn warp_view_marks_padding_in_the_mask() {
    let data = flat_image(32, 32);
    let view = ImageView::from_slice(&data, 32, 32).unwrap();
    let params = ViewParams {
        tilt: 1.0,
        phi_deg: 45.0,
        view_id: 1,
    };

    let warped = warp_view(view, &params).unwrap().unwrap();
    assert!(warped.image.width() > 32);
    assert!(warped.image.height() > 32);
    let mask = warped.mask.view();
    assert_eq!(mask.get(0, 0), Some(&0));
    let (cx, cy) = (warped.image.width() / 2, warped.image.height() / 2);
    assert_eq!(mask.get(cx, cy), Some(&1));
}

#[test]
fn tiny_images_skip_unviable_views() {
    let data = flat_image(6, 6);
    let view = ImageView::from_slice(&data, 6, 6).unwrap();
    let catalog = ViewCatalog::for_level(5).unwrap();
    let detector = FixedDetector {
        points: vec![(3.0, 3.0)],
    };

    let features = simulate_catalog(view, &catalog, &detector, &CoordExtractor, false).unwrap();
    for kp in features.keypoints() {
        assert!((kp.view_id as usize) < catalog.len());
    }
}

#[test]
fn all_views_failing_is_an_error() {
    let data = flat_image(32, 32);
    let view = ImageView::from_slice(&data, 32, 32).unwrap();
    let catalog = ViewCatalog::for_max_tilt(1.5).unwrap();

    let err = simulate_catalog(view, &catalog, &FailingDetector, &CoordExtractor, false)
        .err()
        .unwrap();
    assert!(matches!(err, AffMatchError::ViewSimulationFailed { .. }));
}

#[test]
fn zero_keypoints_is_not_an_error() {
    let data = flat_image(32, 32);
    let view = ImageView::from_slice(&data, 32, 32).unwrap();
    let catalog = ViewCatalog::for_max_tilt(1.5).unwrap();
    let detector = FixedDetector { points: Vec::new() };

    let features = simulate_catalog(view, &catalog, &detector, &CoordExtractor, false).unwrap();
    assert!(features.is_empty());
}

#[test]
fn rotated_view_orientation_is_corrected() {
    let data = bright_square(64, 64, 20, 24, 16);
    let view = ImageView::from_slice(&data, 64, 64).unwrap();
    let detector = HarrisDetector::new();
    let extractor = PatchExtractor::new();

    let direct = detector.detect(view, None).unwrap();
    assert!(direct.len() >= 4);

    let entry = ViewParams {
        tilt: 1.0,
        phi_deg: 90.0,
        view_id: 1,
    };
    let simulated = simulate_entries(view, &[entry], &detector, &extractor, false).unwrap();
    assert!(!simulated.is_empty());

    let mut paired = 0;
    for kp in simulated.keypoints() {
        assert_eq!(kp.view_id, 1);
        let Some(partner) = direct
            .iter()
            .find(|d| (d.x - kp.x).abs() <= 2.0 && (d.y - kp.y).abs() <= 2.0)
        else {
            continue;
        };
        paired += 1;
        let mut delta = (kp.angle_deg - partner.angle_deg) % 360.0;
        if delta > 180.0 {
            delta -= 360.0;
        }
        if delta < -180.0 {
            delta += 360.0;
        }
        assert!(
            delta.abs() <= 5.0,
            "angle not corrected: simulated {} vs direct {}",
            kp.angle_deg,
            partner.angle_deg
        );
    }
    assert!(paired >= 3);
}
