#![cfg(feature = "rayon")]

use affmatch::adapters::{BruteForceMatcher, HarrisDetector, PatchExtractor};
use affmatch::{AffMatcherHelper, DescriptorMatcher, Descriptors, HelperConfig, ImageView};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn textured_image(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 11) ^ (y * 3) ^ (x * y)) & 0xFF;
            data.push(value as u8);
        }
    }
    data
}

fn helper(parallel: bool) -> AffMatcherHelper {
    AffMatcherHelper::new(
        Box::new(HarrisDetector::new()),
        Box::new(PatchExtractor::new()),
        Box::new(BruteForceMatcher { parallel }),
    )
    .try_with_config(HelperConfig {
        parallel,
        ..HelperConfig::default()
    })
    .unwrap()
}

#[test]
fn parallel_pipeline_matches_sequential_exactly() {
    let data_a = textured_image(72, 64);
    let data_b = textured_image(72, 64);
    let view_a = ImageView::from_slice(&data_a, 72, 64).unwrap();
    let view_b = ImageView::from_slice(&data_b, 72, 64).unwrap();

    let seq = helper(false)
        .match_with_max_tilt(view_a, view_b, 0.8, 2.0)
        .unwrap();
    let par = helper(true)
        .match_with_max_tilt(view_a, view_b, 0.8, 2.0)
        .unwrap();

    assert_eq!(seq.matches, par.matches);
    assert_eq!(seq.keypoints_a.len(), par.keypoints_a.len());
    assert_eq!(seq.keypoints_b.len(), par.keypoints_b.len());
}

#[test]
fn parallel_brute_force_rows_match_sequential() {
    let mut rng = StdRng::seed_from_u64(5);
    let rows = 40;
    let cols = 32;
    let data: Vec<f32> = (0..rows * cols).map(|_| rng.random::<f32>()).collect();
    let query = Descriptors::new(data.clone(), rows, cols).unwrap();
    let train = {
        let data: Vec<f32> = (0..rows * cols).map(|_| rng.random::<f32>()).collect();
        Descriptors::new(data, rows, cols).unwrap()
    };

    let seq = BruteForceMatcher { parallel: false }
        .knn_match(&query, &train, 3)
        .unwrap();
    let par = BruteForceMatcher { parallel: true }
        .knn_match(&query, &train, 3)
        .unwrap();
    assert_eq!(seq, par);
}
