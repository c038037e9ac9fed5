use affmatch::adapters::{BruteForceMatcher, HarrisDetector, PatchExtractor};
use affmatch::{AffMatcherHelper, HelperConfig, MatchReport, OwnedImage};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Match an image pair under viewpoint change")]
struct Cli {
    /// First image file path.
    first: PathBuf,
    /// Second image file path.
    second: PathBuf,
    /// Fixed tilt bound; when omitted, tilt grows until enough matches.
    #[arg(long)]
    max_tilt: Option<f32>,
    /// Distance-ratio threshold for match filtering.
    #[arg(short, long, default_value_t = 0.4)]
    ratio: f32,
    /// Progressive matching stops once this many matches survive.
    #[arg(long, default_value_t = 64)]
    target_matches: usize,
    /// Highest tilt level the progressive loop may reach.
    #[arg(long, default_value_t = 5)]
    max_level: usize,
    /// Pixel radius for duplicate suppression.
    #[arg(long)]
    dedup_radius: Option<f32>,
    /// Warp views on a worker pool (requires the rayon feature).
    #[arg(long)]
    parallel: bool,
    /// File path for the JSON match report; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Enable tracing output for pipeline diagnostics.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Serialize)]
struct MatchRecord {
    query_idx: usize,
    train_idx: usize,
    distance: f32,
    query_x: f32,
    query_y: f32,
    train_x: f32,
    train_y: f32,
}

#[derive(Debug, Serialize)]
struct Output {
    keypoints_first: usize,
    keypoints_second: usize,
    level_reached: usize,
    reached_ceiling: bool,
    matches: Vec<MatchRecord>,
}

impl From<&MatchReport> for Output {
    fn from(report: &MatchReport) -> Self {
        let matches = report
            .matches
            .iter()
            .map(|m| {
                let q = &report.keypoints_a[m.query_idx];
                let t = &report.keypoints_b[m.train_idx];
                MatchRecord {
                    query_idx: m.query_idx,
                    train_idx: m.train_idx,
                    distance: m.distance,
                    query_x: q.x,
                    query_y: q.y,
                    train_x: t.x,
                    train_y: t.y,
                }
            })
            .collect();
        Self {
            keypoints_first: report.keypoints_a.len(),
            keypoints_second: report.keypoints_b.len(),
            level_reached: report.level_reached,
            reached_ceiling: report.reached_ceiling,
            matches,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("affmatch=info".parse()?))
            .with_target(false)
            .init();
    }

    let first = OwnedImage::load_gray(&cli.first)?;
    let second = OwnedImage::load_gray(&cli.second)?;

    let helper = AffMatcherHelper::new(
        Box::new(HarrisDetector::new()),
        Box::new(PatchExtractor::new()),
        Box::new(BruteForceMatcher {
            parallel: cli.parallel,
        }),
    )
    .try_with_config(HelperConfig {
        target_matches: cli.target_matches,
        max_level: cli.max_level,
        parallel: cli.parallel,
        duplicate_radius: cli.dedup_radius,
    })?;

    let report = match cli.max_tilt {
        Some(max_tilt) => {
            helper.match_with_max_tilt(first.view(), second.view(), cli.ratio, max_tilt)?
        }
        None => helper.match_increasing_tilt(first.view(), second.view(), cli.ratio)?,
    };
    tracing::info!(
        matches = report.matches.len(),
        level = report.level_reached,
        ceiling = report.reached_ceiling,
        "matching finished"
    );

    let json = serde_json::to_string_pretty(&Output::from(&report))?;
    match cli.output {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
