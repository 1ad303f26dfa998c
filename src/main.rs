// src/main.rs
//
//   lane-forecast map     <config.yaml> <detections.jsonl> <out_dir>
//   lane-forecast predict <config.yaml> <lanes.geojson> <detections.jsonl> <predictions.jsonl>

use anyhow::{bail, Context, Result};
use lane_forecast::feed::FeedReader;
use lane_forecast::inference::LaneInferencePipeline;
use lane_forecast::lane_map::LaneMap;
use lane_forecast::prediction::PredictionPipeline;
use lane_forecast::types::Config;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage:
  lane-forecast map     <config.yaml> <detections.jsonl> <out_dir>
  lane-forecast predict <config.yaml> <lanes.geojson> <detections.jsonl> <predictions.jsonl>";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, rest) = match args.split_first() {
        Some((command, rest)) => (command.as_str(), rest),
        None => bail!("{}", USAGE),
    };

    match (command, rest) {
        ("map", [config, feed, out_dir]) => {
            let config = load_config(config)?;
            run_map(&config, Path::new(feed), Path::new(out_dir))
        }
        ("predict", [config, lanes, feed, output]) => {
            let config = load_config(config)?;
            run_predict(&config, Path::new(lanes), Path::new(feed), Path::new(output))
        }
        _ => bail!("{}", USAGE),
    }
}

/// Load and validate the config, then install logging from it.
/// RUST_LOG takes precedence over `logging.level`.
fn load_config(path: &str) -> Result<Config> {
    let config = Config::load(path)?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("invalid logging.level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    info!("✓ Configuration loaded from {}", path);
    Ok(config)
}

fn run_map(config: &Config, feed: &Path, out_dir: &Path) -> Result<()> {
    info!("🗺️  Inferring lanes from {}", feed.display());
    let mut pipeline = LaneInferencePipeline::new(&config.lane_inference);
    for record in FeedReader::open(feed)? {
        pipeline.record(record);
    }
    let output = pipeline.finish();
    output.write(out_dir)?;

    let stats = &output.stats;
    info!("  Detections: {} ({} rejected)", stats.total_detections, stats.rejected_records);
    info!("  Tracks: {} ({} valid)", stats.total_tracks, stats.valid_tracks);
    info!("  Lane candidates: {}", stats.merged_candidates);
    info!("  Final lanes: {}", stats.final_lanes);
    Ok(())
}

fn run_predict(config: &Config, lanes: &Path, feed: &Path, output: &Path) -> Result<()> {
    let lane_map = LaneMap::load(lanes)?;
    if lane_map.is_empty() {
        bail!("no usable lanes in {}", lanes.display());
    }

    let out = File::create(output)
        .with_context(|| format!("cannot create {}", output.display()))?;
    let mut pipeline = PredictionPipeline::new(config.prediction.clone(), lane_map)?;
    let summary = pipeline.run(FeedReader::open(feed)?, BufWriter::new(out))?;

    info!("💾 Predictions written to {}", output.display());
    info!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
