// src/inference/pipeline.rs
//
// Offline lane inference: observations → trajectories → filter → smooth →
// merge → snap endpoints → simplify → LaneMap.
//
// Observations are buffered until finish(); nothing is merged incrementally.
// A feed that ends early is still finalized with whatever was accumulated.

use super::endpoint_snapper::EndpointSnapper;
use super::simplifier::Simplifier;
use super::smoother::PolylineSmoother;
use super::track_filter::TrackFilter;
use super::track_merger::{LaneCandidate, TrackMerger};
use super::trajectory_store::TrajectoryStore;
use crate::error::InputDataError;
use crate::lane_map::{Lane, LaneMap};
use crate::types::{LaneInferenceConfig, Observation};
use anyhow::Context;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub const LANES_FILE: &str = "lanes.geojson";
pub const SUMMARY_FILE: &str = "track_summary.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    pub track_id: u64,
    pub point_count: usize,
    pub duration: f64,
    pub merged_into_lane_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingStats {
    pub total_detections: usize,
    pub rejected_records: usize,
    pub total_tracks: usize,
    pub valid_tracks: usize,
    pub merged_candidates: usize,
    pub final_lanes: usize,
}

#[derive(Debug, Serialize)]
struct SummaryDocument<'a> {
    tracks: &'a [TrackSummary],
    processing_stats: &'a ProcessingStats,
}

#[derive(Debug)]
pub struct LaneInferenceOutput {
    pub lane_map: LaneMap,
    /// Ordered by track_id
    pub summaries: Vec<TrackSummary>,
    pub stats: ProcessingStats,
}

impl LaneInferenceOutput {
    /// Writes `lanes.geojson` and `track_summary.json` into `out_dir`.
    pub fn write(&self, out_dir: impl AsRef<Path>) -> anyhow::Result<()> {
        let out_dir = out_dir.as_ref();
        fs::create_dir_all(out_dir)
            .with_context(|| format!("cannot create output directory {}", out_dir.display()))?;

        self.lane_map.write_geojson(out_dir.join(LANES_FILE))?;

        let summary_path = out_dir.join(SUMMARY_FILE);
        let doc = SummaryDocument {
            tracks: &self.summaries,
            processing_stats: &self.stats,
        };
        fs::write(&summary_path, serde_json::to_string_pretty(&doc)?)
            .with_context(|| format!("cannot write {}", summary_path.display()))?;
        info!("💾 Wrote {} track summaries to {}", self.summaries.len(), summary_path.display());
        Ok(())
    }
}

pub struct LaneInferencePipeline {
    store: TrajectoryStore,
    filter: TrackFilter,
    smoother: PolylineSmoother,
    merger: TrackMerger,
    snapper: EndpointSnapper,
    simplifier: Simplifier,
    rejected_records: usize,
}

impl LaneInferencePipeline {
    pub fn new(config: &LaneInferenceConfig) -> Self {
        Self {
            store: TrajectoryStore::new(),
            filter: TrackFilter::from_config(config),
            smoother: PolylineSmoother::new(config.window_size),
            merger: TrackMerger::new(
                config.hausdorff_threshold,
                PolylineSmoother::new(config.window_size),
            ),
            snapper: EndpointSnapper::new(config.endpoint_snap_tolerance),
            simplifier: Simplifier::new(config.simplify_tolerance),
            rejected_records: 0,
        }
    }

    /// Feed one record from the reader. Rejected records are logged and
    /// counted; they never stop the run.
    pub fn record(&mut self, record: Result<Observation, InputDataError>) {
        let result = record.and_then(|obs| self.store.record(&obs));
        if let Err(e) = result {
            warn!("Skipping record: {}", e);
            self.rejected_records += 1;
        }
    }

    pub fn finish(self) -> LaneInferenceOutput {
        let total_detections = self.store.observation_count();
        let trajectories = self.store.finalize();
        let total_tracks = trajectories.len();
        info!("📍 Collected {} detections across {} tracks", total_detections, total_tracks);

        let mut summaries: Vec<TrackSummary> = trajectories
            .iter()
            .map(|t| TrackSummary {
                track_id: t.track_id(),
                point_count: t.len(),
                duration: t.duration(),
                merged_into_lane_id: None,
            })
            .collect();

        let (valid, _) = self.filter.apply(trajectories);
        let valid_tracks = valid.len();
        info!("✅ {}/{} tracks pass the length filter", valid_tracks, total_tracks);

        let smoothed: Vec<LaneCandidate> = valid
            .iter()
            .map(|t| LaneCandidate::from_track(t.track_id(), self.smoother.smooth(t.points())))
            .collect();

        let mut candidates = self.merger.merge(smoothed);
        let merged_candidates = candidates.len();

        let snapped = self.snapper.snap(&mut candidates);
        if snapped > 0 {
            info!("📌 Snapped {} lane endpoints", snapped);
        }

        let mut lane_map = LaneMap::new();
        let mut lane_of_track: HashMap<u64, String> = HashMap::new();
        for candidate in candidates {
            let lane_id = format!("lane_{}", lane_map.len());
            let points = self.simplifier.simplify(&candidate.polyline);
            let result = Lane::new(lane_id.clone(), points)
                .map(|lane| lane.with_source_tracks(candidate.track_ids.clone()))
                .and_then(|lane| lane_map.insert(lane));
            match result {
                Ok(()) => {
                    for &track_id in &candidate.track_ids {
                        lane_of_track.insert(track_id, lane_id.clone());
                    }
                }
                Err(e) => warn!(
                    "Dropping lane candidate from tracks {:?}: {}",
                    candidate.track_ids, e
                ),
            }
        }

        for summary in &mut summaries {
            summary.merged_into_lane_id = lane_of_track.get(&summary.track_id).cloned();
        }

        let stats = ProcessingStats {
            total_detections,
            rejected_records: self.rejected_records,
            total_tracks,
            valid_tracks,
            merged_candidates,
            final_lanes: lane_map.len(),
        };
        info!("🛣️  Lane inference complete: {} lanes", stats.final_lanes);

        LaneInferenceOutput {
            lane_map,
            summaries,
            stats,
        }
    }
}
