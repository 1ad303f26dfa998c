// src/prediction/pipeline.rs
//
// Per-frame prediction loop:
//   1. VehicleStateStore update (create / observe / coast / purge)
//   2. on cadence frames, for every forecastable vehicle:
//        LaneMatcher → ProbabilityScorer → PathGenerator → TemporalSmoother
//   3. publish the blended prediction set
//
// The lane map is read-only for the whole run.

use super::lane_matcher::LaneMatcher;
use super::path_generator::{PathGenerator, PredictedPath};
use super::probability_scorer::ProbabilityScorer;
use super::temporal_smoother::{RankedPrediction, TemporalSmoother};
use super::vehicle_state::{MotionParams, MotionState, VehicleState, VehicleStateStore};
use crate::error::{ConfigurationError, InputDataError};
use crate::feed::{FeedReader, FrameGrouper};
use crate::geometry::Point;
use crate::lane_map::LaneMap;
use crate::pipeline::metrics::{MetricsSummary, PipelineMetrics};
use crate::types::{Frame, PredictionConfig};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct FrameOutput {
    pub frame_index: u64,
    pub timestamp: f64,
    pub predictions: Vec<RankedPrediction>,
}

pub struct PredictionPipeline {
    config: PredictionConfig,
    lane_map: LaneMap,
    vehicles: VehicleStateStore,
    matcher: LaneMatcher,
    scorer: ProbabilityScorer,
    generator: PathGenerator,
    smoother: TemporalSmoother,
    metrics: PipelineMetrics,
    last_frame: Option<(u64, f64)>,
}

impl PredictionPipeline {
    pub fn new(config: PredictionConfig, lane_map: LaneMap) -> Result<Self, ConfigurationError> {
        config.validate()?;
        info!(
            "🚦 Prediction pipeline: {} lanes, {:.1}s history → {:.1}s horizon, every {} frames",
            lane_map.len(),
            config.past_history_seconds,
            config.future_prediction_seconds,
            config.prediction_cadence_frames
        );
        Ok(Self {
            vehicles: VehicleStateStore::new(MotionParams::from(&config)),
            matcher: LaneMatcher::from_config(&config),
            scorer: ProbabilityScorer::from_config(&config),
            generator: PathGenerator::from_config(&config),
            smoother: TemporalSmoother::from_config(&config),
            metrics: PipelineMetrics::new(),
            last_frame: None,
            lane_map,
            config,
        })
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn vehicles(&self) -> &VehicleStateStore {
        &self.vehicles
    }

    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameOutput, InputDataError> {
        if let Some((last_index, last_ts)) = self.last_frame {
            if frame.frame_index <= last_index {
                return Err(InputDataError::OutOfOrderFrame {
                    frame_index: frame.frame_index,
                    last_frame_index: last_index,
                });
            }
            if frame.timestamp < last_ts {
                return Err(InputDataError::TimestampRegression {
                    frame_index: frame.frame_index,
                    timestamp: frame.timestamp,
                    last_timestamp: last_ts,
                });
            }
        }
        self.last_frame = Some((frame.frame_index, frame.timestamp));

        let started = Instant::now();
        self.metrics.inc(&self.metrics.total_frames);
        self.metrics
            .add(&self.metrics.records_accepted, frame.observations.len() as u64);

        let update = self
            .vehicles
            .update(frame.frame_index, frame.timestamp, &frame.observations);
        self.metrics
            .add(&self.metrics.vehicles_created, update.created.len() as u64);
        self.metrics.add(&self.metrics.vehicles_lost, update.lost.len() as u64);
        for id in &update.lost {
            self.smoother.forget_vehicle(*id);
        }

        if frame.frame_index % self.config.prediction_cadence_frames == 0 {
            let paths = self.generate(frame.frame_index);
            debug!(
                "Frame {}: generated {} paths for {} vehicles",
                frame.frame_index,
                paths.len(),
                self.vehicles.len()
            );
            self.smoother.ingest(paths);
            self.metrics.inc(&self.metrics.generations);
        }

        let predictions = self.smoother.current(frame.frame_index);
        self.metrics
            .add(&self.metrics.predictions_emitted, predictions.len() as u64);
        self.metrics
            .set_timing(&self.metrics.frame_time_us, started.elapsed().as_micros() as u64);

        Ok(FrameOutput {
            frame_index: frame.frame_index,
            timestamp: frame.timestamp,
            predictions,
        })
    }

    /// Raw forecasts for every forecastable vehicle.
    fn generate(&self, frame_index: u64) -> Vec<PredictedPath> {
        let mut paths = Vec::new();
        for vehicle in self.vehicles.iter() {
            let Some(direction) = self.forecast_direction(vehicle) else {
                continue;
            };
            let matches = self.matcher.find(&self.lane_map, vehicle.position, direction);
            let ranked = self.scorer.rank(matches, vehicle.consistency);
            paths.extend(ranked.iter().filter_map(|candidate| {
                self.generator
                    .generate(vehicle.track_id, vehicle.speed(), candidate, frame_index)
            }));
        }
        paths
    }

    /// Movement direction of a vehicle worth forecasting, or None.
    fn forecast_direction(&self, vehicle: &VehicleState) -> Option<Point> {
        if vehicle.state != MotionState::Active
            || vehicle.history_len() < self.config.min_history_points
            || vehicle.speed() < self.config.min_speed
        {
            return None;
        }
        vehicle.direction(
            self.config.direction_span,
            self.config.min_direction_displacement,
        )
    }

    /// Drive the loop over a whole feed, writing one JSON line per frame.
    /// Rejected records are logged and counted; the run carries on.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        feed: FeedReader<R>,
        mut out: W,
    ) -> anyhow::Result<MetricsSummary> {
        let rejections = self.metrics.clone();
        let observations = feed.filter_map(|record| match record {
            Ok(obs) => Some(obs),
            Err(e) => {
                warn!("Skipping record: {}", e);
                rejections.inc(&rejections.records_rejected);
                None
            }
        });

        for frame in FrameGrouper::new(observations) {
            match self.process_frame(&frame) {
                Ok(output) => {
                    serde_json::to_writer(&mut out, &output)?;
                    out.write_all(b"\n")?;
                }
                Err(e) => {
                    warn!("Skipping frame {}: {}", frame.frame_index, e);
                    self.metrics.add(
                        &self.metrics.records_rejected,
                        frame.observations.len() as u64,
                    );
                }
            }
        }
        out.flush()?;
        Ok(self.finish())
    }

    /// End of input: report the run.
    pub fn finish(&self) -> MetricsSummary {
        let summary = self.metrics.summary();
        info!(
            "📊 Prediction run: {} frames ({:.1} fps), {} records accepted, {} rejected, {} vehicles seen, {} lost, {} predictions",
            summary.total_frames,
            summary.fps,
            summary.records_accepted,
            summary.records_rejected,
            summary.vehicles_created,
            summary.vehicles_lost,
            summary.predictions_emitted
        );
        summary
    }
}
