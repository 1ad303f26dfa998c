// src/inference/mod.rs

pub mod endpoint_snapper;
pub mod pipeline;
pub mod simplifier;
pub mod smoother;
pub mod track_filter;
pub mod track_merger;
pub mod trajectory_store;

pub use pipeline::{LaneInferenceOutput, LaneInferencePipeline, ProcessingStats, TrackSummary};
pub use track_merger::{hausdorff_distance, LaneCandidate, TrackMerger};
pub use trajectory_store::{Trajectory, TrajectoryStore};
