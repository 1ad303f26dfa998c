// src/prediction/mod.rs

pub mod lane_matcher;
pub mod path_generator;
pub mod pipeline;
pub mod probability_scorer;
pub mod temporal_smoother;
pub mod vehicle_state;

pub use path_generator::PredictedPath;
pub use pipeline::{FrameOutput, PredictionPipeline};
pub use temporal_smoother::RankedPrediction;
pub use vehicle_state::{MotionState, VehicleState, VehicleStateStore};
