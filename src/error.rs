// src/error.rs
//
// Error taxonomy. Only ConfigurationError is fatal; the other two are
// per-entity and the pipelines log and skip the offending record, track
// or lane. A vehicle with no lane nearby is not an error at all.

use std::path::PathBuf;
use thiserror::Error;

/// A feed record that cannot be accepted (malformed or out of order).
#[derive(Debug, Error)]
pub enum InputDataError {
    #[error("line {line}: malformed record: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("track {track_id} frame {frame_index}: field `{field}` is not finite")]
    NonFinite {
        track_id: u64,
        frame_index: u64,
        field: &'static str,
    },

    #[error("track {track_id} frame {frame_index}: box is {width}x{height}")]
    DegenerateBox {
        track_id: u64,
        frame_index: u64,
        width: f64,
        height: f64,
    },

    #[error("track {track_id} frame {frame_index}: negative timestamp {timestamp}")]
    NegativeTimestamp {
        track_id: u64,
        frame_index: u64,
        timestamp: f64,
    },

    #[error("frame {frame_index} arrived after frame {last_frame_index}")]
    OutOfOrderFrame {
        frame_index: u64,
        last_frame_index: u64,
    },

    #[error("frame {frame_index}: timestamp {timestamp} precedes {last_timestamp}")]
    TimestampRegression {
        frame_index: u64,
        timestamp: f64,
        last_timestamp: f64,
    },

    #[error("frame {frame_index}: timestamp {timestamp} disagrees with {frame_timestamp}")]
    InconsistentFrameTimestamp {
        frame_index: u64,
        timestamp: f64,
        frame_timestamp: f64,
    },

    #[error("track {track_id} reported twice in frame {frame_index}")]
    DuplicateTrack { track_id: u64, frame_index: u64 },

    #[error("track {track_id}: timestamp {timestamp} is not after {last_timestamp}")]
    NonIncreasingTimestamp {
        track_id: u64,
        timestamp: f64,
        last_timestamp: f64,
    },
}

/// A polyline that cannot carry lane geometry.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("polyline has {count} distinct point(s), need at least 2")]
    TooFewPoints { count: usize },

    #[error("coordinate is not finite")]
    NonFiniteCoordinate,

    #[error("lane id `{0}` already present")]
    DuplicateLaneId(String),
}

/// Startup failure. Nothing is processed once one of these is raised.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    MalformedConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot parse lane file {path}: {source}")]
    MalformedLaneFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("`{field}` must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("`{field}` is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}
