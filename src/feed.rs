// src/feed.rs
//
// Detection/tracking feed ingestion.
//
// Records arrive as JSON Lines from the external detector + tracker. Each
// record is checked once here and turned into an Observation:
//   - malformed JSON, non-finite numbers, empty boxes → InputDataError
//   - frame_index / timestamp going backwards        → InputDataError
//   - the same track twice in one frame              → InputDataError
// Callers log and skip rejected records; the stream carries on.

use crate::error::InputDataError;
use crate::geometry::Point;
use crate::types::{Frame, Observation};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::Peekable;
use std::path::Path;
use tracing::error;

// ============================================================================
// BOUNDARY RECORD
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OrientedBox {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    /// Radians
    pub angle: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionRecord {
    pub frame_index: u64,
    pub timestamp: f64,
    pub track_id: u64,
    pub oriented_box: OrientedBox,
    pub class_label: String,
}

impl DetectionRecord {
    pub fn into_observation(self) -> Result<Observation, InputDataError> {
        let b = &self.oriented_box;
        let fields = [
            ("timestamp", self.timestamp),
            ("center_x", b.center_x),
            ("center_y", b.center_y),
            ("width", b.width),
            ("height", b.height),
            ("angle", b.angle),
        ];
        if let Some(&(field, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(InputDataError::NonFinite {
                track_id: self.track_id,
                frame_index: self.frame_index,
                field,
            });
        }
        if self.timestamp < 0.0 {
            return Err(InputDataError::NegativeTimestamp {
                track_id: self.track_id,
                frame_index: self.frame_index,
                timestamp: self.timestamp,
            });
        }
        if b.width <= 0.0 || b.height <= 0.0 {
            return Err(InputDataError::DegenerateBox {
                track_id: self.track_id,
                frame_index: self.frame_index,
                width: b.width,
                height: b.height,
            });
        }

        Ok(Observation {
            frame_index: self.frame_index,
            timestamp: self.timestamp,
            track_id: self.track_id,
            center: Point::new(b.center_x, b.center_y),
            heading: b.angle,
            class_label: self.class_label,
        })
    }
}

/// Parse one feed line; blank lines yield Ok(None).
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<DetectionRecord>, InputDataError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| InputDataError::Malformed {
            line: line_no,
            source,
        })
}

// ============================================================================
// ORDERING
// ============================================================================

/// Enforces non-decreasing frame order, one timestamp per frame and one
/// detection per track per frame. Rejected records leave the state untouched.
#[derive(Debug, Default)]
pub struct OrderValidator {
    current: Option<(u64, f64)>,
    tracks_in_frame: HashSet<u64>,
}

impl OrderValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, obs: &Observation) -> Result<(), InputDataError> {
        if let Some((frame_index, frame_ts)) = self.current {
            if obs.frame_index < frame_index {
                return Err(InputDataError::OutOfOrderFrame {
                    frame_index: obs.frame_index,
                    last_frame_index: frame_index,
                });
            }
            if obs.frame_index == frame_index {
                if obs.timestamp != frame_ts {
                    return Err(InputDataError::InconsistentFrameTimestamp {
                        frame_index: obs.frame_index,
                        timestamp: obs.timestamp,
                        frame_timestamp: frame_ts,
                    });
                }
                if !self.tracks_in_frame.insert(obs.track_id) {
                    return Err(InputDataError::DuplicateTrack {
                        track_id: obs.track_id,
                        frame_index: obs.frame_index,
                    });
                }
                return Ok(());
            }
            if obs.timestamp < frame_ts {
                return Err(InputDataError::TimestampRegression {
                    frame_index: obs.frame_index,
                    timestamp: obs.timestamp,
                    last_timestamp: frame_ts,
                });
            }
        }

        self.current = Some((obs.frame_index, obs.timestamp));
        self.tracks_in_frame.clear();
        self.tracks_in_frame.insert(obs.track_id);
        Ok(())
    }
}

// ============================================================================
// READER
// ============================================================================

/// Iterator over validated observations of a JSON Lines feed.
pub struct FeedReader<R: BufRead> {
    lines: std::io::Lines<R>,
    line_no: usize,
    validator: OrderValidator,
    exhausted: bool,
}

impl FeedReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("cannot open detection feed {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> FeedReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            validator: OrderValidator::new(),
            exhausted: false,
        }
    }
}

impl<R: BufRead> Iterator for FeedReader<R> {
    type Item = Result<Observation, InputDataError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.exhausted {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    // A broken stream ends the input; accumulated state is still finalized
                    error!("Feed read failed after line {}: {}", self.line_no, e);
                    self.exhausted = true;
                    return None;
                }
                None => {
                    self.exhausted = true;
                    return None;
                }
            };
            self.line_no += 1;

            let record = match parse_line(self.line_no, &line) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            };
            let result = record
                .into_observation()
                .and_then(|obs| self.validator.admit(&obs).map(|_| obs));
            return Some(result);
        }
        None
    }
}

// ============================================================================
// FRAME GROUPING
// ============================================================================

/// Groups an ordered observation stream into frames.
pub struct FrameGrouper<I: Iterator<Item = Observation>> {
    inner: Peekable<I>,
}

impl<I: Iterator<Item = Observation>> FrameGrouper<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner: inner.peekable(),
        }
    }
}

impl<I: Iterator<Item = Observation>> Iterator for FrameGrouper<I> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let first = self.inner.next()?;
        let mut frame = Frame {
            frame_index: first.frame_index,
            timestamp: first.timestamp,
            observations: vec![first],
        };
        while let Some(obs) = self.inner.next_if(|o| o.frame_index == frame.frame_index) {
            frame.observations.push(obs);
        }
        Some(frame)
    }
}
