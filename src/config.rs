// src/config.rs

use crate::error::ConfigurationError;
use crate::types::{Config, LaneInferenceConfig, PredictionConfig};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigurationError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_yaml::from_str(&contents).map_err(|source| ConfigurationError::MalformedConfig {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject any threshold that would make a stage meaningless.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.lane_inference.validate()?;
        self.prediction.validate()
    }
}

impl LaneInferenceConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        positive("min_track_duration_seconds", self.min_track_duration_seconds)?;
        positive("hausdorff_threshold", self.hausdorff_threshold)?;
        positive("endpoint_snap_tolerance", self.endpoint_snap_tolerance)?;
        positive("simplify_tolerance", self.simplify_tolerance)?;
        positive("window_size", self.window_size as f64)?;
        positive("min_track_points", self.min_track_points as f64)?;
        Ok(())
    }
}

impl PredictionConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        positive("past_history_seconds", self.past_history_seconds)?;
        positive("future_prediction_seconds", self.future_prediction_seconds)?;
        positive("proximity_radius", self.proximity_radius)?;
        positive("near_centerline_threshold", self.near_centerline_threshold)?;
        positive("prediction_cadence_frames", self.prediction_cadence_frames as f64)?;
        positive("max_missed_frames", self.max_missed_frames as f64)?;
        positive("max_paths", self.max_paths as f64)?;
        positive("min_speed", self.min_speed)?;
        positive("velocity_deltas", self.velocity_deltas as f64)?;
        positive("consistency_deltas", self.consistency_deltas as f64)?;
        positive("min_direction_displacement", self.min_direction_displacement)?;
        positive("max_candidate_lanes", self.max_candidate_lanes as f64)?;
        positive("max_travel_distance", self.max_travel_distance)?;
        positive("smoothing_generations", self.smoothing_generations as f64)?;
        positive("max_prediction_age_frames", self.max_prediction_age_frames as f64)?;
        positive("confidence_decay", self.confidence_decay)?;
        positive("proximity_scale", self.proximity_scale)?;

        if self.direction_span < 2 {
            return Err(ConfigurationError::Invalid {
                field: "direction_span",
                reason: format!("needs at least 2 samples, got {}", self.direction_span),
            });
        }
        if self.path_samples < 2 {
            return Err(ConfigurationError::Invalid {
                field: "path_samples",
                reason: format!("needs at least 2 points, got {}", self.path_samples),
            });
        }
        if self.confidence_decay > 1.0 {
            return Err(ConfigurationError::Invalid {
                field: "confidence_decay",
                reason: format!("must not exceed 1.0, got {}", self.confidence_decay),
            });
        }
        for (field, value) in [
            ("min_alignment", self.min_alignment),
            ("min_probability", self.min_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::Invalid {
                    field,
                    reason: format!("must lie in [0, 1], got {}", value),
                });
            }
        }
        let w = &self.weights;
        for (field, value) in [
            ("weights.alignment", w.alignment),
            ("weights.proximity", w.proximity),
            ("weights.consistency", w.consistency),
            ("weights.centerline", w.centerline),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::Invalid {
                    field,
                    reason: format!("must be a non-negative number, got {}", value),
                });
            }
        }

        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::NonPositive { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "lane_inference:\n  hausdorff_threshold: 2.0\nprediction:\n  max_paths: 2\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.lane_inference.hausdorff_threshold, 2.0);
        assert_eq!(config.lane_inference.window_size, 5);
        assert_eq!(config.prediction.max_paths, 2);
        assert_eq!(config.prediction.max_missed_frames, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_positive_threshold_is_rejected() {
        let mut config = Config::default();
        config.lane_inference.simplify_tolerance = 0.0;
        match config.validate() {
            Err(ConfigurationError::NonPositive { field, .. }) => {
                assert_eq!(field, "simplify_tolerance")
            }
            other => panic!("expected NonPositive, got {:?}", other),
        }

        let mut config = Config::default();
        config.prediction.proximity_radius = -5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_decay_above_one_is_rejected() {
        let mut config = Config::default();
        config.prediction.confidence_decay = 1.2;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::Invalid {
                field: "confidence_decay",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let path = std::env::temp_dir().join("lane_forecast_missing_config.yaml");
        let _ = fs::remove_file(&path);
        assert!(matches!(
            Config::load(&path),
            Err(ConfigurationError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("lane_forecast_test_config.yaml");
        fs::write(
            &path,
            "prediction:\n  prediction_cadence_frames: 4\nlogging:\n  level: debug\n",
        )
        .unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.prediction.prediction_cadence_frames, 4);
        assert_eq!(config.logging.level, "debug");
        let _ = fs::remove_file(&path);
    }
}
