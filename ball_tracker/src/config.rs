use crate::core_modules::color_segmenter::HsvRange;
use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_TRAIL_CAPACITY: usize = 20;
pub const DEFAULT_MISS_THRESHOLD: u32 = 11;
pub const DEFAULT_MIN_AREA: u64 = 1;

/// Configuration for the VisionPipeline. Defaults track a yellow-green tennis ball.
///
/// Any field missing from a config file keeps its default:
///
/// ```yaml
/// color:
///   hue_min: 20
///   hue_max: 40
/// miss_threshold: 15
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// HSV window a pixel must fall in to count as ball.
    pub color: HsvRange,
    /// Number of recent positions kept for drawing the trail.
    pub trail_capacity: usize,
    /// Consecutive missed frames after which the rally is over.
    pub miss_threshold: u32,
    /// Minimum foreground area, in pixels, for a mask to count as a detection.
    pub min_area: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            color: HsvRange::default(),
            trail_capacity: DEFAULT_TRAIL_CAPACITY,
            miss_threshold: DEFAULT_MISS_THRESHOLD,
            min_area: DEFAULT_MIN_AREA,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.color.validate()?;
        if self.trail_capacity == 0 {
            return Err(TrackerError::InvalidConfig(
                "trail_capacity must be at least 1".into(),
            ));
        }
        if self.miss_threshold == 0 {
            return Err(TrackerError::InvalidConfig(
                "miss_threshold must be at least 1".into(),
            ));
        }
        if self.min_area == 0 {
            return Err(TrackerError::InvalidConfig(
                "min_area must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| TrackerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_the_reference_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.trail_capacity, 20);
        assert_eq!(config.miss_threshold, 11);
        assert_eq!(config.min_area, 1);
        assert_eq!(config.color.hue_min, 20);
        assert_eq!(config.color.hue_max, 40);
        assert_eq!(config.color.saturation_min, 50);
        assert_eq!(config.color.value_min, 50);
        config.validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = PipelineConfig::from_yaml_str("miss_threshold: 5\ncolor:\n  hue_max: 45\n")
            .unwrap();
        assert_eq!(config.miss_threshold, 5);
        assert_eq!(config.color.hue_max, 45);
        assert_eq!(config.color.hue_min, 20);
        assert_eq!(config.trail_capacity, 20);
    }

    #[test]
    fn zero_values_are_rejected() {
        for yaml in ["trail_capacity: 0", "miss_threshold: 0", "min_area: 0"] {
            let err = PipelineConfig::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(err, TrackerError::InvalidConfig(_)), "{yaml}: {err}");
        }
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = PipelineConfig::from_yaml_str("miss_threshold: [oops").unwrap_err();
        assert!(matches!(err, TrackerError::ConfigParse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = PipelineConfig::load("/nonexistent/ball_tracker.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/ball_tracker.yaml"));
    }

    #[test]
    fn round_trips_through_yaml() {
        let config = PipelineConfig {
            miss_threshold: 7,
            ..PipelineConfig::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert_eq!(PipelineConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
