//! Tuning constants for the particle field
//!
//! Everything has a default; a JSON document only needs to name the values it
//! overrides.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::theme::colors;

/// Top-level config, one section per subsystem
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub generator: GeneratorConfig,
    pub camera: CameraConfig,
    pub animation: AnimationConfig,
    pub scheduler: SchedulerConfig,
}

impl FieldConfig {
    /// Parse a (possibly partial) JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON config file
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Point cloud shape and look
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub point_count: usize,
    pub radius: f32,
    /// Upper bound (exclusive) of the per-point outward scale factor
    pub distortion_max: f32,
    pub spike_probability: f32,
    pub spike_offset: f32,
    pub color_low: [f32; 3],
    pub color_high: [f32; 3],
    pub size_base: f32,
    pub size_range: f32,
    /// Fixed seed for reproducible fields; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            point_count: 2500,
            radius: 8.0,
            distortion_max: 0.3,
            spike_probability: 0.1,
            spike_offset: 1.0,
            color_low: colors::TEAL_LOW,
            color_high: colors::TEAL_HIGH,
            size_base: 1.0,
            size_range: 3.0,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: 60.0,
            near: 1.0,
            // Short far plane keeps depth precision and fill cost bounded
            far: 200.0,
            position: [0.0, 5.0, 20.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

/// Per-frame motion and shading parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Time uniform increment per executed frame
    pub time_step: f32,
    /// Rotation increments per executed frame, radians, (x, y)
    pub rotation_step: [f32; 2],
    /// Multiplier applied to each point's size before depth attenuation
    pub point_scale: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            time_step: 0.005,
            rotation_step: [0.0002, 0.0005],
            point_scale: 2.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minimum time between executed renders (~30 fps cap)
    pub frame_interval_ms: f64,
    pub resize_debounce_ms: f64,
    pub max_pixel_ratio: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 30.0,
            resize_debounce_ms: 100.0,
            max_pixel_ratio: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = FieldConfig::from_json("{}").unwrap();
        assert_eq!(config, FieldConfig::default());
        assert_eq!(config.generator.point_count, 2500);
        assert_eq!(config.scheduler.frame_interval_ms, 30.0);
    }

    #[test]
    fn test_partial_override() {
        let json = r#"{
            "generator": { "point_count": 10, "seed": 7 },
            "scheduler": { "resize_debounce_ms": 250.0 }
        }"#;
        let config = FieldConfig::from_json(json).unwrap();
        assert_eq!(config.generator.point_count, 10);
        assert_eq!(config.generator.seed, Some(7));
        // Untouched fields in an overridden section keep their defaults
        assert_eq!(config.generator.radius, 8.0);
        assert_eq!(config.scheduler.resize_debounce_ms, 250.0);
        assert_eq!(config.scheduler.frame_interval_ms, 30.0);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let result = FieldConfig::from_json(r#"{"generator": {"point_count": "many"}}"#);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = FieldConfig::from_path("/nonexistent/hero-field.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
