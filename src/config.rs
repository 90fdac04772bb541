use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{OverlayError, OverlayResult};
use crate::fade::Easing;

/// Tunables for the overlay engine.
///
/// Defaults match the values the engine was designed around; override them
/// with the builder methods or load them from JSON.
///
/// # Example
///
/// ```
/// use overlayer::OverlayConfig;
///
/// let config = OverlayConfig::new()
///     .fade_duration(0.35)
///     .interpupillary_distance(0.064);
/// assert_eq!(config.fade_duration, 0.35);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Length of a full 0→1 or 1→0 opacity ramp, in seconds.
    pub fade_duration: f32,
    /// Curve applied to fade progress.
    pub fade_easing: Easing,
    /// Distance between the eyes in scene units.
    pub interpupillary_distance: f32,
    /// Floor applied to every frame's display duration, in seconds.
    pub min_frame_duration: f32,
    /// Display duration used when a decoder cannot discover one, in seconds.
    pub default_frame_duration: f32,
    /// Width and height of the caption surface.
    pub caption_size: Vec2,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            fade_duration: 0.2,
            fade_easing: Easing::EaseInOut,
            interpupillary_distance: 0.063,
            min_frame_duration: 0.01,
            default_frame_duration: 0.1,
            caption_size: Vec2::new(0.8, 0.12),
        }
    }
}

impl OverlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fade_duration(mut self, seconds: f32) -> Self {
        self.fade_duration = seconds;
        self
    }

    pub fn fade_easing(mut self, easing: Easing) -> Self {
        self.fade_easing = easing;
        self
    }

    pub fn interpupillary_distance(mut self, distance: f32) -> Self {
        self.interpupillary_distance = distance;
        self
    }

    pub fn min_frame_duration(mut self, seconds: f32) -> Self {
        self.min_frame_duration = seconds;
        self
    }

    pub fn default_frame_duration(mut self, seconds: f32) -> Self {
        self.default_frame_duration = seconds;
        self
    }

    pub fn caption_size(mut self, size: Vec2) -> Self {
        self.caption_size = size;
        self
    }

    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> OverlayResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| OverlayError::config(e.to_string()))?;
        config.validated()
    }

    /// Reject values the engine cannot run with.
    pub fn validated(self) -> OverlayResult<Self> {
        let checks = [
            ("fade_duration", self.fade_duration, false),
            ("interpupillary_distance", self.interpupillary_distance, false),
            ("min_frame_duration", self.min_frame_duration, true),
            ("default_frame_duration", self.default_frame_duration, true),
        ];

        for (name, value, must_be_positive) in checks {
            if !value.is_finite() || value < 0.0 || (must_be_positive && value == 0.0) {
                return Err(OverlayError::config(format!(
                    "{name} must be a finite {} number, got {value}",
                    if must_be_positive { "positive" } else { "non-negative" }
                )));
            }
        }

        if !self.caption_size.is_finite() || self.caption_size.min_element() <= 0.0 {
            return Err(OverlayError::config(format!(
                "caption_size must be positive, got {}",
                self.caption_size
            )));
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design_constants() {
        let config = OverlayConfig::default();
        assert_eq!(config.fade_duration, 0.2);
        assert_eq!(config.interpupillary_distance, 0.063);
        assert_eq!(config.min_frame_duration, 0.01);
        assert_eq!(config.default_frame_duration, 0.1);
    }

    #[test]
    fn json_overrides_only_given_fields() {
        let config = OverlayConfig::from_json(r#"{ "fade_duration": 0.5 }"#).unwrap();
        assert_eq!(config.fade_duration, 0.5);
        assert_eq!(config.interpupillary_distance, 0.063);
    }

    #[test]
    fn json_accepts_easing_names() {
        let config = OverlayConfig::from_json(r#"{ "fade_easing": "Linear" }"#).unwrap();
        assert_eq!(config.fade_easing, Easing::Linear);
    }

    #[test]
    fn zero_frame_floor_is_rejected() {
        let err = OverlayConfig::new().min_frame_duration(0.0).validated();
        assert!(matches!(err, Err(OverlayError::Config(_))));
    }

    #[test]
    fn caption_size_reads_as_array() {
        let config = OverlayConfig::from_json(r#"{ "caption_size": [1.0, 0.2] }"#).unwrap();
        assert_eq!(config.caption_size, Vec2::new(1.0, 0.2));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = OverlayConfig::from_json("{ nope");
        assert!(matches!(err, Err(OverlayError::Config(_))));
    }
}
