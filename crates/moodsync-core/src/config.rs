//! Session configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! overrides.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Where wheel zoom keeps the view fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomAnchor {
    /// Zoom about the fixed visual origin; the pan offset is untouched.
    #[default]
    Center,
    /// Keep the world point under the pointer fixed.
    Pointer,
}

/// Tunables for a board session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Zoom change per wheel notch.
    pub wheel_zoom_step: f64,
    /// Zoom change per toolbar button press.
    pub button_zoom_step: f64,
    pub zoom_anchor: ZoomAnchor,
    /// Handle hit radius in screen pixels.
    pub handle_tolerance_px: f64,
    /// Distance of the rotate handle above the image's top edge, in screen pixels.
    pub rotate_handle_offset_px: f64,
    pub presence_ttl_ms: u64,
    pub presence_sweep_interval_ms: u64,
    pub cursor_throttle_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 3.0,
            wheel_zoom_step: 0.1,
            button_zoom_step: 0.25,
            zoom_anchor: ZoomAnchor::Center,
            handle_tolerance_px: 10.0,
            rotate_handle_offset_px: 32.0,
            presence_ttl_ms: 30_000,
            presence_sweep_interval_ms: 10_000,
            cursor_throttle_ms: 100,
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom) {
            return Err(ConfigError::Invalid(format!(
                "zoom range [{}, {}] is empty or non-positive",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.wheel_zoom_step <= 0.0 || self.button_zoom_step <= 0.0 {
            return Err(ConfigError::Invalid("zoom steps must be positive".into()));
        }
        if self.handle_tolerance_px < 0.0 {
            return Err(ConfigError::Invalid("handle tolerance must not be negative".into()));
        }
        Ok(())
    }

    pub fn presence_ttl(&self) -> Duration {
        Duration::from_millis(self.presence_ttl_ms)
    }

    pub fn presence_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.presence_sweep_interval_ms)
    }

    pub fn cursor_throttle(&self) -> Duration {
        Duration::from_millis(self.cursor_throttle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.min_zoom, 0.5);
        assert_eq!(config.max_zoom, 3.0);
        assert_eq!(config.presence_ttl(), Duration::from_secs(30));
        assert_eq!(config.cursor_throttle(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_json() {
        let config = SessionConfig::from_json(r#"{ "zoom_anchor": "pointer", "max_zoom": 4.0 }"#).unwrap();
        assert_eq!(config.zoom_anchor, ZoomAnchor::Pointer);
        assert_eq!(config.max_zoom, 4.0);
        assert_eq!(config.min_zoom, 0.5);
    }

    #[test]
    fn test_invalid_range() {
        let result = SessionConfig::from_json(r#"{ "min_zoom": 2.0, "max_zoom": 1.0 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "cursor_throttle_ms": 250 }}"#).unwrap();

        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.cursor_throttle(), Duration::from_millis(250));
    }

    #[test]
    fn test_load_missing_file() {
        let result = SessionConfig::load("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
