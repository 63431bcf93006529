//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default rendering parameters.
    #[serde(default)]
    pub render: RenderDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default rendering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Output video frame rate.
    pub fps: u32,

    /// Number of animation frames to produce.
    pub frames: usize,

    /// Simulated pacing between animation frames (ms).
    pub interval_ms: u64,

    /// Figure width in inches.
    pub width_in: f64,

    /// Figure height in inches.
    pub height_in: f64,

    /// Pixel density used to turn the figure size into pixels.
    pub dpi: u32,

    /// Figure title.
    pub title: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "dispviz=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            frames: 50,
            interval_ms: 20,
            width_in: 6.4,
            height_in: 4.8,
            dpi: 150,
            title: "Sensor Displacement".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match Self::from_json(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Parse a config document. Missing sections take their defaults.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("dispviz").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_render_settings() {
        let config = AppConfig::default();
        assert_eq!(config.render.fps, 30);
        assert_eq!(config.render.frames, 50);
        assert_eq!(config.render.interval_ms, 20);
        assert_eq!(config.render.dpi, 150);
        assert_eq!(config.render.title, "Sensor Displacement");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = AppConfig::from_json(r#"{"render":{"fps":60}}"#).unwrap();
        assert_eq!(config.render.fps, 60);
        assert_eq!(config.render.frames, 50);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_config_serialization() {
        let json = serde_json::to_string(&AppConfig::default()).unwrap();
        let parsed = AppConfig::from_json(&json).unwrap();
        assert!((parsed.render.width_in - 6.4).abs() < 1e-9);
    }
}
