//! Host configuration.
//!
//! Simulation rate, the agent's walk and the streaming parameters under
//! `[world]`. Configuration can be loaded from and saved to a file.

use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use verdant_common::{ConfigError, ConfigResult};
use verdant_world::{BlueprintId, StreamingConfig};

/// Configuration file name.
pub const CONFIG_FILE: &str = "verdant.toml";

/// Longest accepted run, in simulated seconds (30 days).
const MAX_DURATION_SECS: f64 = 30.0 * 24.0 * 3600.0;

/// Longest accepted gap between status lines, in simulated seconds.
const MAX_REPORT_INTERVAL_SECS: f64 = 3600.0;

/// Host configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Simulation ===
    /// Fixed ticks per simulated second
    pub tick_rate: u32,
    /// Pace ticks to wall-clock time instead of running flat out
    pub realtime: bool,
    /// Simulated seconds to run (0 = until the walk is finished)
    pub duration_secs: f64,
    /// Seconds of simulated time between status lines
    pub report_interval_secs: f64,

    // === Agent ===
    /// Place the agent at the centre of the origin chunk before the first tick
    pub start_at_origin: bool,
    /// Walking speed in world units per second
    pub agent_speed: f32,
    /// Points the agent walks through, in order
    pub waypoints: Vec<Vec2>,

    // === World ===
    /// Streaming parameters
    pub world: StreamingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            realtime: false,
            duration_secs: 0.0,
            report_interval_secs: 5.0,

            start_at_origin: true,
            agent_speed: 240.0,
            waypoints: vec![
                Vec2::new(2000.0, 0.0),
                Vec2::new(2000.0, 2000.0),
                Vec2::new(-1500.0, 800.0),
                Vec2::new(128.0, 128.0),
            ],

            world: StreamingConfig {
                prefill_on_activation: true,
                blueprints: ["meadow", "grove", "quarry", "marsh"]
                    .into_iter()
                    .map(BlueprintId::from)
                    .collect(),
                ..Default::default()
            },
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse config file: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, contents).map_err(io_error)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(1, 240);

        if !self.duration_secs.is_finite() || self.duration_secs < 0.0 {
            warn!("Invalid duration {}, running until the walk ends", self.duration_secs);
            self.duration_secs = 0.0;
        }
        if self.duration_secs > MAX_DURATION_SECS {
            warn!("Duration {} too long, using {MAX_DURATION_SECS}", self.duration_secs);
            self.duration_secs = MAX_DURATION_SECS;
        }
        if !self.report_interval_secs.is_finite() || self.report_interval_secs <= 0.0 {
            self.report_interval_secs = 5.0;
        } else if self.report_interval_secs > MAX_REPORT_INTERVAL_SECS {
            warn!(
                "Report interval {} too long, using {MAX_REPORT_INTERVAL_SECS}",
                self.report_interval_secs
            );
            self.report_interval_secs = MAX_REPORT_INTERVAL_SECS;
        }

        if !self.agent_speed.is_finite() || self.agent_speed < 0.0 {
            warn!("Invalid agent speed {}, using 240", self.agent_speed);
            self.agent_speed = 240.0;
        }

        let before = self.waypoints.len();
        self.waypoints.retain(|p| p.is_finite());
        if self.waypoints.len() != before {
            warn!("Dropped {} non-finite waypoints", before - self.waypoints.len());
        }

        self.world.validate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_rate, 60);
        assert!(config.start_at_origin);
        assert!(config.world.prefill_on_activation);
        assert_eq!(config.world.blueprints.len(), 4);
        assert_eq!(config.world.world_seed, 12345);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig {
            tick_rate: 0,
            duration_secs: -3.0,
            agent_speed: f32::INFINITY,
            waypoints: vec![Vec2::new(f32::NAN, 0.0), Vec2::ONE],
            ..Default::default()
        };
        config.world.view_radius = 50;

        config.validate();

        assert_eq!(config.tick_rate, 1);
        assert!(config.duration_secs.abs() < f64::EPSILON);
        assert!((config.agent_speed - 240.0).abs() < f32::EPSILON);
        assert_eq!(config.waypoints, vec![Vec2::ONE]);
        assert_eq!(config.world.view_radius, config.world.max_view_radius);
    }

    #[test]
    fn test_huge_durations_are_clamped() {
        let mut config = EngineConfig {
            duration_secs: 1e30,
            report_interval_secs: 1e300,
            ..Default::default()
        };

        config.validate();

        assert!((config.duration_secs - MAX_DURATION_SECS).abs() < f64::EPSILON);
        assert!((config.report_interval_secs - MAX_REPORT_INTERVAL_SECS).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("verdant.toml");

        let mut config = EngineConfig::default();
        config.tick_rate = 30;
        config.waypoints = vec![Vec2::new(512.0, -256.0)];
        config.world.world_seed = 99;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/verdant.toml");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_toml_sections() {
        let config: EngineConfig = toml::from_str(
            r#"
            tick_rate = 20
            waypoints = [[0.0, 0.0], [300.0, 10.0]]

            [world]
            world_seed = 7
            view_radius = 1
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.tick_rate, 20);
        assert_eq!(config.waypoints[1], Vec2::new(300.0, 10.0));
        assert_eq!(config.world.world_seed, 7);
        assert_eq!(config.world.view_radius, 1);
        // Missing [world] keys fall back to the library defaults.
        assert_eq!(config.world.eviction_buffer, 2);
    }
}
