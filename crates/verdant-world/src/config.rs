//! Streaming configuration.
//!
//! Every option the controller recognises, with defaults. Configuration can
//! be loaded from and saved to a TOML file. Out-of-range values are clamped
//! by [`StreamingConfig::validate`] rather than rejected.

use std::fs;
use std::path::Path;
use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use verdant_common::{is_valid_chunk_size, ConfigError, ConfigResult, WorldSeed};

use crate::catalog::{BlueprintId, TemplateCatalog};
use crate::scatter::ScatterConfig;

/// Default chunk size in world units.
pub const DEFAULT_CHUNK_SIZE: f32 = 256.0;

/// Default view radius in chunks.
pub const DEFAULT_VIEW_RADIUS: u32 = 3;

/// Default seconds between eviction scans.
pub const DEFAULT_EVICTION_INTERVAL_SECS: f64 = 5.0;

/// Longest accepted eviction interval in seconds.
pub const MAX_EVICTION_INTERVAL_SECS: f64 = 3600.0;

/// Largest accepted view radius in chunk rings.
pub const MAX_VIEW_RADIUS: u32 = 16;

/// Streaming parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    // === World ===
    /// World seed
    pub world_seed: u64,
    /// Chunk size in world units `[width, height]`
    pub chunk_size: Vec2,

    // === Radii ===
    /// Base view radius in chunk rings
    pub view_radius: u32,
    /// Upper bound for the base view radius
    pub max_view_radius: u32,
    /// Radius used while shedding load
    pub min_view_radius: u32,

    // === Budgets ===
    /// Ceiling on live chunks
    pub max_live_chunks: usize,
    /// Seconds between eviction scans (0 = every tick)
    pub eviction_interval_secs: f64,
    /// Extra Manhattan distance beyond the view radius before eviction
    pub eviction_buffer: u32,
    /// Chunks spawned per tick (0 = unlimited)
    pub max_spawns_per_tick: usize,
    /// Queue the rings around the starting chunk on activation
    pub prefill_on_activation: bool,

    // === Blueprints ===
    /// Blueprint for the origin chunk
    pub origin_blueprint: Option<BlueprintId>,
    /// Tried when the origin blueprint is unset or fails to load
    pub origin_fallback: Option<BlueprintId>,
    /// Generic blueprint pool
    pub blueprints: Vec<BlueprintId>,

    // === Content ===
    /// Decoration scatter
    pub scatter: ScatterConfig,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            world_seed: 12345,
            chunk_size: Vec2::splat(DEFAULT_CHUNK_SIZE),

            view_radius: DEFAULT_VIEW_RADIUS,
            max_view_radius: 5,
            min_view_radius: 1,

            max_live_chunks: 100,
            eviction_interval_secs: DEFAULT_EVICTION_INTERVAL_SECS,
            eviction_buffer: 2,
            max_spawns_per_tick: 0,
            prefill_on_activation: false,

            origin_blueprint: Some(BlueprintId::new("village")),
            origin_fallback: None,
            blueprints: vec![BlueprintId::new("wilds")],

            scatter: ScatterConfig::default(),
        }
    }
}

impl StreamingConfig {
    /// Creates a config with the given seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            world_seed: seed,
            ..Default::default()
        }
    }

    /// Parses a config from TOML text.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serializes the config to TOML text.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Load configuration from a path.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Streaming config {} not found, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded streaming config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("{e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read streaming config: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(path, self.to_toml_string()?).map_err(io_error)?;

        info!("Saved streaming config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to usable ranges.
    pub fn validate(&mut self) {
        if !is_valid_chunk_size(self.chunk_size) {
            warn!(
                "Invalid chunk size {:?}, using {DEFAULT_CHUNK_SIZE}",
                self.chunk_size
            );
            self.chunk_size = Vec2::splat(DEFAULT_CHUNK_SIZE);
        }

        if self.max_view_radius > MAX_VIEW_RADIUS {
            warn!(
                "max_view_radius {} exceeds {MAX_VIEW_RADIUS}, clamping",
                self.max_view_radius
            );
            self.max_view_radius = MAX_VIEW_RADIUS;
        }
        if self.view_radius > self.max_view_radius {
            warn!(
                "view_radius {} exceeds max_view_radius {}, clamping",
                self.view_radius, self.max_view_radius
            );
            self.view_radius = self.max_view_radius;
        }
        self.min_view_radius = self.min_view_radius.min(self.view_radius);

        if self.max_live_chunks == 0 {
            warn!("max_live_chunks must leave room for the origin chunk, using 1");
            self.max_live_chunks = 1;
        }

        if !self.eviction_interval_secs.is_finite() || self.eviction_interval_secs < 0.0 {
            warn!(
                "Invalid eviction interval {}, using {DEFAULT_EVICTION_INTERVAL_SECS}s",
                self.eviction_interval_secs
            );
            self.eviction_interval_secs = DEFAULT_EVICTION_INTERVAL_SECS;
        } else if self.eviction_interval_secs > MAX_EVICTION_INTERVAL_SECS {
            warn!(
                "Eviction interval {}s exceeds {MAX_EVICTION_INTERVAL_SECS}s, clamping",
                self.eviction_interval_secs
            );
            self.eviction_interval_secs = MAX_EVICTION_INTERVAL_SECS;
        }

        self.scatter.validate();
    }

    /// Returns the world seed.
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        WorldSeed::new(self.world_seed)
    }

    /// Returns the eviction scan interval. Values `Duration` cannot hold
    /// fall back to the default.
    #[must_use]
    pub fn eviction_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.eviction_interval_secs)
            .unwrap_or(Duration::from_secs(5))
    }

    /// Builds the template catalog described by this config.
    #[must_use]
    pub fn catalog(&self) -> TemplateCatalog {
        TemplateCatalog::new(self.origin_blueprint.clone(), self.blueprints.clone())
            .with_origin_fallback(self.origin_fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = StreamingConfig::default();
        assert_eq!(config.world_seed, 12345);
        assert_eq!(config.chunk_size, Vec2::new(256.0, 256.0));
        assert_eq!(config.view_radius, 3);
        assert_eq!(config.eviction_buffer, 2);
        assert_eq!(config.eviction_interval(), Duration::from_secs(5));
        assert_eq!(config.catalog().origin().map(BlueprintId::as_str), Some("village"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = StreamingConfig {
            chunk_size: Vec2::new(0.0, 256.0),
            view_radius: 9,
            max_view_radius: 4,
            min_view_radius: 6,
            max_live_chunks: 0,
            eviction_interval_secs: f64::NAN,
            ..Default::default()
        };

        config.validate();

        assert_eq!(config.chunk_size, Vec2::splat(256.0));
        assert_eq!(config.view_radius, 4);
        assert_eq!(config.min_view_radius, 4);
        assert_eq!(config.max_live_chunks, 1);
        assert!((config.eviction_interval_secs - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_huge_values_are_clamped() {
        let mut config = StreamingConfig {
            eviction_interval_secs: 1e30,
            max_view_radius: 10_000,
            view_radius: 5_000,
            ..Default::default()
        };
        assert_eq!(config.eviction_interval(), Duration::from_secs(5));

        config.validate();

        assert!((config.eviction_interval_secs - MAX_EVICTION_INTERVAL_SECS).abs() < f64::EPSILON);
        assert_eq!(config.eviction_interval(), Duration::from_secs(3600));
        assert_eq!(config.max_view_radius, MAX_VIEW_RADIUS);
        assert_eq!(config.view_radius, MAX_VIEW_RADIUS);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = StreamingConfig::from_toml_str(
            r#"
            world_seed = 777
            view_radius = 2
            blueprints = ["meadow", "grove"]

            [scatter]
            edge_padding = 8.0

            [scatter.bands]
            dense_probability = 0.5
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.world_seed, 777);
        assert_eq!(config.view_radius, 2);
        assert_eq!(config.blueprints.len(), 2);
        assert_eq!(config.max_view_radius, 5);
        assert!((config.scatter.edge_padding - 8.0).abs() < f32::EPSILON);
        assert!((config.scatter.bands.dense_probability - 0.5).abs() < f32::EPSILON);
        assert!((config.scatter.bands.sparse_probability - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.origin_blueprint, Some(BlueprintId::new("village")));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let result = StreamingConfig::from_toml_str("view_radius = \"far\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("world").join("streaming.toml");

        let mut config = StreamingConfig::with_seed(42);
        config.chunk_size = Vec2::new(128.0, 64.0);
        config.max_spawns_per_tick = 4;
        config.prefill_on_activation = true;
        config.origin_fallback = Some(BlueprintId::new("village_ruins"));

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = StreamingConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = StreamingConfig::load_from("/nonexistent/path/streaming.toml");
        assert_eq!(config, StreamingConfig::default());
    }
}
