use std::path::Path;

use pixboard_shared::Color;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::scheduler::SchedulerConfig;
use crate::windowing::DEFAULT_PREFETCH_MARGIN;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:1001";
pub const DEFAULT_TILE_SIDE: u32 = 1024;
pub const MAX_PREFETCH_MARGIN: u32 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the canvas service.
    pub endpoint: String,
    pub tile_side: u32,
    pub prefetch_margin: u32,
    /// Tiles further than this many tiles outside the current window are
    /// forgotten. `None` keeps every tile for the whole session.
    pub tile_eviction_radius: Option<u32>,
    /// Zoom range the camera is held to, in screen pixels per world pixel.
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// How far before session start the first poll looks back.
    pub initial_lookback_secs: u64,
    pub background: Color,
    pub scheduler: SchedulerConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            tile_side: DEFAULT_TILE_SIDE,
            prefetch_margin: DEFAULT_PREFETCH_MARGIN,
            tile_eviction_radius: None,
            min_zoom: 1.0,
            max_zoom: 70.0,
            initial_lookback_secs: 0,
            background: Color::rgba(255, 240, 229, 255),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: SyncConfig = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        debug!("Loaded sync config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_side == 0 {
            return Err(ConfigError::InvalidTiles {
                reason: "tile_side must be > 0".into(),
            });
        }
        if self.prefetch_margin > MAX_PREFETCH_MARGIN {
            return Err(ConfigError::InvalidTiles {
                reason: format!(
                    "prefetch_margin {} exceeds {MAX_PREFETCH_MARGIN}",
                    self.prefetch_margin
                ),
            });
        }
        if !(self.min_zoom.is_finite() && self.max_zoom.is_finite() && self.min_zoom > 0.0) {
            return Err(ConfigError::InvalidZoom {
                reason: format!("min_zoom {} and max_zoom {} must be finite and > 0", self.min_zoom, self.max_zoom),
            });
        }
        if self.min_zoom > self.max_zoom {
            return Err(ConfigError::InvalidZoom {
                reason: format!("min_zoom {} exceeds max_zoom {}", self.min_zoom, self.max_zoom),
            });
        }
        self.scheduler.validate()
    }
}
