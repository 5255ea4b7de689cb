use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::error::{AtlasError, Result};

/// Map settings, loadable from a JSON file; every field has a default.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    /// Width of the surface the projection is first fitted to.
    pub map_width: f64,
    /// Height of the surface the projection is first fitted to.
    pub map_height: f64,
    /// Fraction of the viewport the fitted shapes may occupy.
    pub padding: f64,
    /// Length of the fill fade after a filter change.
    pub transition_ms: u64,
    pub min_stroke: f64,
    pub max_stroke: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            map_width: 960.0,
            map_height: 550.0,
            padding: 0.96,
            transition_ms: 500,
            min_stroke: 0.8,
            max_stroke: 4.0,
        }
    }
}

impl MapConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let bytes = fs::read(path).map_err(|source| AtlasError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_slice(&bytes).map_err(|source| AtlasError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.check().map_err(|reason| AtlasError::ConfigValue {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    /// Rejects values that would collapse or invert the map.
    fn check(&self) -> std::result::Result<(), String> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.map_width) || !positive(self.map_height) {
            return Err(format!(
                "map size must be positive, got {}x{}",
                self.map_width, self.map_height
            ));
        }
        if !positive(self.padding) || self.padding > 1.0 {
            return Err(format!("padding must be in (0, 1], got {}", self.padding));
        }
        if !positive(self.min_stroke) || !self.max_stroke.is_finite() || self.min_stroke > self.max_stroke {
            return Err(format!(
                "stroke range {}..{} is not a positive increasing range",
                self.min_stroke, self.max_stroke
            ));
        }
        Ok(())
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }
}
