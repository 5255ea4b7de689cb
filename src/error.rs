use std::path::PathBuf;

use thiserror::Error;

/// Failures that can stop the atlas before the map is on screen.
///
/// Once data is loaded nothing in the map engine fails: missing shapes,
/// missing aggregates and degenerate scales all fall back to a neutral
/// rendering instead.
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid GeoJSON in {}: {source}", path.display())]
    GeoJson {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },

    #[error("{} is not a GeoJSON FeatureCollection", path.display())]
    NotFeatureCollection { path: PathBuf },

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config {}: {reason}", path.display())]
    ConfigValue { path: PathBuf, reason: String },

    #[error("invalid TopoJSON in {}: {reason}", path.display())]
    Topology { path: PathBuf, reason: String },

    #[error("logger setup failed: {0}")]
    Logger(String),

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AtlasError>;
