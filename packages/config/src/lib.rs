#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Application configuration.
//!
//! The defaults live in `config/default.toml`, embedded at compile time via
//! [`include_str!`]. A user file is merged over them key by key, so it only
//! needs the values it changes. Arrays (the basemap catalogue) are replaced
//! wholesale.

use std::path::{Path, PathBuf};

use field_map_editor::DefaultColors;
use field_map_geometry_models::Point;
use field_map_measure::MeasurementConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The embedded default configuration.
const DEFAULT_TOML: &str = include_str!("../config/default.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The initial map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Id of the basemap shown at start-up.
    pub initial_basemap: String,
    /// Viewport centre at start-up; new waypoints start here.
    pub initial_center: Point,
    pub initial_zoom: f64,
}

/// One entry of the basemap style switcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Basemap {
    pub id: String,
    /// Label on the switcher button.
    pub name: String,
    /// Style URL handed to the renderer.
    pub url: String,
    /// Terrain exaggeration for 3D styles; 2D styles have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terrain_exaggeration: Option<f64>,
}

impl Basemap {
    #[must_use]
    pub const fn is_3d(&self) -> bool {
        self.terrain_exaggeration.is_some()
    }
}

/// Everything configurable about the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub measurement: MeasurementConfig,
    pub defaults: DefaultColors,
    pub map: MapConfig,
    pub basemaps: Vec<Basemap>,
}

impl AppConfig {
    /// Looks up a basemap by id.
    #[must_use]
    pub fn basemap(&self, id: &str) -> Option<&Basemap> {
        self.basemaps.iter().find(|basemap| basemap.id == id)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Serialize`] if serialization fails
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks the constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Invalid`] describing the first violation found
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.measurement.large_unit_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "measurement.large_unit_threshold must be positive, got {threshold}"
            )));
        }

        if !self.map.initial_center.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "map.initial_center is not a valid coordinate: {}",
                self.map.initial_center
            )));
        }

        let mut ids: Vec<&str> = self.basemaps.iter().map(|b| b.id.as_str()).collect();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::Invalid(format!(
                "duplicate basemap id {:?}",
                pair[0]
            )));
        }

        if self.basemap(&self.map.initial_basemap).is_none() {
            return Err(ConfigError::Invalid(format!(
                "map.initial_basemap {:?} is not in basemaps",
                self.map.initial_basemap
            )));
        }

        Ok(())
    }
}

/// Parses a configuration from TOML, filling omitted keys from the
/// embedded defaults.
///
/// # Errors
///
/// * [`ConfigError::Parse`] if either document is malformed or a value
///   has the wrong type (including unknown colours and units)
/// * [`ConfigError::Invalid`] if validation fails
pub fn parse(overrides: &str) -> Result<AppConfig, ConfigError> {
    let mut table: toml::Table = DEFAULT_TOML.parse()?;
    merge(&mut table, overrides.parse()?);

    let config: AppConfig = toml::Value::Table(table).try_into()?;
    config.validate()?;
    Ok(config)
}

/// Loads the configuration: the embedded defaults, with the file at `path`
/// merged over them when given.
///
/// # Errors
///
/// * [`ConfigError::Io`] if the file cannot be read
/// * the errors of [`parse`]
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let Some(path) = path else {
        log::debug!("Using embedded configuration");
        return parse("");
    };

    log::info!("Loading configuration from {}", path.display());
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse(&contents)
}

fn merge(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge(existing, nested);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
