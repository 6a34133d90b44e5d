//! `kicad_common.json` structures for deserialisation.
//!
//! Only the `environment` block is read. KiCad writes many other sections
//! into this file, so unknown fields are ignored rather than rejected.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;

/// Root of KiCad's `kicad_common.json`.
#[derive(Debug, Default, Deserialize)]
pub struct KicadCommon {
    /// Path variable settings.
    #[serde(default)]
    pub environment: EnvironmentSettings,
}

impl KicadCommon {
    /// Returns the user-defined path variables, if any.
    #[must_use]
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.environment
            .vars
            .iter()
            .flatten()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The `environment` block of `kicad_common.json`.
#[derive(Debug, Default, Deserialize)]
pub struct EnvironmentSettings {
    /// User-defined path variables. KiCad writes `null` when none are set.
    #[serde(default)]
    pub vars: Option<IndexMap<String, String>>,
}

/// Reads and parses a `kicad_common.json` file.
///
/// # Errors
///
/// Returns an error if the file does not exist, cannot be read, or is not
/// valid JSON of the expected shape.
pub fn load_common(path: &Path) -> Result<KicadCommon, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}
