//! Error types for kicad-openpnp.
//!
//! Configuration and model errors are recoverable: the caller logs them and
//! degrades to defaults. KiCad and XML errors abort the run before any output
//! is written.

use std::path::PathBuf;

use thiserror::Error;

use crate::kicad::KicadError;
use crate::openpnp::xml::XmlError;

/// Top-level error returned by the conversion entry points.
#[derive(Error, Debug)]
pub enum Error {
    /// Loading a footprint, board or library failed.
    #[error(transparent)]
    Kicad(#[from] KicadError),

    /// Reading or merging an existing packages file failed.
    #[error(transparent)]
    Xml(#[from] XmlError),
}

/// Errors that can occur while loading KiCad configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// A library table could not be parsed.
    #[error("invalid library table {path}: {message}")]
    InvalidLibraryTable {
        /// Path to the table.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },
}

/// Errors raised while measuring a 3D model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The model format cannot be analysed.
    #[error("unsupported model format: {path} (only .step/.stp files are supported)")]
    UnsupportedFormat {
        /// Resolved model path.
        path: PathBuf,
    },

    /// The model file could not be read.
    #[error("failed to read model file: {path}")]
    ReadError {
        /// Resolved model path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The STEP data is malformed.
    #[error("malformed STEP data: {message}")]
    Step {
        /// Description of the problem.
        message: String,
    },

    /// The model contains no usable geometry.
    #[error("model has no geometry to measure")]
    Empty,
}

impl ModelError {
    /// Creates a STEP syntax error.
    pub fn step(message: impl Into<String>) -> Self {
        Self::Step {
            message: message.into(),
        }
    }
}
