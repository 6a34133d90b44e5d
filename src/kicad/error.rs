//! Error types for KiCad file operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::sexpr::SyntaxError;

/// Result type for KiCad operations.
pub type KicadResult<T> = Result<T, KicadError>;

/// Errors that can occur while reading KiCad libraries and boards.
#[derive(Debug, Error)]
pub enum KicadError {
    /// Failed to open or read a file.
    #[error("Failed to read file: {path}")]
    FileRead {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Malformed s-expression text.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// Well-formed s-expression that is not the expected document.
    #[error("Invalid structure: {message}")]
    InvalidStructure {
        /// Description of what's wrong.
        message: String,
    },

    /// A file was read but could not be parsed.
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// Path to the file.
        path: PathBuf,
        /// Description of what's wrong.
        message: String,
    },

    /// Footprint library directory does not exist.
    #[error("Footprint library not found: {path}")]
    LibraryNotFound {
        /// Resolved library path.
        path: PathBuf,
    },

    /// Footprint not present in the library.
    #[error("Footprint '{name}' not found in {library}")]
    FootprintNotFound {
        /// Library directory that was searched.
        library: PathBuf,
        /// Requested footprint name.
        name: String,
    },

    /// Library nickname missing from a loaded library table.
    #[error("Library '{nickname}' is not listed in the footprint library table")]
    UnknownLibrary {
        /// The nickname that was looked up.
        nickname: String,
    },

    /// Library nickname lookup against a table that could not be loaded.
    #[error("Cannot resolve library '{nickname}': library table {path} unavailable ({reason})")]
    LibraryTableUnavailable {
        /// The nickname that was looked up.
        nickname: String,
        /// Where the table was expected.
        path: PathBuf,
        /// Why it could not be loaded.
        reason: String,
    },

    /// A board footprint carries no library nickname.
    #[error("Footprint '{footprint}' has no library nickname")]
    MissingLibrary {
        /// Footprint identifier as written on the board.
        footprint: String,
    },
}

impl KicadError {
    /// Creates a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Attaches a file path to a parse failure.
    pub fn parse(path: impl Into<PathBuf>, error: &Self) -> Self {
        Self::Parse {
            path: path.into(),
            message: error.to_string(),
        }
    }
}
