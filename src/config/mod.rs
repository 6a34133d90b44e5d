//! Run configuration: path variables and footprint library tables.
//!
//! A [`Config`] is built once at the start of a run and passed by reference
//! to everything that resolves paths. Loading never fails: a missing or
//! broken KiCad configuration degrades to environment defaults and an
//! unavailable library table, with a warning.
//!
//! # Sources
//!
//! 1. Process environment (`KICAD8_FOOTPRINT_DIR`, `KICAD8_3DMODEL_DIR`),
//!    falling back to the stock install locations.
//! 2. `<config dir>/kicad_common.json` → `environment.vars`, overriding (1).
//! 3. `<config dir>/fp-lib-table`, the global footprint library table.
//! 4. In board mode, `<project dir>/fp-lib-table`, with `${KIPRJMOD}` set to
//!    the project directory. Its entries take precedence over (3).
//!
//! The config dir defaults to KiCad's per-user directory:
//! - **Linux:** `~/.config/kicad/8.0`
//! - **macOS:** `~/Library/Preferences/kicad/8.0`
//! - **Windows:** `%APPDATA%\kicad\8.0`

mod settings;
mod template;

pub use settings::{load_common, EnvironmentSettings, KicadCommon};
pub use template::TemplateVars;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::kicad::{KicadError, KicadResult, LibraryTable};

/// Variable naming the footprint library root.
pub const FOOTPRINT_DIR_VAR: &str = "KICAD8_FOOTPRINT_DIR";
/// Variable naming the 3D model root.
pub const MODEL_DIR_VAR: &str = "KICAD8_3DMODEL_DIR";
/// Variable naming the current project directory.
pub const PROJECT_DIR_VAR: &str = "KIPRJMOD";

/// Stock footprint library root.
pub const DEFAULT_FOOTPRINT_DIR: &str = "/usr/share/kicad/footprints";
/// Stock 3D model root.
pub const DEFAULT_MODEL_DIR: &str = "/usr/share/kicad/3dmodels";

/// File name of footprint library tables.
pub const LIBRARY_TABLE_FILE: &str = "fp-lib-table";
/// File name of KiCad's common settings.
pub const COMMON_SETTINGS_FILE: &str = "kicad_common.json";

/// Returns KiCad's per-user configuration directory.
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::preference_dir().map(|p| p.join("kicad").join("8.0"))
}

/// Builds the default variable set from an environment lookup.
///
/// Only the footprint and model roots are taken from the environment.
pub fn default_vars(lookup: impl Fn(&str) -> Option<String>) -> TemplateVars {
    let mut vars = TemplateVars::new();
    vars.insert(
        MODEL_DIR_VAR,
        lookup(MODEL_DIR_VAR).unwrap_or_else(|| DEFAULT_MODEL_DIR.to_string()),
    );
    vars.insert(
        FOOTPRINT_DIR_VAR,
        lookup(FOOTPRINT_DIR_VAR).unwrap_or_else(|| DEFAULT_FOOTPRINT_DIR.to_string()),
    );
    vars
}

/// State of the global footprint library table.
#[derive(Debug, Clone)]
pub enum LibraryTableState {
    /// The table was read successfully.
    Loaded(LibraryTable),
    /// The table could not be read; every lookup against it fails.
    Unavailable {
        /// Where the table was expected.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
    },
}

impl LibraryTableState {
    /// Loads a table, recording the failure instead of returning it.
    fn load(path: PathBuf, vars: &TemplateVars) -> Self {
        match LibraryTable::load(&path, vars) {
            Ok(table) => {
                tracing::debug!(path = %path.display(), count = table.len(), "Loaded library table");
                Self::Loaded(table)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Library table unavailable");
                Self::Unavailable {
                    path,
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Configuration for one conversion run.
#[derive(Debug, Clone)]
pub struct Config {
    vars: TemplateVars,
    library_table: LibraryTableState,
    project_table: Option<LibraryTable>,
}

impl Config {
    /// Creates a configuration from already-loaded parts.
    #[must_use]
    pub const fn new(vars: TemplateVars, library_table: LibraryTableState) -> Self {
        Self {
            vars,
            library_table,
            project_table: None,
        }
    }

    /// Loads the configuration from the process environment and a KiCad
    /// configuration directory.
    ///
    /// If `config_dir` is `None`, [`default_config_dir`] is used.
    #[must_use]
    pub fn load(config_dir: Option<&Path>) -> Self {
        let config_dir = config_dir
            .map(Path::to_path_buf)
            .or_else(default_config_dir);

        let mut vars = default_vars(|name| std::env::var(name).ok());

        let Some(dir) = config_dir else {
            tracing::warn!("No KiCad configuration directory; using environment defaults");
            return Self::new(
                vars,
                LibraryTableState::Unavailable {
                    path: PathBuf::from(LIBRARY_TABLE_FILE),
                    reason: "no configuration directory".to_string(),
                },
            );
        };

        match load_common(&dir.join(COMMON_SETTINGS_FILE)) {
            Ok(common) => vars.extend(common.vars()),
            Err(ConfigError::NotFound { path }) => {
                tracing::debug!(path = %path.display(), "No kicad_common.json");
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring KiCad common settings"),
        }
        tracing::debug!(vars = ?vars, "Loaded path variables");

        let library_table = LibraryTableState::load(dir.join(LIBRARY_TABLE_FILE), &vars);
        Self::new(vars, library_table)
    }

    /// Adds project context: sets `${KIPRJMOD}` and overlays the project's
    /// own library table when one exists.
    #[must_use]
    pub fn with_project(mut self, project_dir: &Path) -> Self {
        self.vars
            .insert(PROJECT_DIR_VAR, project_dir.to_string_lossy().into_owned());

        let table_path = project_dir.join(LIBRARY_TABLE_FILE);
        if table_path.is_file() {
            match LibraryTable::load(&table_path, &self.vars) {
                Ok(table) => {
                    tracing::debug!(
                        path = %table_path.display(),
                        count = table.len(),
                        "Loaded project library table"
                    );
                    self.project_table = Some(table);
                }
                Err(e) => {
                    tracing::warn!(path = %table_path.display(), error = %e, "Ignoring project library table");
                }
            }
        }
        self
    }

    /// Path variables for this run.
    #[must_use]
    pub const fn vars(&self) -> &TemplateVars {
        &self.vars
    }

    /// The global library table state.
    #[must_use]
    pub const fn library_table(&self) -> &LibraryTableState {
        &self.library_table
    }

    /// Root directory of the stock footprint libraries.
    #[must_use]
    pub fn footprint_dir(&self) -> PathBuf {
        PathBuf::from(
            self.vars
                .get(FOOTPRINT_DIR_VAR)
                .unwrap_or(DEFAULT_FOOTPRINT_DIR),
        )
    }

    /// Looks up a library nickname in the project and global tables.
    ///
    /// # Errors
    ///
    /// Returns [`KicadError::UnknownLibrary`] if the nickname is in neither
    /// table, or [`KicadError::LibraryTableUnavailable`] if the global table
    /// could not be loaded and the project table does not list it.
    pub fn library_location(&self, nickname: &str) -> KicadResult<PathBuf> {
        if let Some(entry) = self
            .project_table
            .as_ref()
            .and_then(|table| table.get(nickname))
        {
            return Ok(entry.location());
        }

        match &self.library_table {
            LibraryTableState::Loaded(table) => table
                .get(nickname)
                .map(|entry| entry.location())
                .ok_or_else(|| KicadError::UnknownLibrary {
                    nickname: nickname.to_string(),
                }),
            LibraryTableState::Unavailable { path, reason } => {
                Err(KicadError::LibraryTableUnavailable {
                    nickname: nickname.to_string(),
                    path: path.clone(),
                    reason: reason.clone(),
                })
            }
        }
    }

    /// Like [`Config::library_location`], but `None` instead of an error.
    #[must_use]
    pub fn try_library_location(&self, nickname: &str) -> Option<PathBuf> {
        self.library_location(nickname).ok()
    }
}
