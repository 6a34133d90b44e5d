//! Footprint library tables and `.pretty` library access.
//!
//! # Library table format
//!
//! ```text
//! (fp_lib_table
//!   (version 7)
//!   (lib (name "Resistor_SMD")(type "KiCad")(uri "${KICAD8_FOOTPRINT_DIR}/Resistor_SMD.pretty")(options "")(descr "Resistors"))
//! )
//! ```
//!
//! A `.pretty` library is a directory holding one `<name>.kicad_mod` file per
//! footprint.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use super::error::{KicadError, KicadResult};
use super::footprint::{Footprint, LibId};
use super::sexpr::{self, Sexpr};
use crate::config::TemplateVars;
use crate::error::ConfigError;

/// Extension of footprint library directories.
pub const LIBRARY_EXTENSION: &str = "pretty";
/// Extension of footprint files.
pub const FOOTPRINT_EXTENSION: &str = "kicad_mod";

/// One `lib` row of a library table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    /// Nickname.
    pub name: String,
    /// Plugin type, normally "KiCad".
    pub lib_type: String,
    /// Location with path variables already substituted.
    pub uri: String,
    /// Plugin options.
    pub options: String,
    /// Description.
    pub descr: String,
}

impl LibraryEntry {
    /// Filesystem location of the library.
    #[must_use]
    pub fn location(&self) -> PathBuf {
        PathBuf::from(&self.uri)
    }

    fn from_node(node: &Sexpr, vars: &TemplateVars) -> KicadResult<Self> {
        let field = |tag: &str| node.value_of(tag).map(ToString::to_string);

        let name = field("name")
            .ok_or_else(|| KicadError::invalid_structure("lib entry without name"))?;
        let uri = field("uri").ok_or_else(|| {
            KicadError::invalid_structure(format!("lib entry '{name}' without uri"))
        })?;

        Ok(Self {
            uri: vars.expand(&uri),
            lib_type: field("type").unwrap_or_else(|| "KiCad".to_string()),
            options: field("options").unwrap_or_default(),
            descr: field("descr").unwrap_or_default(),
            name,
        })
    }
}

/// A footprint library table: nickname → library location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryTable {
    entries: IndexMap<String, LibraryEntry>,
}

impl LibraryTable {
    /// Parses table text, substituting path variables in every `uri`.
    ///
    /// # Errors
    ///
    /// Fails on malformed syntax, a root other than `fp_lib_table`, or any
    /// `lib` entry missing its name or uri.
    pub fn parse(text: &str, vars: &TemplateVars) -> KicadResult<Self> {
        let root = sexpr::parse(text)?;
        if !root.is("fp_lib_table") {
            return Err(KicadError::invalid_structure(format!(
                "expected fp_lib_table, found '{}'",
                root.tag().unwrap_or("<atom>")
            )));
        }

        let mut table = Self::default();
        for node in root.find_all("lib") {
            let entry = LibraryEntry::from_node(node, vars)?;
            if entry.lib_type != "KiCad" {
                tracing::debug!(
                    library = %entry.name,
                    lib_type = %entry.lib_type,
                    "Library type is not KiCad; footprints may not load"
                );
            }
            table.insert(entry);
        }
        Ok(table)
    }

    /// Reads and parses a table file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is absent, unreadable, or malformed.
    pub fn load(path: &Path, vars: &TemplateVars) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&text, vars).map_err(|e| ConfigError::InvalidLibraryTable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, entry: LibraryEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    /// Looks up a nickname.
    #[must_use]
    pub fn get(&self, nickname: &str) -> Option<&LibraryEntry> {
        self.entries.get(nickname)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = &LibraryEntry> {
        self.entries.values()
    }
}

/// Returns `true` if `arg` names a path rather than a library nickname.
#[must_use]
pub fn is_library_path(arg: &str) -> bool {
    arg.ends_with(&format!(".{LIBRARY_EXTENSION}")) || arg.contains('/') || arg.contains('\\')
}

/// Resolves a `--library` argument: paths are used as given, bare
/// nicknames become `<footprint_dir>/<nickname>.pretty`.
#[must_use]
pub fn resolve_library_arg(arg: &str, footprint_dir: &Path) -> PathBuf {
    if is_library_path(arg) {
        PathBuf::from(arg)
    } else {
        footprint_dir.join(format!("{arg}.{LIBRARY_EXTENSION}"))
    }
}

/// A `.pretty` footprint library directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootprintLibrary {
    path: PathBuf,
    nickname: String,
}

impl FootprintLibrary {
    /// Opens a library, naming it after its directory stem.
    ///
    /// # Errors
    ///
    /// Returns [`KicadError::LibraryNotFound`] if `path` is not a directory.
    pub fn open(path: impl Into<PathBuf>) -> KicadResult<Self> {
        let path = path.into();
        let nickname = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::with_nickname(path, nickname)
    }

    /// Opens a library under an explicit nickname.
    ///
    /// # Errors
    ///
    /// Returns [`KicadError::LibraryNotFound`] if `path` is not a directory.
    pub fn with_nickname(path: impl Into<PathBuf>, nickname: impl Into<String>) -> KicadResult<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(KicadError::LibraryNotFound { path });
        }
        Ok(Self {
            path,
            nickname: nickname.into(),
        })
    }

    /// Library directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Library nickname.
    #[must_use]
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Path of a footprint's file inside the library.
    #[must_use]
    pub fn footprint_path(&self, name: &str) -> PathBuf {
        self.path.join(format!("{name}.{FOOTPRINT_EXTENSION}"))
    }

    /// Loads a footprint. Its identifier is qualified with this library's
    /// nickname.
    ///
    /// # Errors
    ///
    /// Returns an error if the footprint file is missing, unreadable or
    /// malformed.
    pub fn load(&self, name: &str) -> KicadResult<Footprint> {
        let path = self.footprint_path(name);
        if !path.is_file() {
            return Err(KicadError::FootprintNotFound {
                library: self.path.clone(),
                name: name.to_string(),
            });
        }

        let text = std::fs::read_to_string(&path).map_err(|e| KicadError::file_read(&path, e))?;
        let mut footprint = Footprint::parse(&text).map_err(|e| KicadError::parse(&path, &e))?;

        let nickname = (!self.nickname.is_empty()).then(|| self.nickname.clone());
        footprint.lib_id = LibId::new(nickname, name);

        tracing::debug!(
            path = %path.display(),
            footprint = %footprint.lib_id,
            "Loaded footprint"
        );

        Ok(footprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"(fp_lib_table
  (version 7)
  (lib (name "Resistor_SMD")(type "KiCad")(uri "${KICAD8_FOOTPRINT_DIR}/Resistor_SMD.pretty")(options "")(descr "Resistors"))
  (lib (name "Mine")(type "KiCad")(uri "/home/user/Mine.pretty")(options "")(descr ""))
)"#;

    fn vars() -> TemplateVars {
        [("KICAD8_FOOTPRINT_DIR", "/usr/share/kicad/footprints")]
            .into_iter()
            .collect()
    }

    #[test]
    fn parse_table() {
        let table = LibraryTable::parse(TABLE, &vars()).unwrap();
        assert_eq!(table.len(), 2);
        let entry = table.get("Resistor_SMD").unwrap();
        assert_eq!(
            entry.location(),
            PathBuf::from("/usr/share/kicad/footprints/Resistor_SMD.pretty")
        );
        assert_eq!(entry.lib_type, "KiCad");
        assert_eq!(entry.descr, "Resistors");
        assert_eq!(
            table.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            vec!["Resistor_SMD", "Mine"]
        );
    }

    #[test]
    fn unknown_variable_left_in_uri() {
        let table = LibraryTable::parse(TABLE, &TemplateVars::new()).unwrap();
        assert_eq!(
            table.get("Resistor_SMD").unwrap().uri,
            "${KICAD8_FOOTPRINT_DIR}/Resistor_SMD.pretty"
        );
    }

    #[test]
    fn malformed_entry_fails_whole_table() {
        let text = r#"(fp_lib_table (lib (name "A")(uri "/a")) (lib (name "B")))"#;
        let err = LibraryTable::parse(text, &vars()).unwrap_err();
        assert!(err.to_string().contains("without uri"));
    }

    #[test]
    fn wrong_root_rejected() {
        assert!(LibraryTable::parse("(sym_lib_table)", &vars()).is_err());
    }

    #[test]
    fn load_missing_table() {
        let err = LibraryTable::load(Path::new("/nonexistent/fp-lib-table"), &vars()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn library_argument_resolution() {
        let root = Path::new("/usr/share/kicad/footprints");
        assert_eq!(
            resolve_library_arg("Resistor_SMD", root),
            root.join("Resistor_SMD.pretty")
        );
        assert_eq!(
            resolve_library_arg("Local.pretty", root),
            PathBuf::from("Local.pretty")
        );
        assert_eq!(
            resolve_library_arg("./libs/Local", root),
            PathBuf::from("./libs/Local")
        );
    }

    #[test]
    fn load_footprint_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let lib_dir = dir.path().join("Test.pretty");
        std::fs::create_dir(&lib_dir).unwrap();
        std::fs::write(
            lib_dir.join("Pad.kicad_mod"),
            r#"(footprint "Pad" (pad "1" smd rect (at 0 0) (size 1 1)))"#,
        )
        .unwrap();

        let library = FootprintLibrary::open(&lib_dir).unwrap();
        assert_eq!(library.nickname(), "Test");

        let fp = library.load("Pad").unwrap();
        assert_eq!(fp.lib_id.to_string(), "Test:Pad");
        assert_eq!(fp.pads.len(), 1);

        assert!(matches!(
            library.load("Missing"),
            Err(KicadError::FootprintNotFound { .. })
        ));
    }

    #[test]
    fn open_missing_library() {
        assert!(matches!(
            FootprintLibrary::open("/nonexistent/X.pretty"),
            Err(KicadError::LibraryNotFound { .. })
        ));
    }

    #[test]
    fn malformed_footprint_reports_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Bad.kicad_mod"), "(footprint \"Bad\"").unwrap();
        let library = FootprintLibrary::with_nickname(dir.path(), "Lib").unwrap();
        let err = library.load("Bad").unwrap_err();
        assert!(err.to_string().contains("Bad.kicad_mod"));
    }
}
