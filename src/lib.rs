//! kicad-openpnp: KiCad footprints to OpenPnP packages
//!
//! Converts KiCad footprint geometry into the `<package>` records OpenPnP
//! keeps in `packages.xml`, so a pick-and-place job can be set up from the
//! same libraries the board was designed with.
//!
//! # Architecture
//!
//! - **KiCad input**: `.kicad_mod` footprints, `.kicad_pcb` boards and
//!   `fp-lib-table` library tables, read with a small s-expression parser
//! - **Body size**: bounding box of the footprint's STEP model, expressed in
//!   the footprint frame
//! - **OpenPnP output**: one `<package>` per footprint type, optionally
//!   joined into an existing packages file
//!
//! Only SMD pads are written: through-hole parts are not placed by the
//! machine.
//!
//! # Modules
//!
//! - [`config`]: Path variables and library tables
//! - [`error`]: Error types
//! - [`kicad`]: KiCad file formats
//! - [`model`]: 3D model measurement
//! - [`openpnp`]: Package mapping and XML output

pub mod config;
pub mod error;
pub mod kicad;
pub mod model;
pub mod openpnp;

use std::path::Path;

use crate::config::Config;
use crate::error::Error;
use crate::kicad::{
    is_library_path, resolve_library_arg, Board, Footprint, FootprintLibrary, KicadError,
    KicadResult, LibId,
};
use crate::model::ModelResolver;
use crate::openpnp::{
    board_to_packages, merge_packages, packages_element, read_packages, Package, PackageMapper,
    Style,
};

/// Opens the library named by a `--library` argument.
///
/// Paths are opened directly and named after their directory. A nickname
/// is looked up in the library tables first, then taken as
/// `<footprint dir>/<nickname>.pretty`.
///
/// # Errors
///
/// Returns [`KicadError::LibraryNotFound`] if the directory does not exist.
pub fn open_library(config: &Config, arg: &str) -> KicadResult<FootprintLibrary> {
    if is_library_path(arg) {
        return FootprintLibrary::open(arg);
    }

    let location = config
        .try_library_location(arg)
        .unwrap_or_else(|| resolve_library_arg(arg, &config.footprint_dir()));
    tracing::debug!(nickname = arg, path = %location.display(), "Resolved library");
    FootprintLibrary::with_nickname(location, arg)
}

/// Loads one footprint.
///
/// `name` may be library-qualified (`Lib:Name`), in which case `library`
/// can be omitted. An explicit `library` wins over the qualifier.
///
/// # Errors
///
/// Returns an error if no library is given, or the library or footprint
/// cannot be loaded.
pub fn load_footprint(config: &Config, library: Option<&str>, name: &str) -> KicadResult<Footprint> {
    let id = LibId::parse(name);
    let library = library
        .or(id.library.as_deref())
        .ok_or_else(|| KicadError::MissingLibrary {
            footprint: name.to_string(),
        })?;

    open_library(config, library)?.load(&id.name)
}

/// Converts one library footprint to a `<package>` document.
///
/// # Errors
///
/// Returns an error if the footprint cannot be loaded. Model problems only
/// drop the body size.
pub fn convert_footprint(
    config: &Config,
    library: Option<&str>,
    name: &str,
    style: Style,
) -> Result<String, Error> {
    let footprint = load_footprint(config, library, name)?;
    let mapper = PackageMapper::new(ModelResolver::new(config.vars()));
    Ok(mapper.map(&footprint).to_element().to_xml(style)?)
}

/// Converts every footprint placed on a board to an `<openpnp-packages>`
/// document, optionally joined into an existing packages file.
///
/// `config` should already carry the board's project context
/// ([`Config::with_project`]).
///
/// # Errors
///
/// Returns an error if the board, any library footprint or the join file
/// cannot be loaded. Nothing is returned in that case.
pub fn convert_board(
    config: &Config,
    board: &Path,
    join: Option<&Path>,
    style: Style,
) -> Result<String, Error> {
    let board = Board::load(board)?;
    let mapper = PackageMapper::new(ModelResolver::new(config.vars()));
    let packages = board_to_packages(&board, config, &mapper)?;

    let root = match join {
        Some(path) => merge_packages(
            read_packages(path)?,
            packages.iter().map(Package::to_element),
        ),
        None => packages_element(&packages),
    };

    Ok(root.to_xml(style)?)
}
