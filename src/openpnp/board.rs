//! Board → packages aggregation.

use indexmap::IndexMap;

use crate::config::Config;
use crate::kicad::{Board, Footprint, FootprintLibrary, KicadError, KicadResult, PlacedFootprint};

use super::package::{Package, PackageMapper};

/// Loads the library definition of a placed footprint.
///
/// Board copies are positioned in board coordinates, so the library
/// footprint is read again.
fn library_footprint(
    placed: &PlacedFootprint,
    config: &Config,
) -> KicadResult<Footprint> {
    let nickname = placed
        .lib_id
        .library
        .as_deref()
        .ok_or_else(|| KicadError::MissingLibrary {
            footprint: placed.lib_id.to_string(),
        })?;

    let location = config.library_location(nickname)?;
    FootprintLibrary::with_nickname(location, nickname)?.load(&placed.lib_id.name)
}

/// Builds one package per distinct footprint placed on the board, in
/// first-encountered order.
///
/// Instances marked do-not-populate or excluded from position files are
/// skipped.
///
/// # Errors
///
/// Fails on the first footprint whose library cannot be resolved or whose
/// definition cannot be loaded. No packages are returned in that case.
pub fn board_to_packages(
    board: &Board,
    config: &Config,
    mapper: &PackageMapper<'_>,
) -> KicadResult<Vec<Package>> {
    let mut packages: IndexMap<String, Package> = IndexMap::new();

    for placed in &board.footprints {
        let id = placed.lib_id.to_string();

        if placed.attributes.skip_placement() {
            tracing::debug!(
                reference = %placed.reference,
                footprint = %id,
                dnp = placed.attributes.dnp,
                "Skipping footprint not placed by machine"
            );
            continue;
        }
        if packages.contains_key(&id) {
            continue;
        }

        let footprint = library_footprint(placed, config)?;
        packages.insert(id, mapper.map(&footprint));
    }

    tracing::info!(
        placed = board.footprints.len(),
        packages = packages.len(),
        "Collected board packages"
    );

    Ok(packages.into_values().collect())
}
