//! `.kicad_pcb` reader.
//!
//! Only the placed footprints' identities and fabrication flags are read.
//! Their pads are positioned in board coordinates, so package geometry is
//! always taken from the library definition instead.

use std::path::Path;

use super::error::{KicadError, KicadResult};
use super::footprint::{FootprintAttributes, LibId};
use super::sexpr::{self, Sexpr};

/// A footprint instance placed on a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedFootprint {
    /// Library-qualified footprint name.
    pub lib_id: LibId,
    /// Reference designator (e.g. "R1"), empty if absent.
    pub reference: String,
    /// Fabrication attributes of this instance.
    pub attributes: FootprintAttributes,
}

impl PlacedFootprint {
    fn from_node(node: &Sexpr) -> KicadResult<Self> {
        let id = node
            .atom_at(0)
            .ok_or_else(|| KicadError::invalid_structure("board footprint without name"))?;

        // KiCad 6+ stores the designator as a property, KiCad 5 as fp_text.
        let reference = node
            .find_all("property")
            .find(|p| p.atom_at(0) == Some("Reference"))
            .and_then(|p| p.atom_at(1))
            .or_else(|| {
                node.find_all("fp_text")
                    .find(|t| t.atom_at(0) == Some("reference"))
                    .and_then(|t| t.atom_at(1))
            })
            .unwrap_or_default();

        Ok(Self {
            lib_id: LibId::parse(id),
            reference: reference.to_string(),
            attributes: FootprintAttributes::from_node(node),
        })
    }
}

/// A KiCad board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    /// Placed footprints in file order.
    pub footprints: Vec<PlacedFootprint>,
}

impl Board {
    /// Reads a board file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a KiCad board.
    pub fn load(path: impl AsRef<Path>) -> KicadResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| KicadError::file_read(path, e))?;
        let board = Self::parse(&text).map_err(|e| KicadError::parse(path, &e))?;

        tracing::info!(
            path = %path.display(),
            footprints = board.footprints.len(),
            "Read board"
        );

        Ok(board)
    }

    /// Parses the contents of a `.kicad_pcb` file.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed syntax or a root other than `kicad_pcb`.
    pub fn parse(text: &str) -> KicadResult<Self> {
        let root = sexpr::parse(text)?;
        if !root.is("kicad_pcb") {
            return Err(KicadError::invalid_structure(format!(
                "expected kicad_pcb, found '{}'",
                root.tag().unwrap_or("<atom>")
            )));
        }

        let footprints = root
            .args()
            .iter()
            .filter(|item| item.is("footprint") || item.is("module"))
            .map(PlacedFootprint::from_node)
            .collect::<KicadResult<Vec<_>>>()?;

        Ok(Self { footprints })
    }
}
