//! KiCad file format handling.
//!
//! Readers for the parts of KiCad's s-expression formats the conversion
//! needs:
//!
//! - `.kicad_mod`: single footprint (pads, attributes, 3D models)
//! - `.kicad_pcb`: placed footprint identities and fabrication flags
//! - `fp-lib-table`: library nickname → location
//!
//! Legacy `module` roots written by KiCad 5 are accepted alongside the
//! current `footprint` root.

pub mod board;
pub mod error;
pub mod footprint;
pub mod library;
pub mod sexpr;

pub use board::{Board, PlacedFootprint};
pub use error::{KicadError, KicadResult};
pub use footprint::{FootprintAttributes, Footprint, LibId, Model3D, Pad, PadKind, PadShape};
pub use library::{
    is_library_path, resolve_library_arg, FootprintLibrary, LibraryEntry, LibraryTable,
};
pub use sexpr::{Sexpr, SyntaxError};
