//! OpenPnP package output.
//!
//! ```xml
//! <openpnp-packages>
//!   <package version="1.1" description="..." id="Resistor_SMD:R_0603_1608Metric">
//!     <footprint units="Millimeters" body-width="1.6" body-height="0.8">
//!       <pad name="1" width="0.8" height="0.95" x="-0.825" y="0.0" roundness="0.25" rotation="0.0"/>
//!     </footprint>
//!   </package>
//! </openpnp-packages>
//! ```
//!
//! Footprint mode writes a single bare `<package>`.

pub mod board;
pub mod package;
pub mod xml;

pub use board::board_to_packages;
pub use package::{format_number, Package, PackageFootprint, PackageMapper, PackagePad, Roundness};
pub use xml::{merge_packages, read_packages, Element, Style, XmlError};

/// Wraps packages in an `<openpnp-packages>` root.
pub fn packages_element<'a>(packages: impl IntoIterator<Item = &'a Package>) -> Element {
    let mut root = Element::new(xml::PACKAGES_ROOT);
    for package in packages {
        root.push(package.to_element());
    }
    root
}
