//! Footprint → OpenPnP package mapping.

use crate::kicad::footprint::nm_to_mm;
use crate::kicad::{Footprint, Pad, PadShape};
use crate::model::{BodyDimensions, ModelResolver};

use super::xml::{Element, PACKAGE_ELEMENT};

/// Package format version written to every package.
pub const PACKAGE_VERSION: &str = "1.1";
/// Unit label of all package geometry.
pub const UNITS: &str = "Millimeters";

/// Formats a number the way OpenPnP files usually show them: integral
/// values keep one decimal (`1.0`), others use the shortest exact form.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// OpenPnP corner roundness for a pad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Roundness {
    /// The shape maps exactly: `0` square, `100` round.
    Exact(f64),
    /// Rounded rectangle; KiCad's corner ratio, written as read.
    Ratio(f64),
    /// OpenPnP has no equivalent shape; `value` is the closest fit.
    Approximate {
        /// Roundness written to the package.
        value: f64,
        /// The KiCad shape being approximated.
        shape: PadShape,
    },
}

impl Roundness {
    /// Fully rounded.
    pub const ROUND: f64 = 100.0;
    /// Square corners.
    pub const SQUARE: f64 = 0.0;

    /// Roundness of a KiCad pad shape.
    #[must_use]
    pub fn of(shape: PadShape) -> Self {
        match shape {
            PadShape::Rect => Self::Exact(Self::SQUARE),
            PadShape::RoundRect { ratio } => Self::Ratio(ratio),
            PadShape::Circle => Self::Exact(Self::ROUND),
            // An OpenPnP rectangle with full roundness is a stadium.
            PadShape::Oval => Self::Approximate {
                value: Self::ROUND,
                shape,
            },
            PadShape::Trapezoid | PadShape::ChamferedRect | PadShape::Custom => {
                Self::Approximate {
                    value: Self::SQUARE,
                    shape,
                }
            }
        }
    }

    /// Value written to the package.
    #[must_use]
    pub fn value(&self) -> f64 {
        match self {
            Self::Exact(value) | Self::Ratio(value) | Self::Approximate { value, .. } => *value,
        }
    }

    /// Returns `true` if the package does not reproduce the pad exactly.
    #[must_use]
    pub const fn is_approximate(&self) -> bool {
        matches!(self, Self::Approximate { .. })
    }

    fn to_attribute(self) -> String {
        match self {
            Self::Ratio(ratio) => format_number(ratio),
            // Square and round are written as plain integers.
            Self::Exact(value) | Self::Approximate { value, .. } => format!("{value:.0}"),
        }
    }
}

/// One `<pad>` of a package. Lengths in millimetres.
#[derive(Debug, Clone, PartialEq)]
pub struct PackagePad {
    /// Pad name.
    pub name: String,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
    /// Corner roundness.
    pub roundness: Roundness,
    /// Rotation in degrees.
    pub rotation: f64,
}

impl PackagePad {
    fn from_pad(pad: &Pad) -> Self {
        Self {
            name: pad.name.clone(),
            width: nm_to_mm(pad.width),
            height: nm_to_mm(pad.height),
            x: nm_to_mm(pad.x),
            y: nm_to_mm(pad.y),
            roundness: Roundness::of(pad.shape),
            rotation: pad.rotation,
        }
    }

    fn to_element(&self) -> Element {
        Element::new("pad")
            .with_attribute("name", &self.name)
            .with_attribute("width", format_number(self.width))
            .with_attribute("height", format_number(self.height))
            .with_attribute("x", format_number(self.x))
            .with_attribute("y", format_number(self.y))
            .with_attribute("roundness", self.roundness.to_attribute())
            .with_attribute("rotation", format_number(self.rotation))
    }
}

/// The `<footprint>` element of a package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageFootprint {
    /// Unit label.
    pub units: String,
    /// Body size, if a model could be measured.
    pub body: Option<BodyDimensions>,
    /// Pads in footprint order.
    pub pads: Vec<PackagePad>,
}

/// An OpenPnP package.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    /// Format version.
    pub version: String,
    /// Human-readable description.
    pub description: String,
    /// Library-qualified footprint name.
    pub id: String,
    /// Geometry.
    pub footprint: PackageFootprint,
}

impl Package {
    /// Builds the `<package>` element.
    ///
    /// `body-width` is the body's X extent and `body-height` its Y extent,
    /// both in the footprint frame.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut footprint = Element::new("footprint").with_attribute("units", &self.footprint.units);
        if let Some(body) = &self.footprint.body {
            footprint.set_attribute("body-width", format_number(body.width));
            footprint.set_attribute("body-height", format_number(body.length));
        }
        for pad in &self.footprint.pads {
            footprint.push(pad.to_element());
        }

        let mut package = Element::new(PACKAGE_ELEMENT)
            .with_attribute("version", &self.version)
            .with_attribute("description", &self.description)
            .with_attribute("id", &self.id);
        package.push(footprint);
        package
    }
}

impl From<&Package> for Element {
    fn from(package: &Package) -> Self {
        package.to_element()
    }
}

/// Maps footprints to packages, measuring 3D models when a resolver is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageMapper<'a> {
    models: Option<ModelResolver<'a>>,
}

impl<'a> PackageMapper<'a> {
    /// Creates a mapper that measures models through `models`.
    #[must_use]
    pub const fn new(models: ModelResolver<'a>) -> Self {
        Self {
            models: Some(models),
        }
    }

    /// Creates a mapper that never reads models; packages carry no body size.
    #[must_use]
    pub const fn without_models() -> Self {
        Self { models: None }
    }

    /// Builds the package for a footprint.
    ///
    /// Only SMD pads are placed by the machine, so other pads are left out.
    #[must_use]
    pub fn map(&self, footprint: &Footprint) -> Package {
        let id = footprint.lib_id.to_string();

        let mut pads = Vec::with_capacity(footprint.pads.len());
        for pad in footprint.pads.iter().filter(|p| p.is_smd()) {
            let pad = PackagePad::from_pad(pad);
            if let Roundness::Approximate { value, shape } = pad.roundness {
                tracing::warn!(
                    package = %id,
                    pad = %pad.name,
                    shape = shape.name(),
                    roundness = value,
                    "Pad shape has no OpenPnP equivalent; approximating"
                );
            }
            pads.push(pad);
        }

        let skipped = footprint.pads.len() - pads.len();
        if skipped > 0 {
            tracing::debug!(package = %id, skipped, "Skipped non-SMD pads");
        }

        let body = self.models.and_then(|resolver| {
            footprint
                .primary_model()
                .and_then(|model| resolver.dimensions(model))
        });

        tracing::debug!(
            package = %id,
            pads = pads.len(),
            has_body = body.is_some(),
            "Mapped footprint"
        );

        Package {
            version: PACKAGE_VERSION.to_string(),
            description: footprint.description.clone(),
            id,
            footprint: PackageFootprint {
                units: UNITS.to_string(),
                body,
                pads,
            },
        }
    }
}
