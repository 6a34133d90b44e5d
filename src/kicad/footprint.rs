//! Footprint types and the `.kicad_mod` reader.
//!
//! Lengths are stored in KiCad internal units (integer nanometres), the same
//! resolution pcbnew uses, so conversions to millimetres are exact.

use std::fmt;

use super::error::{KicadError, KicadResult};
use super::sexpr::{self, Sexpr};

/// Nanometres per millimetre.
pub const NM_PER_MM: f64 = 1_000_000.0;

/// Converts a millimetre value from a KiCad file to nanometres.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn mm_to_nm(mm: f64) -> i64 {
    (mm * NM_PER_MM).round() as i64
}

/// Converts nanometres to millimetres.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn nm_to_mm(nm: i64) -> f64 {
    nm as f64 / NM_PER_MM
}

/// A library-qualified footprint name, e.g. `Resistor_SMD:R_0603_1608Metric`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibId {
    /// Library nickname, if known.
    pub library: Option<String>,
    /// Footprint name within the library.
    pub name: String,
}

impl LibId {
    /// Creates an identifier.
    pub fn new(library: Option<impl Into<String>>, name: impl Into<String>) -> Self {
        Self {
            library: library.map(Into::into),
            name: name.into(),
        }
    }

    /// Parses `Lib:Name` or a bare `Name`.
    #[must_use]
    pub fn parse(id: &str) -> Self {
        match id.split_once(':') {
            Some((library, name)) if !library.is_empty() => Self::new(Some(library), name),
            Some((_, name)) => Self::new(None::<String>, name),
            None => Self::new(None::<String>, id),
        }
    }
}

impl fmt::Display for LibId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.library {
            Some(library) => write!(f, "{library}:{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// How a pad is attached to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadKind {
    /// Surface-mount pad.
    #[default]
    Smd,
    /// Plated through-hole pad.
    ThroughHole,
    /// Non-plated hole.
    NpThroughHole,
    /// Edge connector / copper without paste.
    Connect,
}

impl PadKind {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "smd" => Some(Self::Smd),
            "thru_hole" => Some(Self::ThroughHole),
            "np_thru_hole" => Some(Self::NpThroughHole),
            "connect" => Some(Self::Connect),
            _ => None,
        }
    }
}

/// Pad copper shape.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PadShape {
    /// Plain rectangle.
    #[default]
    Rect,
    /// Rectangle with rounded corners.
    RoundRect {
        /// KiCad's `roundrect_rratio`: corner radius over the shorter side.
        ratio: f64,
    },
    /// Circle.
    Circle,
    /// Oblong / stadium.
    Oval,
    /// Trapezoid.
    Trapezoid,
    /// Rectangle with chamfered corners.
    ChamferedRect,
    /// Custom primitive-based shape.
    Custom,
}

/// KiCad's default `roundrect_rratio`.
pub const DEFAULT_ROUNDRECT_RATIO: f64 = 0.25;

impl PadShape {
    /// Builds a rounded rectangle from KiCad's `roundrect_rratio`.
    #[must_use]
    pub const fn round_rect(ratio: f64) -> Self {
        Self::RoundRect { ratio }
    }

    fn from_node(token: &str, pad: &Sexpr) -> Option<Self> {
        match token {
            "rect" => Some(Self::Rect),
            "roundrect" => Some(Self::round_rect(
                pad.find("roundrect_rratio")
                    .and_then(|n| n.f64_at(0))
                    .unwrap_or(DEFAULT_ROUNDRECT_RATIO),
            )),
            "circle" => Some(Self::Circle),
            "oval" => Some(Self::Oval),
            "trapezoid" => Some(Self::Trapezoid),
            "chamfered_rect" => Some(Self::ChamferedRect),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    /// KiCad token for this shape.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Rect => "rect",
            Self::RoundRect { .. } => "roundrect",
            Self::Circle => "circle",
            Self::Oval => "oval",
            Self::Trapezoid => "trapezoid",
            Self::ChamferedRect => "chamfered_rect",
            Self::Custom => "custom",
        }
    }
}

/// A footprint pad.
#[derive(Debug, Clone, PartialEq)]
pub struct Pad {
    /// Pad number/name (e.g. "1", "A1", or empty). Not unique.
    pub name: String,

    /// Attachment type.
    pub kind: PadKind,

    /// Copper shape.
    pub shape: PadShape,

    /// X position in nanometres from the footprint origin.
    pub x: i64,

    /// Y position in nanometres from the footprint origin.
    pub y: i64,

    /// Width in nanometres.
    pub width: i64,

    /// Height in nanometres.
    pub height: i64,

    /// Orientation in degrees, as written in the file.
    pub rotation: f64,
}

impl Pad {
    /// Creates a rectangular SMD pad on the front copper.
    #[must_use]
    pub fn smd(name: impl Into<String>, x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            name: name.into(),
            kind: PadKind::Smd,
            shape: PadShape::Rect,
            x,
            y,
            width,
            height,
            rotation: 0.0,
        }
    }

    /// Creates a round plated through-hole pad.
    #[must_use]
    pub fn through_hole(name: impl Into<String>, x: i64, y: i64, diameter: i64) -> Self {
        Self {
            name: name.into(),
            kind: PadKind::ThroughHole,
            shape: PadShape::Circle,
            x,
            y,
            width: diameter,
            height: diameter,
            rotation: 0.0,
        }
    }

    /// Replaces the shape.
    #[must_use]
    pub fn with_shape(mut self, shape: PadShape) -> Self {
        self.shape = shape;
        self
    }

    /// Replaces the rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    /// Returns `true` for surface-mount pads.
    #[must_use]
    pub fn is_smd(&self) -> bool {
        self.kind == PadKind::Smd
    }

    fn from_node(node: &Sexpr) -> KicadResult<Self> {
        let name = node.atom_at(0).unwrap_or_default().to_string();
        let kind_token = node.atom_at(1).unwrap_or_default();
        let kind = PadKind::from_token(kind_token).ok_or_else(|| {
            KicadError::invalid_structure(format!("pad '{name}': unknown pad type '{kind_token}'"))
        })?;
        let shape_token = node.atom_at(2).unwrap_or_default();
        let shape = PadShape::from_node(shape_token, node).ok_or_else(|| {
            KicadError::invalid_structure(format!("pad '{name}': unknown shape '{shape_token}'"))
        })?;

        let at = node
            .find("at")
            .ok_or_else(|| KicadError::invalid_structure(format!("pad '{name}': missing (at)")))?;
        let size = node.find("size").ok_or_else(|| {
            KicadError::invalid_structure(format!("pad '{name}': missing (size)"))
        })?;

        Ok(Self {
            name,
            kind,
            shape,
            x: mm_to_nm(at.f64_at(0).unwrap_or(0.0)),
            y: mm_to_nm(at.f64_at(1).unwrap_or(0.0)),
            width: mm_to_nm(size.f64_at(0).unwrap_or(0.0)),
            height: mm_to_nm(size.f64_at(1).unwrap_or(0.0)),
            rotation: at.f64_at(2).unwrap_or(0.0),
        })
    }
}

/// A 3D model attached to a footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Model3D {
    /// Model path, possibly containing `${VAR}` tokens.
    pub path: String,
    /// Scale (x, y, z).
    pub scale: [f64; 3],
    /// Rotation about x, y, z in degrees.
    pub rotate: [f64; 3],
}

impl Model3D {
    /// Creates a model reference with identity transform.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            scale: [1.0; 3],
            rotate: [0.0; 3],
        }
    }

    fn from_node(node: &Sexpr) -> KicadResult<Self> {
        let path = node
            .atom_at(0)
            .ok_or_else(|| KicadError::invalid_structure("model without path"))?;

        let xyz = |tag: &str, default: f64| -> [f64; 3] {
            node.find(tag)
                .and_then(|n| n.find("xyz"))
                .map_or([default; 3], |xyz| {
                    [0, 1, 2].map(|i| xyz.f64_at(i).unwrap_or(default))
                })
        };

        Ok(Self {
            path: path.to_string(),
            scale: xyz("scale", 1.0),
            rotate: xyz("rotate", 0.0),
        })
    }
}

/// Placement attributes of a footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FootprintAttributes {
    /// Do not populate.
    pub dnp: bool,
    /// Excluded from position (pick-and-place) files.
    pub exclude_from_pos_files: bool,
}

impl FootprintAttributes {
    /// Reads `(attr ...)` plus the standalone flags newer KiCad versions write.
    pub(crate) fn from_node(node: &Sexpr) -> Self {
        let attr = node.find("attr");
        let has = |word: &str| attr.is_some_and(|a| a.has_atom(word)) || node.flag(word);

        Self {
            dnp: has("dnp"),
            exclude_from_pos_files: has("exclude_from_pos_files"),
        }
    }

    /// Returns `true` if the footprint is not placed by a machine.
    #[must_use]
    pub const fn skip_placement(&self) -> bool {
        self.dnp || self.exclude_from_pos_files
    }
}

/// A footprint definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    /// Library-qualified name.
    pub lib_id: LibId,

    /// Description (`descr`, or the `Description` property).
    pub description: String,

    /// Pads in file order.
    pub pads: Vec<Pad>,

    /// 3D models in file order.
    pub models: Vec<Model3D>,

    /// Fabrication attributes.
    pub attributes: FootprintAttributes,
}

impl Footprint {
    /// Creates an empty footprint.
    #[must_use]
    pub fn new(lib_id: LibId) -> Self {
        Self {
            lib_id,
            description: String::new(),
            pads: Vec::new(),
            models: Vec::new(),
            attributes: FootprintAttributes::default(),
        }
    }

    /// Adds a pad to the footprint.
    pub fn add_pad(&mut self, pad: Pad) {
        self.pads.push(pad);
    }

    /// Adds a 3D model to the footprint.
    pub fn add_model(&mut self, model: Model3D) {
        self.models.push(model);
    }

    /// The model consulted for body dimensions.
    #[must_use]
    pub fn primary_model(&self) -> Option<&Model3D> {
        self.models.first()
    }

    /// Parses the contents of a `.kicad_mod` file.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed syntax, a root other than `footprint`
    /// or `module`, or an unreadable pad or model.
    pub fn parse(text: &str) -> KicadResult<Self> {
        let root = sexpr::parse(text)?;
        Self::from_node(&root)
    }

    /// Builds a footprint from a `(footprint ...)` or `(module ...)` node.
    pub(crate) fn from_node(node: &Sexpr) -> KicadResult<Self> {
        if !node.is("footprint") && !node.is("module") {
            return Err(KicadError::invalid_structure(format!(
                "expected footprint, found '{}'",
                node.tag().unwrap_or("<atom>")
            )));
        }

        let id = node
            .atom_at(0)
            .ok_or_else(|| KicadError::invalid_structure("footprint without name"))?;
        let mut footprint = Self::new(LibId::parse(id));

        footprint.description = node
            .value_of("descr")
            .or_else(|| {
                node.find_all("property")
                    .find(|p| p.atom_at(0) == Some("Description"))
                    .and_then(|p| p.atom_at(1))
            })
            .unwrap_or_default()
            .to_string();

        footprint.attributes = FootprintAttributes::from_node(node);

        for pad in node.find_all("pad") {
            footprint.add_pad(Pad::from_node(pad)?);
        }
        for model in node.find_all("model") {
            footprint.add_model(Model3D::from_node(model)?);
        }

        tracing::trace!(
            footprint = %footprint.lib_id,
            pads = footprint.pads.len(),
            models = footprint.models.len(),
            "Parsed footprint"
        );

        Ok(footprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R_0603: &str = r#"(footprint "R_0603_1608Metric"
  (version 20240108)
  (generator "pcbnew")
  (layer "F.Cu")
  (descr "Resistor SMD 0603 (1608 Metric), square (rectangular) end terminal")
  (tags "resistor")
  (property "Reference" "REF**" (at 0 -1.43 0) (layer "F.SilkS"))
  (attr smd)
  (pad "1" smd roundrect (at -0.825 0) (size 0.8 0.95) (layers "F.Cu" "F.Paste" "F.Mask") (roundrect_rratio 0.25))
  (pad "2" smd roundrect (at 0.825 0) (size 0.8 0.95) (layers "F.Cu" "F.Paste" "F.Mask") (roundrect_rratio 0.25))
  (model "${KICAD8_3DMODEL_DIR}/Resistor_SMD.3dshapes/R_0603_1608Metric.wrl"
    (offset (xyz 0 0 0)) (scale (xyz 1 1 1)) (rotate (xyz 0 0 90)))
)"#;

    #[test]
    fn parse_kicad8_footprint() {
        let fp = Footprint::parse(R_0603).unwrap();
        assert_eq!(fp.lib_id, LibId::new(None::<String>, "R_0603_1608Metric"));
        assert!(fp.description.starts_with("Resistor SMD 0603"));
        assert_eq!(fp.pads.len(), 2);

        let pad = &fp.pads[0];
        assert_eq!(pad.name, "1");
        assert_eq!(pad.kind, PadKind::Smd);
        assert_eq!(pad.x, -825_000);
        assert_eq!(pad.y, 0);
        assert_eq!(pad.width, 800_000);
        assert_eq!(pad.height, 950_000);
        assert_eq!(pad.shape, PadShape::RoundRect { ratio: 0.25 });

        let model = fp.primary_model().unwrap();
        assert!(model.path.ends_with("R_0603_1608Metric.wrl"));
        assert_eq!(model.rotate, [0.0, 0.0, 90.0]);
        assert_eq!(model.scale, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn parse_legacy_module() {
        let text = r#"(module SOT-23 (layer F.Cu) (tedit 5A02FF57)
  (descr "SOT-23, Standard")
  (attr smd)
  (pad 1 smd rect (at -1 0.95 90) (size 0.6 0.7) (layers F.Cu F.Paste F.Mask))
  (pad 4 thru_hole oval (at 0 0) (size 1.2 1.7) (drill 0.8) (layers *.Cu *.Mask))
  (model ${KISYS3DMOD}/Package_TO_SOT_SMD.3dshapes/SOT-23.wrl
    (at (xyz 0 0 0)) (scale (xyz 1 1 1)) (rotate (xyz 0 0 0)))
)"#;
        let fp = Footprint::parse(text).unwrap();
        assert_eq!(fp.lib_id.name, "SOT-23");
        assert_eq!(fp.description, "SOT-23, Standard");
        assert_eq!(fp.pads[0].rotation, 90.0);
        assert_eq!(fp.pads[0].shape, PadShape::Rect);
        assert_eq!(fp.pads[1].kind, PadKind::ThroughHole);
        assert_eq!(fp.pads[1].shape, PadShape::Oval);
        assert_eq!(fp.models.len(), 1);
    }

    #[test]
    fn description_from_property() {
        let text = r#"(footprint "X" (property "Description" "from property") (pad "1" smd circle (at 0 0) (size 1 1)))"#;
        let fp = Footprint::parse(text).unwrap();
        assert_eq!(fp.description, "from property");
        assert_eq!(fp.pads[0].shape, PadShape::Circle);
    }

    #[test]
    fn qualified_name_in_file() {
        let fp = Footprint::parse(r#"(footprint "Lib:Name")"#).unwrap();
        assert_eq!(fp.lib_id.to_string(), "Lib:Name");
        assert!(fp.pads.is_empty());
        assert!(fp.primary_model().is_none());
    }

    #[test]
    fn attributes_and_flags() {
        let fp = Footprint::parse(r#"(footprint "X" (attr smd exclude_from_pos_files) (dnp yes))"#)
            .unwrap();
        assert!(fp.attributes.exclude_from_pos_files);
        assert!(fp.attributes.dnp);
        assert!(fp.attributes.skip_placement());
    }

    #[test]
    fn reject_wrong_root() {
        let err = Footprint::parse("(kicad_pcb (version 20240108))").unwrap_err();
        assert!(err.to_string().contains("expected footprint"));
    }

    #[test]
    fn reject_unknown_pad_type() {
        let err = Footprint::parse(r#"(footprint "X" (pad "1" bogus rect (at 0 0) (size 1 1)))"#)
            .unwrap_err();
        assert!(err.to_string().contains("unknown pad type"));
    }

    #[test]
    fn roundrect_ratio_kept_as_read() {
        let fp = Footprint::parse(
            r#"(footprint "X"
  (pad "1" smd roundrect (at 0 0) (size 1 1) (layers "F.Cu") (roundrect_rratio 0.1))
  (pad "2" smd roundrect (at 0 0) (size 1 1) (layers "F.Cu") (roundrect_rratio 0.9))
  (pad "3" smd roundrect (at 0 0) (size 1 1) (layers "F.Cu")))"#,
        )
        .unwrap();
        let shapes: Vec<_> = fp.pads.iter().map(|p| p.shape).collect();
        assert_eq!(
            shapes,
            vec![
                PadShape::RoundRect { ratio: 0.1 },
                PadShape::RoundRect { ratio: 0.9 },
                PadShape::RoundRect {
                    ratio: DEFAULT_ROUNDRECT_RATIO
                },
            ]
        );
    }

    #[test]
    fn lib_id_parsing() {
        assert_eq!(LibId::parse("A:B").to_string(), "A:B");
        assert_eq!(LibId::parse("B").library, None);
        assert_eq!(LibId::parse(":B"), LibId::new(None::<String>, "B"));
    }

    #[test]
    fn unit_conversion_is_exact() {
        assert_eq!(mm_to_nm(1.0), 1_000_000);
        assert_eq!(mm_to_nm(0.95), 950_000);
        assert!((nm_to_mm(1_000_000) - 1.0).abs() < f64::EPSILON);
    }
}
