//! Axis-aligned bounding box of a STEP (ISO 10303-21) model.
//!
//! Only the entities that bound a B-rep solid are read:
//!
//! - `CARTESIAN_POINT` referenced by `VERTEX_POINT` (every edge endpoint)
//! - `CIRCLE` with its `AXIS2_PLACEMENT_3D`, whose full extent is added so
//!   cylinders and rounded bodies measure correctly
//! - the `LENGTH_UNIT` declaration, to report millimetres
//!
//! Models without any `VERTEX_POINT` fall back to every `CARTESIAN_POINT`.
//! Assembly placements (`ITEM_DEFINED_TRANSFORMATION`) are not applied.
//!
//! The exchange file is parsed by `ruststep` and its entities collected
//! into a `truck-stepio` table. Units are not part of that table, so the
//! `LENGTH_UNIT` declaration is read from the parsed records directly.

use ruststep::ast::{DataSection, EntityInstance, Name, Parameter, Record};
use ruststep::tables::PlaceHolder;
use truck_stepio::r#in::Table;

use crate::error::ModelError;

/// An axis-aligned box in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: [f64; 3],
    /// Maximum corner.
    pub max: [f64; 3],
}

impl BoundingBox {
    fn empty() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    fn include(&mut self, point: [f64; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(point[i]);
            self.max[i] = self.max[i].max(point[i]);
        }
    }

    fn include_extent(&mut self, center: [f64; 3], half: [f64; 3]) {
        self.include([center[0] - half[0], center[1] - half[1], center[2] - half[2]]);
        self.include([center[0] + half[0], center[1] + half[1], center[2] + half[2]]);
    }

    fn scaled(self, factor: f64) -> Self {
        Self {
            min: self.min.map(|v| v * factor),
            max: self.max.map(|v| v * factor),
        }
    }

    /// Size along x.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    /// Size along y.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    /// Size along z.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max[2] - self.min[2]
    }
}

fn entity_id<T>(holder: &PlaceHolder<T>) -> Option<u64> {
    match holder {
        PlaceHolder::Ref(Name::Entity(id)) => Some(*id),
        _ => None,
    }
}

fn triple(values: &[f64]) -> Option<[f64; 3]> {
    match values {
        [x, y, z, ..] => Some([*x, *y, *z]),
        [x, y] => Some([*x, *y, 0.0]),
        _ => None,
    }
}

fn normalize(v: [f64; 3]) -> [f64; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len > 0.0 {
        v.map(|c| c / len)
    } else {
        [0.0, 0.0, 1.0]
    }
}

fn point_at(table: &Table, id: u64) -> Option<[f64; 3]> {
    table
        .cartesian_point
        .get(&id)
        .and_then(|p| triple(&p.coordinates))
}

/// Edge endpoints, or every point when the model has no topology.
fn include_points(table: &Table, bbox: &mut BoundingBox) -> Result<(), ModelError> {
    if table.vertex_point.is_empty() {
        table
            .cartesian_point
            .values()
            .filter_map(|p| triple(&p.coordinates))
            .for_each(|p| bbox.include(p));
        return Ok(());
    }

    for (id, vertex) in &table.vertex_point {
        let point = entity_id(&vertex.vertex_geometry)
            .and_then(|point_id| point_at(table, point_id))
            .ok_or_else(|| ModelError::step(format!("#{id}: vertex has no point")))?;
        bbox.include(point);
    }
    Ok(())
}

/// Full extent of each circle in its plane.
fn include_circles(table: &Table, bbox: &mut BoundingBox) {
    for circle in table.circle.values() {
        let Some(placement) = entity_id(&circle.position)
            .and_then(|id| table.axis2_placement_3d.get(&id))
        else {
            continue;
        };
        let Some(center) = entity_id(&placement.location).and_then(|id| point_at(table, id)) else {
            continue;
        };
        let normal = placement
            .axis
            .as_ref()
            .and_then(entity_id)
            .and_then(|id| table.direction.get(&id))
            .and_then(|d| triple(&d.direction_ratios))
            .map_or([0.0, 0.0, 1.0], normalize);
        let half = normal.map(|n| circle.radius.abs() * (1.0 - n * n).max(0.0).sqrt());
        bbox.include_extent(center, half);
    }
}

fn arguments(record: &Record) -> &[Parameter] {
    match &record.parameter {
        Parameter::List(items) => items,
        other => std::slice::from_ref(other),
    }
}

/// Millimetres per model unit, from the `LENGTH_UNIT` declaration.
///
/// A conversion-based unit is itself defined through an SI unit, so it is
/// the one the geometry uses when both are present.
fn millimetres_per_unit(data: &DataSection) -> Option<f64> {
    let mut si_unit = None;
    let mut conversion_unit = None;

    for entity in &data.entities {
        let EntityInstance::Complex { subsuper, .. } = entity else {
            continue;
        };
        let records = &subsuper.0;
        if !records.iter().any(|r| r.name == "LENGTH_UNIT") {
            continue;
        }

        for record in records {
            match record.name.as_str() {
                "SI_UNIT" => {
                    let prefix = match arguments(record).first() {
                        Some(Parameter::Enumeration(prefix)) => Some(prefix.trim_matches('.')),
                        _ => None,
                    };
                    si_unit.get_or_insert(match prefix {
                        Some("MILLI") => 1.0,
                        Some("CENTI") => 10.0,
                        Some("DECI") => 100.0,
                        Some("MICRO") => 0.001,
                        Some("KILO") => 1_000_000.0,
                        _ => 1000.0,
                    });
                }
                "CONVERSION_BASED_UNIT" => {
                    let mm = match arguments(record).first() {
                        Some(Parameter::String(unit)) => match unit.to_ascii_uppercase().as_str() {
                            "INCH" => Some(25.4),
                            "FOOT" => Some(304.8),
                            "MIL" | "THOU" => Some(0.0254),
                            _ => None,
                        },
                        _ => None,
                    };
                    if conversion_unit.is_none() {
                        conversion_unit = mm;
                    }
                }
                _ => {}
            }
        }
    }

    conversion_unit.or(si_unit)
}

/// Computes the bounding box of STEP file contents, in millimetres.
///
/// # Errors
///
/// Returns [`ModelError::Step`] if the file cannot be parsed or a vertex is
/// dangling, or [`ModelError::Empty`] if the model has no measurable
/// geometry.
pub fn bounding_box(text: &str) -> Result<BoundingBox, ModelError> {
    let exchange = ruststep::parser::parse(text).map_err(|e| ModelError::step(e.to_string()))?;
    let data = exchange
        .data
        .first()
        .ok_or_else(|| ModelError::step("no DATA section"))?;
    let table = Table::from_data_section(data);

    tracing::trace!(
        points = table.cartesian_point.len(),
        vertices = table.vertex_point.len(),
        circles = table.circle.len(),
        "Read STEP entities"
    );

    let mut bbox = BoundingBox::empty();
    include_points(&table, &mut bbox)?;
    include_circles(&table, &mut bbox);
    if bbox.is_empty() {
        return Err(ModelError::Empty);
    }

    let mm_per_unit = millimetres_per_unit(data).unwrap_or_else(|| {
        tracing::debug!("STEP model declares no length unit, assuming millimetres");
        1.0
    });
    Ok(bbox.scaled(mm_per_unit))
}
