//! Body dimensions from 3D models.
//!
//! Measuring a model is best effort: any failure is logged and reported as
//! "no dimensions", and the package is still produced from pad geometry.
//!
//! KiCad libraries reference `.wrl` models for rendering, but the stock
//! libraries ship a `.step` next to nearly every one. The resolver swaps in
//! that sibling when it exists, since only STEP is measured.

pub mod step;

use std::path::{Path, PathBuf};

use crate::config::TemplateVars;
use crate::error::ModelError;
use crate::kicad::Model3D;

pub use step::BoundingBox;

/// Extensions measured directly, in order of preference.
pub const STEP_EXTENSIONS: [&str; 2] = ["step", "stp"];
/// Extension of models that are only measured through a STEP sibling.
pub const VRML_EXTENSION: &str = "wrl";

/// Physical body size in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDimensions {
    /// Extent along x.
    pub width: f64,
    /// Extent along y.
    pub length: f64,
    /// Extent along z.
    pub height: f64,
}

impl From<BoundingBox> for BodyDimensions {
    fn from(bbox: BoundingBox) -> Self {
        Self {
            width: bbox.width(),
            length: bbox.length(),
            height: bbox.height(),
        }
    }
}

/// Rounds to 6 decimal places (1 nm) to drop trigonometric noise.
fn round_nm(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

impl BodyDimensions {
    /// Expresses model-space dimensions in the footprint frame by applying
    /// the model's scale and X, Y, Z rotations.
    ///
    /// The result is the axis-aligned box of the rotated body, so a model
    /// rotated by 90° about Z has its width and length swapped.
    #[must_use]
    pub fn in_footprint_frame(self, model: &Model3D) -> Self {
        let extent = [
            self.width * model.scale[0].abs(),
            self.length * model.scale[1].abs(),
            self.height * model.scale[2].abs(),
        ];

        let [rx, ry, rz] = model.rotate.map(f64::to_radians);
        let (sx, cx) = rx.sin_cos();
        let (sy, cy) = ry.sin_cos();
        let (sz, cz) = rz.sin_cos();

        // R = Rz * Ry * Rx
        let rotation = [
            [cz * cy, cz * sy * sx - sz * cx, cz * sy * cx + sz * sx],
            [sz * cy, sz * sy * sx + cz * cx, sz * sy * cx - cz * sx],
            [-sy, cy * sx, cy * cx],
        ];

        let rotated = rotation.map(|row| {
            round_nm(
                row.iter()
                    .zip(extent)
                    .map(|(r, e)| r.abs() * e)
                    .sum::<f64>(),
            )
        });

        Self {
            width: rotated[0],
            length: rotated[1],
            height: rotated[2],
        }
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

/// Resolves model paths and measures them.
#[derive(Debug, Clone, Copy)]
pub struct ModelResolver<'a> {
    vars: &'a TemplateVars,
}

impl<'a> ModelResolver<'a> {
    /// Creates a resolver using the given path variables.
    #[must_use]
    pub const fn new(vars: &'a TemplateVars) -> Self {
        Self { vars }
    }

    /// Substitutes path variables and prefers a STEP sibling over `.wrl`.
    #[must_use]
    pub fn resolve_path(&self, model: &Model3D) -> PathBuf {
        let path = PathBuf::from(self.vars.expand(&model.path));

        if has_extension(&path, VRML_EXTENSION) {
            for ext in STEP_EXTENSIONS {
                let sibling = path.with_extension(ext);
                if sibling.is_file() {
                    tracing::debug!(
                        model = %path.display(),
                        step = %sibling.display(),
                        "Using STEP sibling of VRML model"
                    );
                    return sibling;
                }
            }
        }

        path
    }

    /// Measures a model file in its own coordinate frame.
    ///
    /// # Errors
    ///
    /// Returns an error for non-STEP files, unreadable files, or STEP data
    /// that cannot be measured.
    pub fn measure(&self, path: &Path) -> Result<BodyDimensions, ModelError> {
        if !STEP_EXTENSIONS.iter().any(|ext| has_extension(path, ext)) {
            return Err(ModelError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }

        let text = std::fs::read_to_string(path).map_err(|e| ModelError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        step::bounding_box(&text).map(BodyDimensions::from)
    }

    /// Body dimensions of a model in the footprint frame, or `None` if the
    /// model cannot be measured.
    #[must_use]
    pub fn dimensions(&self, model: &Model3D) -> Option<BodyDimensions> {
        let path = self.resolve_path(model);
        tracing::info!(model = %path.display(), "Analysing model for dimensions");

        match self.measure(&path) {
            Ok(dimensions) => {
                let dimensions = dimensions.in_footprint_frame(model);
                tracing::debug!(
                    model = %path.display(),
                    width = dimensions.width,
                    length = dimensions.length,
                    height = dimensions.height,
                    "Measured model"
                );
                Some(dimensions)
            }
            Err(e @ ModelError::UnsupportedFormat { .. }) => {
                tracing::warn!(error = %e, "Unable to analyse model");
                None
            }
            Err(e) => {
                tracing::warn!(model = %path.display(), error = %e, "Error while analysing model");
                None
            }
        }
    }
}
