//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take a target size, compute parameters, and call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::fit_sides;
use super::params::{Quality, ScaleParams};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &(impl ImageBackend + ?Sized), path: &Path) -> Result<Dimensions> {
    backend.identify(path)
}

/// Plan a scale-to-fit without executing it.
///
/// The longer side of `source_dims` becomes `target`; the other side is
/// left [`Auto`](super::Side::Auto).
pub fn plan_scale(
    source: &Path,
    output: &Path,
    source_dims: Dimensions,
    target: u32,
    quality: Quality,
) -> ScaleParams {
    let (width, height) = fit_sides(source_dims, target);
    ScaleParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width,
        height,
        quality,
    }
}

/// Create a JPEG thumbnail whose longer side is `target` pixels.
pub fn create_thumbnail(
    backend: &(impl ImageBackend + ?Sized),
    source: &Path,
    output: &Path,
    source_dims: Dimensions,
    target: u32,
    quality: Quality,
) -> Result<ScaleParams> {
    let params = plan_scale(source, output, source_dims, target, quality);
    backend.scale(&params)?;
    Ok(params)
}
