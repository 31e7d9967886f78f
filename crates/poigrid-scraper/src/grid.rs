//! Coverage grid over a bounding box.
//!
//! Produces a row-major lattice of sample points (longitude varies fastest).
//! Meters are converted to degrees with an equirectangular approximation: a
//! fixed meters-per-degree for latitude, scaled by the cosine of the box's
//! mid-latitude for longitude. Good enough away from the poles.
//!
//! A step of roughly 0.8 × the search radius keeps neighbouring search
//! circles overlapping. Larger steps leave holes between tiles; smaller steps
//! multiply request cost quadratically.

use poigrid_core::{BoundingBox, ConfigError, TileCoordinate};

const METERS_PER_LAT_DEGREE: f64 = 111_320.0;

/// Largest grid a single crawl will plan.
pub const MAX_TILES: usize = 1_000_000;

/// Degree steps `(lat_step, lng_step)` for a physical spacing of `step_meters`.
fn degree_steps(bbox: &BoundingBox, step_meters: f64) -> (f64, f64) {
    let lat_step = step_meters / METERS_PER_LAT_DEGREE;
    let lng_step = step_meters / (METERS_PER_LAT_DEGREE * bbox.mid_lat().to_radians().cos());
    (lat_step, lng_step)
}

/// Number of lattice positions along an axis of length `span`.
///
/// The last position is the last one not exceeding `span + step / 2`, which
/// places it within half a step of the far boundary.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn axis_count(span: f64, step: f64) -> usize {
    ((span / step + 0.5).floor() as usize).saturating_add(1)
}

fn validate(bbox: &BoundingBox, step_meters: f64) -> Result<(), ConfigError> {
    if !step_meters.is_finite() || step_meters <= 0.0 {
        return Err(ConfigError::InvalidStep(step_meters));
    }
    bbox.validate()
}

/// Grid shape `(rows, columns)` that [`generate_grid`] will produce.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidStep`] for a non-positive or non-finite step,
/// [`ConfigError::InvalidBoundingBox`] for an invalid box and
/// [`ConfigError::GridTooLarge`] when the grid would exceed [`MAX_TILES`].
pub fn grid_dimensions(bbox: &BoundingBox, step_meters: f64) -> Result<(usize, usize), ConfigError> {
    validate(bbox, step_meters)?;
    let (lat_step, lng_step) = degree_steps(bbox, step_meters);
    let rows = axis_count(bbox.max_lat - bbox.min_lat, lat_step);
    let cols = axis_count(bbox.max_lng - bbox.min_lng, lng_step);
    match rows.checked_mul(cols) {
        Some(tiles) if tiles <= MAX_TILES => Ok((rows, cols)),
        _ => Err(ConfigError::GridTooLarge {
            rows,
            cols,
            max_tiles: MAX_TILES,
        }),
    }
}

/// Generate the ordered tile sequence for `bbox` at `step_meters` spacing.
///
/// Pure function of its inputs: identical arguments always yield an
/// identical sequence. Positions are computed from the row/column index
/// rather than by accumulation, so no floating-point drift builds up.
///
/// # Errors
///
/// Same as [`grid_dimensions`].
#[allow(clippy::cast_precision_loss)]
pub fn generate_grid(
    bbox: &BoundingBox,
    step_meters: f64,
) -> Result<Vec<TileCoordinate>, ConfigError> {
    let (rows, cols) = grid_dimensions(bbox, step_meters)?;
    let (lat_step, lng_step) = degree_steps(bbox, step_meters);

    let mut tiles = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        let lat = bbox.min_lat + row as f64 * lat_step;
        for col in 0..cols {
            let lng = bbox.min_lng + col as f64 * lng_step;
            tiles.push(TileCoordinate::new(lat, lng));
        }
    }
    Ok(tiles)
}
