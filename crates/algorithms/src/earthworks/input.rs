//! Conversion of raw inputs into attractors

use tracing::warn;

use earthworks_core::{Attractor, Error, Grid, Result};

/// Every valid cell becomes an attractor at its centre carrying the cell value
pub fn attractors_from_raster(spots: &Grid) -> Vec<Attractor> {
    let region = spots.region();
    spots
        .data()
        .indexed_iter()
        .filter(|(_, v)| !v.is_nan())
        .map(|((row, col), &z)| {
            let (x, y) = region.cell_center(row, col);
            Attractor::new(x, y, z)
        })
        .collect()
}

/// Pair a flat `x, y, x, y, ...` list with target elevations.
///
/// A single z applies to every point. Otherwise points and z values are
/// paired in order; when the counts differ a warning is logged and the
/// longer list is truncated.
pub fn attractors_from_coordinates(coordinates: &[f64], z_values: &[f64]) -> Result<Vec<Attractor>> {
    if coordinates.is_empty() {
        return Err(Error::MissingInput("no coordinates given".into()));
    }
    if coordinates.len() % 2 != 0 {
        return Err(Error::invalid_parameter(
            "coordinates",
            coordinates.len(),
            "expected an even number of values (x,y pairs)",
        ));
    }
    if z_values.is_empty() {
        return Err(Error::MissingInput("no z values given".into()));
    }

    let points = coordinates.chunks_exact(2);
    let n_points = points.len();

    if let [z] = z_values {
        return Ok(points.map(|p| Attractor::new(p[0], p[1], *z)).collect());
    }

    if z_values.len() != n_points {
        warn!(
            "{} coordinate pairs but {} z values; using the first {}",
            n_points,
            z_values.len(),
            n_points.min(z_values.len())
        );
    }
    Ok(points
        .zip(z_values)
        .map(|(p, &z)| Attractor::new(p[0], p[1], z))
        .collect())
}

/// Parse a comma separated list of numbers, e.g. `"10.5,20,30.25"`
fn parse_list(name: &'static str, text: &str) -> Result<Vec<f64>> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| Error::invalid_parameter(name, s, "not a number"))
        })
        .collect()
}

/// Parse `"x,y,x,y,..."`
pub fn parse_coordinate_list(text: &str) -> Result<Vec<f64>> {
    let values = parse_list("coordinates", text)?;
    if values.len() % 2 != 0 {
        return Err(Error::invalid_parameter(
            "coordinates",
            text,
            "expected an even number of values (x,y pairs)",
        ));
    }
    Ok(values)
}

/// Parse `"z"` or `"z,z,..."`
pub fn parse_z_list(text: &str) -> Result<Vec<f64>> {
    parse_list("z", text)
}
