//! Map-algebra primitives over grids
//!
//! - `evaluate`: cell-wise expression with access to cell coordinates
//! - `reduce`: cell-wise minimum / maximum / sum across a list of grids
//! - `distance_transform`: distance to, and value of, the nearest seed cell
//! - `zonal_stats`: univariate statistics over an optionally masked grid
//!
//! Every primitive works on the region carried by its input grids.

mod kdtree;

pub use kdtree::{KdTree, Nearest};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::attractor::Attractor;
use crate::error::{Error, Result};
use crate::raster::{Grid, Region};

/// A cell visited by [`evaluate`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    /// Map x of the cell centre
    pub x: f64,
    /// Map y of the cell centre
    pub y: f64,
}

/// Evaluate an expression at every cell of `region`.
///
/// Returning `NaN` marks the cell as no-data.
pub fn evaluate<F>(region: &Region, f: F) -> Grid
where
    F: Fn(Cell) -> f64,
{
    let data = Array2::from_shape_fn(region.shape(), |(row, col)| {
        let (x, y) = region.cell_center(row, col);
        f(Cell { row, col, x, y })
    });
    Grid::from_parts(*region, data)
}

/// Cell-wise reduction method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReduceMethod {
    Minimum,
    Maximum,
    Sum,
}

impl ReduceMethod {
    /// Combine two cell values, ignoring no-data on either side.
    ///
    /// The result is no-data only when both inputs are.
    #[inline]
    pub fn combine(self, acc: f64, value: f64) -> f64 {
        if value.is_nan() {
            return acc;
        }
        if acc.is_nan() {
            return value;
        }
        match self {
            ReduceMethod::Minimum => acc.min(value),
            ReduceMethod::Maximum => acc.max(value),
            ReduceMethod::Sum => acc + value,
        }
    }
}

/// Reduce an ordered list of grids cell by cell.
///
/// No-data cells are skipped; a cell that is no-data in every input stays
/// no-data. All grids must cover the same cells.
pub fn reduce(grids: &[Grid], method: ReduceMethod) -> Result<Grid> {
    let (first, rest) = grids
        .split_first()
        .ok_or_else(|| Error::MissingInput("reduce needs at least one grid".into()))?;

    let mut acc = first.clone();
    for grid in rest {
        acc.check_same_cells(grid)?;
        acc.view_mut()
            .zip_mut_with(grid.data(), |a, &b| *a = method.combine(*a, b));
    }
    Ok(acc)
}

/// Euclidean distance transform over the valid cells of `seeds`.
///
/// Returns `(distance, nearest_value)`: for every cell, the horizontal
/// distance from its centre to the nearest seed cell centre, and that seed's
/// value. Fails when `seeds` holds no data at all.
pub fn distance_transform(seeds: &Grid) -> Result<(Grid, Grid)> {
    let region = *seeds.region();
    let mut points = Vec::new();
    for ((row, col), &value) in seeds.data().indexed_iter() {
        if !value.is_nan() {
            let (x, y) = region.cell_center(row, col);
            points.push(Attractor::new(x, y, value));
        }
    }
    if points.is_empty() {
        return Err(Error::MissingInput("distance transform needs at least one seed cell".into()));
    }

    let tree = KdTree::build(&points);
    let nearest: Vec<Option<Nearest>> = (0..region.rows())
        .flat_map(|row| (0..region.cols()).map(move |col| (row, col)))
        .map(|(row, col)| {
            let (x, y) = region.cell_center(row, col);
            tree.nearest(x, y)
        })
        .collect();

    let distance = nearest
        .iter()
        .map(|n| n.map_or(f64::NAN, |n| n.distance_sq.sqrt()))
        .collect();
    let value = nearest
        .iter()
        .map(|n| n.map_or(f64::NAN, |n| n.attractor.target_z))
        .collect();

    Ok((Grid::from_vec(region, distance)?, Grid::from_vec(region, value)?))
}

/// Univariate statistics over valid cells
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnivarStats {
    /// Number of valid cells
    pub count: usize,
    /// Sum of valid cells (`NaN` when `count == 0`)
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Statistics over the valid cells of `grid`.
///
/// With a `mask`, only cells where the mask is valid and non-zero count.
/// Like `r.univar`, an empty selection reports `NaN` for sum, min, max and mean.
pub fn zonal_stats(grid: &Grid, mask: Option<&Grid>) -> Result<UnivarStats> {
    if let Some(mask) = mask {
        grid.check_same_cells(mask)?;
    }

    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for ((row, col), &value) in grid.data().indexed_iter() {
        if value.is_nan() {
            continue;
        }
        if let Some(mask) = mask {
            let m = mask.data()[(row, col)];
            if m.is_nan() || m == 0.0 {
                continue;
            }
        }
        count += 1;
        sum += value;
        min = min.min(value);
        max = max.max(value);
    }

    if count == 0 {
        return Ok(UnivarStats {
            count,
            sum: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            mean: f64::NAN,
        });
    }

    Ok(UnivarStats {
        count,
        sum,
        min,
        max,
        mean: sum / count as f64,
    })
}
