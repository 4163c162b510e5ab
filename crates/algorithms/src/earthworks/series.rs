//! Aggregation of candidate surfaces into one earthworks surface
//!
//! Cuts are reduced by minimum and fills by maximum, then every cell picks
//! its final elevation:
//!
//! - cut: the deepest cut, or the original elevation
//! - fill: the tallest fill, or the original elevation
//! - cutfill: whichever of the two moves the surface further, fill on a tie,
//!   or the original elevation when neither is present
//!
//! Each rule picks the candidate of greatest deviation from the original
//! elevation, so neither the attractor order nor the partitioning of the
//! region changes the result.

use ndarray::s;

use earthworks_core::algebra::{reduce, ReduceMethod};
use earthworks_core::{Error, Grid, Region, Result};

use super::field::{Candidates, Operation};

/// Final elevation of a cell from its original elevation `z` and the
/// reduced candidates (`NaN` when absent)
#[inline]
pub fn select(operation: Operation, z: f64, cut: f64, fill: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    match operation {
        Operation::Cut => if cut.is_nan() { z } else { cut },
        Operation::Fill => if fill.is_nan() { z } else { fill },
        Operation::CutFill => match (cut.is_nan(), fill.is_nan()) {
            (true, true) => z,
            (true, false) => fill,
            (false, true) => cut,
            (false, false) => {
                if fill - z >= z - cut {
                    fill
                } else {
                    cut
                }
            }
        },
    }
}

/// Running reduction of candidate surfaces over a region
#[derive(Debug, Clone)]
pub struct Series {
    region: Region,
    operation: Operation,
    cut: Option<Grid>,
    fill: Option<Grid>,
}

impl Series {
    pub fn new(region: Region, operation: Operation) -> Self {
        Self {
            region,
            operation,
            cut: None,
            fill: None,
        }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Fold candidates into the running minimum of cuts and maximum of fills.
    ///
    /// Candidates may cover any resolution-aligned window of the series
    /// region. Surfaces the operation does not use are dropped.
    pub fn absorb(&mut self, candidates: Candidates) -> Result<()> {
        if let Some(cut) = candidates.cut.filter(|_| self.operation.wants_cut()) {
            merge(&mut self.cut, &self.region, cut, ReduceMethod::Minimum)?;
        }
        if let Some(fill) = candidates.fill.filter(|_| self.operation.wants_fill()) {
            merge(&mut self.fill, &self.region, fill, ReduceMethod::Maximum)?;
        }
        Ok(())
    }

    /// Fold in a finished earthworks surface, e.g. one computed for a
    /// partition. Cells below the original elevation count as cuts and cells
    /// above it as fills.
    pub fn absorb_earthworks(&mut self, earthworks: Grid, elevation: &Grid) -> Result<()> {
        let original = elevation.window(earthworks.region())?;
        let cut = earthworks.zip_map(&original, |e, z| if e < z { e } else { f64::NAN })?;
        let fill = earthworks.zip_map(&original, |e, z| if e > z { e } else { f64::NAN })?;
        self.absorb(Candidates {
            cut: Some(cut),
            fill: Some(fill),
        })
    }

    /// Resolve every cell of `elevation` against the reduced candidates
    pub fn finish(self, elevation: &Grid) -> Result<Grid> {
        if !elevation.region().same_cells(&self.region) {
            return Err(Error::RegionMismatch(format!(
                "series covers {:?} but elevation covers {:?}",
                self.region,
                elevation.region()
            )));
        }

        let operation = self.operation;
        let mut out = elevation.clone();
        let mut view = out.view_mut();
        match (&self.cut, &self.fill) {
            (None, None) => {}
            (Some(cut), None) => view.zip_mut_with(cut.data(), |z, &c| *z = select(operation, *z, c, f64::NAN)),
            (None, Some(fill)) => view.zip_mut_with(fill.data(), |z, &f| *z = select(operation, *z, f64::NAN, f)),
            (Some(cut), Some(fill)) => {
                ndarray::Zip::from(&mut view)
                    .and(cut.data())
                    .and(fill.data())
                    .for_each(|z, &c, &f| *z = select(operation, *z, c, f));
            }
        }
        Ok(out)
    }
}

/// Reduce `grid` into `slot` over the window it covers
fn merge(slot: &mut Option<Grid>, region: &Region, grid: Grid, method: ReduceMethod) -> Result<()> {
    let (row, col) = grid.region().offset_in(region)?;
    if slot.is_none() && grid.region().same_cells(region) {
        *slot = Some(grid);
        return Ok(());
    }

    let acc = slot.get_or_insert_with(|| Grid::nodata(*region));
    let (rows, cols) = grid.shape();
    acc.view_mut()
        .slice_mut(s![row..row + rows, col..col + cols])
        .zip_mut_with(grid.data(), |a, &b| *a = method.combine(*a, b));
    Ok(())
}

/// Aggregate lists of candidate grids over the region of `elevation`
pub fn aggregate(operation: Operation, cuts: &[Grid], fills: &[Grid], elevation: &Grid) -> Result<Grid> {
    let cut = if cuts.is_empty() {
        None
    } else {
        Some(reduce(cuts, ReduceMethod::Minimum)?)
    };
    let fill = if fills.is_empty() {
        None
    } else {
        Some(reduce(fills, ReduceMethod::Maximum)?)
    };

    let mut series = Series::new(*elevation.region(), operation);
    series.absorb(Candidates { cut, fill })?;
    series.finish(elevation)
}
