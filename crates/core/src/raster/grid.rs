//! Dense scalar grid over a region

use ndarray::{s, Array2, ArrayView2, ArrayViewMut2};

use crate::error::{Error, Result};
use crate::raster::Region;

/// A dense 2D field of `f64` values over a [`Region`].
///
/// No-data is represented by `NaN`. Grids are plain owned values: an
/// intermediate grid lives exactly as long as the computation that holds it.
///
/// # Example
///
/// ```ignore
/// use earthworks_core::{Grid, Region};
///
/// let region = Region::from_shape(100, 100, 0.0, 100.0, 1.0, 1.0)?;
/// let mut grid = Grid::filled(region, 0.0);
/// grid.set(10, 20, 42.0)?;
/// let value = grid.get(10, 20)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Extent and resolution
    region: Region,
    /// Cell values in row-major order (row, col)
    data: Array2<f64>,
}

impl Grid {
    /// Create a grid filled with a single value
    pub fn filled(region: Region, value: f64) -> Self {
        Self {
            data: Array2::from_elem(region.shape(), value),
            region,
        }
    }

    /// Create a grid where every cell is no-data
    pub fn nodata(region: Region) -> Self {
        Self::filled(region, f64::NAN)
    }

    /// Create a grid from row-major data
    pub fn from_vec(region: Region, data: Vec<f64>) -> Result<Self> {
        let (rows, cols) = region.shape();
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let data = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self { region, data })
    }

    /// Create a grid from an existing array whose shape matches the region
    pub fn from_array(region: Region, data: Array2<f64>) -> Result<Self> {
        let (rows, cols) = region.shape();
        let (ar, ac) = data.dim();
        if (rows, cols) != (ar, ac) {
            return Err(Error::SizeMismatch { er: rows, ec: cols, ar, ac });
        }
        Ok(Self { region, data })
    }

    /// Pair a region with data already shaped to it
    pub(crate) fn from_parts(region: Region, data: Array2<f64>) -> Self {
        debug_assert_eq!(region.shape(), data.dim());
        Self { region, data }
    }

    /// Evaluate `f(x, y)` at every cell centre
    pub fn from_fn<F>(region: Region, f: F) -> Self
    where
        F: Fn(f64, f64) -> f64,
    {
        let data = Array2::from_shape_fn(region.shape(), |(row, col)| {
            let (x, y) = region.cell_center(row, col);
            f(x, y)
        });
        Self { region, data }
    }

    // Dimensions

    /// Extent and resolution of the grid
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the grid has no cells
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let (rows, cols) = self.shape();
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds { row, col, rows, cols }),
        }
    }

    /// Value of the cell containing the map coordinate
    pub fn value_at(&self, x: f64, y: f64) -> Option<f64> {
        self.region
            .cell_of(x, y)
            .map(|(row, col)| self.data[(row, col)])
    }

    /// Whether cell at (row, col) is no-data
    pub fn is_nodata_at(&self, row: usize, col: usize) -> Result<bool> {
        Ok(self.get(row, col)?.is_nan())
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Get a mutable view of the underlying data
    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.data.view_mut()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Consume the grid and return the underlying array
    pub fn into_array(self) -> Array2<f64> {
        self.data
    }

    // Map algebra

    /// Apply `f` to every cell
    pub fn map<F>(&self, f: F) -> Grid
    where
        F: Fn(f64) -> f64,
    {
        Grid {
            region: self.region,
            data: self.data.mapv(f),
        }
    }

    /// Combine two grids over the same cells
    pub fn zip_map<F>(&self, other: &Grid, f: F) -> Result<Grid>
    where
        F: Fn(f64, f64) -> f64,
    {
        self.check_same_cells(other)?;
        let mut data = self.data.clone();
        data.zip_mut_with(&other.data, |a, &b| *a = f(*a, b));
        Ok(Grid {
            region: self.region,
            data,
        })
    }

    /// Copy of the cells covered by `sub`, which must lie inside this grid
    pub fn window(&self, sub: &Region) -> Result<Grid> {
        let (row, col) = sub.offset_in(&self.region)?;
        let (rows, cols) = sub.shape();
        let data = self
            .data
            .slice(s![row..row + rows, col..col + cols])
            .to_owned();
        Ok(Grid { region: *sub, data })
    }

    /// Fail unless `other` covers exactly the same cells
    pub fn check_same_cells(&self, other: &Grid) -> Result<()> {
        if self.shape() != other.shape() {
            let (er, ec) = self.shape();
            let (ar, ac) = other.shape();
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        if !self.region.same_cells(&other.region) {
            return Err(Error::RegionMismatch(format!(
                "grids cover different extents: {:?} vs {:?}",
                self.region, other.region
            )));
        }
        Ok(())
    }

    // Statistics

    /// Number of cells holding data
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// Basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> GridStatistics {
        let mut min: Option<f64> = None;
        let mut max: Option<f64> = None;
        let mut sum = 0.0;
        let mut count = 0usize;

        for &value in self.data.iter().filter(|v| !v.is_nan()) {
            min = Some(min.map_or(value, |m| m.min(value)));
            max = Some(max.map_or(value, |m| m.max(value)));
            sum += value;
            count += 1;
        }

        GridStatistics {
            min,
            max,
            mean: (count > 0).then(|| sum / count as f64),
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a grid
#[derive(Debug, Clone)]
pub struct GridStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(rows: usize, cols: usize) -> Region {
        Region::from_shape(rows, cols, 0.0, rows as f64, 1.0, 1.0).unwrap()
    }

    #[test]
    fn test_grid_creation() {
        let grid = Grid::filled(region(100, 200), 0.0);
        assert_eq!(grid.rows(), 100);
        assert_eq!(grid.cols(), 200);
        assert_eq!(grid.shape(), (100, 200));
    }

    #[test]
    fn test_grid_access() {
        let mut grid = Grid::filled(region(10, 10), 0.0);
        grid.set(5, 5, 42.0).unwrap();
        assert_eq!(grid.get(5, 5).unwrap(), 42.0);
        assert!(grid.set(10, 0, 1.0).is_err());
        assert!(grid.get(0, 10).is_err());
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(Grid::from_vec(region(2, 2), vec![1.0; 3]).is_err());
        assert!(Grid::from_vec(region(2, 2), vec![1.0; 4]).is_ok());
    }

    #[test]
    fn test_from_fn_uses_cell_centres() {
        let grid = Grid::from_fn(region(3, 3), |x, y| x * 10.0 + y);
        // cell (0, 0) centre is (0.5, 2.5)
        assert_eq!(grid.get(0, 0).unwrap(), 7.5);
        assert_eq!(grid.value_at(2.5, 0.5), Some(25.5));
    }

    #[test]
    fn test_window_copies_sub_block() {
        let full = Grid::from_fn(region(6, 6), |x, y| x + 100.0 * y);
        let sub = full.region().window(1, 2, 3, 2).unwrap();
        let w = full.window(&sub).unwrap();
        assert_eq!(w.shape(), (3, 2));
        assert_eq!(w.get(0, 0).unwrap(), full.get(1, 2).unwrap());
        assert_eq!(w.get(2, 1).unwrap(), full.get(3, 3).unwrap());
    }

    #[test]
    fn test_zip_map_requires_same_cells() {
        let a = Grid::filled(region(4, 4), 1.0);
        let b = Grid::filled(region(4, 4), 2.0);
        let sum = a.zip_map(&b, |x, y| x + y).unwrap();
        assert_eq!(sum.get(3, 3).unwrap(), 3.0);

        let c = Grid::filled(region(4, 5), 2.0);
        assert!(a.zip_map(&c, |x, y| x + y).is_err());
    }

    #[test]
    fn test_grid_statistics() {
        let mut grid = Grid::from_fn(region(10, 10), |x, y| (9.5 - y) * 10.0 + (x - 0.5));
        grid.set(0, 0, f64::NAN).unwrap();

        let stats = grid.statistics();
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(99.0));
        assert_eq!(stats.valid_count, 99);
        assert_eq!(stats.nodata_count, 1);
        assert!(grid.is_nodata_at(0, 0).unwrap());
    }
}
