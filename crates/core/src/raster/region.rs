//! Rectangular, resolution-aligned extents

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Offsets smaller than this fraction of a cell are treated as aligned.
const ALIGN_EPSILON: f64 = 1e-6;

/// An axis-aligned rectangular extent with a fixed cell resolution.
///
/// Every grid operation is addressed by an explicit `Region`; there is no
/// process-wide "current region". The extent always covers a whole number of
/// cells: `rows = (north - south) / ns_res` and `cols = (east - west) / ew_res`.
///
/// Cell `(0, 0)` is the north-west corner and rows grow southwards:
/// ```text
/// x = west  + (col + 0.5) * ew_res
/// y = north - (row + 0.5) * ns_res
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    /// North-south cell size
    pub ns_res: f64,
    /// East-west cell size
    pub ew_res: f64,
}

impl Region {
    /// Create a region, snapping the south and east edges so that the extent
    /// covers a whole number of cells.
    pub fn new(north: f64, south: f64, east: f64, west: f64, ns_res: f64, ew_res: f64) -> Result<Self> {
        for (name, v) in [("north", north), ("south", south), ("east", east), ("west", west)] {
            if !v.is_finite() {
                return Err(Error::invalid_parameter(name, v, "must be finite"));
            }
        }
        for (name, v) in [("ns_res", ns_res), ("ew_res", ew_res)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(Error::invalid_parameter(name, v, "must be a positive number"));
            }
        }

        let rows = ((north - south) / ns_res).round();
        let cols = ((east - west) / ew_res).round();
        if rows < 1.0 || cols < 1.0 {
            return Err(Error::DegenerateRegion(format!(
                "n={north} s={south} e={east} w={west} covers no cells"
            )));
        }

        Ok(Self {
            north,
            south: north - rows * ns_res,
            east: west + cols * ew_res,
            west,
            ns_res,
            ew_res,
        })
    }

    /// Create a region of `rows` x `cols` cells anchored at its north-west corner.
    pub fn from_shape(rows: usize, cols: usize, west: f64, north: f64, ns_res: f64, ew_res: f64) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions { width: cols, height: rows });
        }
        Self::new(
            north,
            north - rows as f64 * ns_res,
            west + cols as f64 * ew_res,
            west,
            ns_res,
            ew_res,
        )
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        ((self.north - self.south) / self.ns_res).round() as usize
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        ((self.east - self.west) / self.ew_res).round() as usize
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    /// Total number of cells
    pub fn cells(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Area of a single cell in squared map units
    pub fn cell_area(&self) -> f64 {
        self.ns_res * self.ew_res
    }

    /// Isotropic resolution (geometric mean of both axes)
    pub fn resolution(&self) -> f64 {
        (self.ns_res * self.ew_res).sqrt()
    }

    /// Length of the region diagonal in map units
    pub fn diagonal(&self) -> f64 {
        (self.north - self.south).hypot(self.east - self.west)
    }

    /// Map coordinates of the centre of cell (row, col)
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.west + (col as f64 + 0.5) * self.ew_res,
            self.north - (row as f64 + 0.5) * self.ns_res,
        )
    }

    /// Cell containing the map coordinate, if inside the region.
    ///
    /// The east and south edges belong to the last column and row.
    pub fn cell_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !self.contains(x, y) {
            return None;
        }
        let col = (((x - self.west) / self.ew_res).floor() as usize).min(self.cols() - 1);
        let row = (((self.north - y) / self.ns_res).floor() as usize).min(self.rows() - 1);
        Some((row, col))
    }

    /// Whether the point lies inside the region (edges inclusive)
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.west && x <= self.east && y >= self.south && y <= self.north
    }

    /// Clamp a point onto the region
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (x.clamp(self.west, self.east), y.clamp(self.south, self.north))
    }

    /// Sub-region of `rows` x `cols` cells starting at cell (row, col).
    pub fn window(&self, row: usize, col: usize, rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::DegenerateRegion(format!(
                "window of {rows}x{cols} cells at ({row}, {col})"
            )));
        }
        if row + rows > self.rows() || col + cols > self.cols() {
            return Err(Error::IndexOutOfBounds {
                row: row + rows,
                col: col + cols,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        let north = self.north - row as f64 * self.ns_res;
        let west = self.west + col as f64 * self.ew_res;
        Ok(Self {
            north,
            south: north - rows as f64 * self.ns_res,
            east: west + cols as f64 * self.ew_res,
            west,
            ns_res: self.ns_res,
            ew_res: self.ew_res,
        })
    }

    /// Grow the region outward by at least `distance` map units on every side,
    /// rounded up to whole cells.
    pub fn grow(&self, distance: f64) -> Result<Self> {
        if !(distance.is_finite() && distance >= 0.0) {
            return Err(Error::invalid_parameter("border", distance, "must be a non-negative number"));
        }
        let ns = (distance / self.ns_res - ALIGN_EPSILON).ceil().max(0.0) * self.ns_res;
        let ew = (distance / self.ew_res - ALIGN_EPSILON).ceil().max(0.0) * self.ew_res;
        Ok(Self {
            north: self.north + ns,
            south: self.south - ns,
            east: self.east + ew,
            west: self.west - ew,
            ..*self
        })
    }

    /// Intersection with `bounds`, keeping this region's resolution.
    ///
    /// Both regions must share a cell lattice; an empty intersection is a
    /// [`Error::DegenerateRegion`].
    pub fn clip_to(&self, bounds: &Region) -> Result<Self> {
        self.check_lattice(bounds)?;
        let north = self.north.min(bounds.north);
        let south = self.south.max(bounds.south);
        let east = self.east.min(bounds.east);
        let west = self.west.max(bounds.west);
        if north - south < self.ns_res * (1.0 - ALIGN_EPSILON)
            || east - west < self.ew_res * (1.0 - ALIGN_EPSILON)
        {
            return Err(Error::DegenerateRegion(format!(
                "clipping n={} s={} e={} w={} to n={} s={} e={} w={} leaves no cells",
                self.north, self.south, self.east, self.west,
                bounds.north, bounds.south, bounds.east, bounds.west
            )));
        }
        Ok(Self {
            north,
            south,
            east,
            west,
            ns_res: self.ns_res,
            ew_res: self.ew_res,
        })
    }

    /// Row/column offset of this region's north-west cell inside `parent`.
    ///
    /// Fails unless this region lies fully inside `parent` on the same lattice.
    pub fn offset_in(&self, parent: &Region) -> Result<(usize, usize)> {
        self.check_lattice(parent)?;
        let row = ((parent.north - self.north) / self.ns_res).round();
        let col = ((self.west - parent.west) / self.ew_res).round();
        if row < 0.0
            || col < 0.0
            || row as usize + self.rows() > parent.rows()
            || col as usize + self.cols() > parent.cols()
        {
            return Err(Error::RegionMismatch(format!(
                "region n={} s={} e={} w={} is not inside n={} s={} e={} w={}",
                self.north, self.south, self.east, self.west,
                parent.north, parent.south, parent.east, parent.west
            )));
        }
        Ok((row as usize, col as usize))
    }

    /// Whether both regions describe the same cells
    pub fn same_cells(&self, other: &Region) -> bool {
        self.shape() == other.shape() && matches!(self.offset_in(other), Ok((0, 0)))
    }

    fn check_lattice(&self, other: &Region) -> Result<()> {
        let same_res = (self.ns_res - other.ns_res).abs() <= self.ns_res * ALIGN_EPSILON
            && (self.ew_res - other.ew_res).abs() <= self.ew_res * ALIGN_EPSILON;
        if !same_res {
            return Err(Error::RegionMismatch(format!(
                "resolution {}x{} differs from {}x{}",
                self.ns_res, self.ew_res, other.ns_res, other.ew_res
            )));
        }
        let row_shift = (other.north - self.north) / self.ns_res;
        let col_shift = (self.west - other.west) / self.ew_res;
        if (row_shift - row_shift.round()).abs() > ALIGN_EPSILON
            || (col_shift - col_shift.round()).abs() > ALIGN_EPSILON
        {
            return Err(Error::RegionMismatch(format!(
                "region is shifted by ({row_shift}, {col_shift}) cells, not on a shared lattice"
            )));
        }
        Ok(())
    }
}
