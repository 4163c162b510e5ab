//! Attractor field synthesis
//!
//! Turns attractors into candidate cut and fill surfaces over the region of
//! an elevation grid. For an attractor at horizontal distance `d` from a cell
//! with elevation `z`:
//!
//! ```text
//! dz   = target_z            (relative)
//!      = target_z - z        (absolute)
//! cut  = z + growth(dz, d)   if <= z, else no-data
//! fill = z + decay(dz, d)    if >= z, else no-data
//! ```
//!
//! `d` is reduced by the flat radius first, so cells within `flat` of the
//! attractor receive its full offset.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use earthworks_core::algebra::{distance_transform, evaluate, ReduceMethod};
use earthworks_core::{Attractor, Error, Grid, Result};

use super::decay::{validate_rate, DecayFunction};
use crate::maybe_rayon::*;

/// Earthworks operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Only lower the surface
    Cut,
    /// Only raise the surface
    Fill,
    /// Lower or raise, chosen per cell
    #[default]
    CutFill,
}

impl Operation {
    pub fn wants_cut(self) -> bool {
        matches!(self, Operation::Cut | Operation::CutFill)
    }

    pub fn wants_fill(self) -> bool {
        matches!(self, Operation::Fill | Operation::CutFill)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Cut => f.write_str("cut"),
            Operation::Fill => f.write_str("fill"),
            Operation::CutFill => f.write_str("cutfill"),
        }
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cut" => Ok(Operation::Cut),
            "fill" => Ok(Operation::Fill),
            "cutfill" | "cut-fill" => Ok(Operation::CutFill),
            _ => Err(Error::invalid_parameter("operation", s, "expected cut, fill or cutfill")),
        }
    }
}

/// How an attractor's target elevation is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Offset added to the existing surface
    Relative,
    /// Elevation the surface is pulled towards
    #[default]
    Absolute,
}

impl Mode {
    /// Vertical offset an attractor asks for at a cell of elevation `z`
    #[inline]
    pub fn delta_z(self, target_z: f64, z: f64) -> f64 {
        match self {
            Mode::Relative => target_z,
            Mode::Absolute => target_z - z,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Relative => f.write_str("relative"),
            Mode::Absolute => f.write_str("absolute"),
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "relative" => Ok(Mode::Relative),
            "absolute" => Ok(Mode::Absolute),
            _ => Err(Error::invalid_parameter("mode", s, "expected relative or absolute")),
        }
    }
}

/// Parameters for field synthesis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldParams {
    pub mode: Mode,
    pub function: DecayFunction,
    /// Decay rate, strictly positive
    pub rate: f64,
    /// Radius of full influence around each attractor, in map units
    pub flat: f64,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            mode: Mode::Absolute,
            function: DecayFunction::Linear,
            rate: 0.1,
            flat: 0.0,
        }
    }
}

impl FieldParams {
    pub fn validate(&self) -> Result<()> {
        validate_rate(self.rate)?;
        if !(self.flat.is_finite() && self.flat >= 0.0) {
            return Err(Error::invalid_parameter("flat", self.flat, "must be a non-negative number"));
        }
        Ok(())
    }

    /// Cut candidate for a cell of elevation `z` at distance `d`
    #[inline]
    pub fn cut_value(&self, z: f64, target_z: f64, d: f64) -> f64 {
        let dz = self.mode.delta_z(target_z, z);
        let v = z + self.function.growth(dz, flat_clamp(d, self.flat), self.rate);
        if v <= z {
            v
        } else {
            f64::NAN
        }
    }

    /// Fill candidate for a cell of elevation `z` at distance `d`
    #[inline]
    pub fn fill_value(&self, z: f64, target_z: f64, d: f64) -> f64 {
        let dz = self.mode.delta_z(target_z, z);
        let v = z + self.function.decay(dz, flat_clamp(d, self.flat), self.rate);
        if v >= z {
            v
        } else {
            f64::NAN
        }
    }
}

/// Distance with the flat radius removed: `0` inside it, `d - flat` beyond
#[inline]
pub fn flat_clamp(d: f64, flat: f64) -> f64 {
    if d <= flat {
        0.0
    } else {
        d - flat
    }
}

/// Horizontal distance from a point to an attractor after the flat clamp
pub fn horizontal_distance(attractor: &Attractor, x: f64, y: f64, flat: f64) -> f64 {
    flat_clamp(attractor.dist(x, y), flat)
}

/// Candidate surfaces; each is present only when the operation asks for it
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    pub cut: Option<Grid>,
    pub fill: Option<Grid>,
}

/// How candidates are produced for a set of attractors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Synthesis {
    /// One candidate pair per attractor, reduced afterwards
    #[default]
    PerAttractor,
    /// A single pass reducing over all attractors at every cell
    Joint,
}

/// Candidate surfaces of a single attractor over the region of `elevation`
pub fn candidates(
    elevation: &Grid,
    attractor: &Attractor,
    params: &FieldParams,
    operation: Operation,
) -> Result<Candidates> {
    params.validate()?;
    let region = elevation.region();
    let z = elevation.data();

    let surface = |value: fn(&FieldParams, f64, f64, f64) -> f64| {
        evaluate(region, |cell| {
            let elev = z[(cell.row, cell.col)];
            if elev.is_nan() {
                return f64::NAN;
            }
            value(params, elev, attractor.target_z, attractor.dist(cell.x, cell.y))
        })
    };

    Ok(Candidates {
        cut: operation.wants_cut().then(|| surface(FieldParams::cut_value)),
        fill: operation.wants_fill().then(|| surface(FieldParams::fill_value)),
    })
}

/// Candidate surfaces of all `attractors`, reduced in one pass.
///
/// Equal to calling [`candidates`] per attractor and reducing the cuts by
/// minimum and the fills by maximum.
pub fn joint_candidates(
    elevation: &Grid,
    attractors: &[Attractor],
    params: &FieldParams,
    operation: Operation,
) -> Result<Candidates> {
    params.validate()?;
    let region = *elevation.region();
    let (rows, cols) = region.shape();
    let z = elevation.data();

    let pairs: Vec<(f64, f64)> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![(f64::NAN, f64::NAN); cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let elev = z[(row, col)];
                if elev.is_nan() {
                    continue;
                }
                let (x, y) = region.cell_center(row, col);

                let (mut cut, mut fill) = (f64::NAN, f64::NAN);
                for a in attractors {
                    let d = a.dist(x, y);
                    if operation.wants_cut() {
                        cut = ReduceMethod::Minimum.combine(cut, params.cut_value(elev, a.target_z, d));
                    }
                    if operation.wants_fill() {
                        fill = ReduceMethod::Maximum.combine(fill, params.fill_value(elev, a.target_z, d));
                    }
                }
                *out = (cut, fill);
            }

            row_data
        })
        .collect();

    let cut = if operation.wants_cut() {
        Some(Grid::from_vec(region, pairs.iter().map(|p| p.0).collect())?)
    } else {
        None
    };
    let fill = if operation.wants_fill() {
        Some(Grid::from_vec(region, pairs.iter().map(|p| p.1).collect())?)
    } else {
        None
    };
    Ok(Candidates { cut, fill })
}

/// Candidate surfaces from seed cells.
///
/// Every valid cell of `seeds` is an attractor carrying its value; each cell
/// of `elevation` takes its distance and target from the nearest seed, so a
/// cell is influenced by one seed only.
pub fn seed_candidates(
    elevation: &Grid,
    seeds: &Grid,
    params: &FieldParams,
    operation: Operation,
) -> Result<Candidates> {
    params.validate()?;
    elevation.check_same_cells(seeds)?;
    let (distance, nearest) = distance_transform(seeds)?;

    let surface = |value: fn(&FieldParams, f64, f64, f64) -> f64| {
        evaluate(elevation.region(), |cell| {
            let idx = (cell.row, cell.col);
            let elev = elevation.data()[idx];
            if elev.is_nan() {
                return f64::NAN;
            }
            value(params, elev, nearest.data()[idx], distance.data()[idx])
        })
    };

    Ok(Candidates {
        cut: operation.wants_cut().then(|| surface(FieldParams::cut_value)),
        fill: operation.wants_fill().then(|| surface(FieldParams::fill_value)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use earthworks_core::algebra::reduce;
    use earthworks_core::Region;

    fn flat_grid(rows: usize, cols: usize, z: f64) -> Grid {
        let region = Region::from_shape(rows, cols, 0.0, rows as f64, 1.0, 1.0).unwrap();
        Grid::filled(region, z)
    }

    fn linear(rate: f64) -> FieldParams {
        FieldParams {
            rate,
            ..Default::default()
        }
    }

    #[test]
    fn test_flat_clamp() {
        assert_eq!(flat_clamp(1.5, 2.0), 0.0);
        assert_eq!(flat_clamp(2.0, 2.0), 0.0);
        assert_relative_eq!(flat_clamp(3.5, 2.0), 1.5);
        let a = Attractor::new(0.0, 0.0, 1.0);
        assert_relative_eq!(horizontal_distance(&a, 3.0, 4.0, 1.0), 4.0);
    }

    #[test]
    fn test_delta_z() {
        assert_eq!(Mode::Relative.delta_z(3.0, 10.0), 3.0);
        assert_eq!(Mode::Absolute.delta_z(3.0, 10.0), -7.0);
    }

    #[test]
    fn test_fill_cone() {
        let elev = flat_grid(10, 10, 0.0);
        let a = Attractor::new(5.5, 4.5, 5.0);
        let c = candidates(&elev, &a, &linear(1.0), Operation::Fill).unwrap();
        assert!(c.cut.is_none());
        let fill = c.fill.unwrap();
        assert_relative_eq!(fill.get(5, 5).unwrap(), 5.0);
        assert_relative_eq!(fill.get(5, 3).unwrap(), 3.0);
        assert_relative_eq!(fill.get(5, 0).unwrap(), 0.0);
        assert!(fill.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_cut_never_raises() {
        let elev = flat_grid(8, 8, 10.0);
        let a = Attractor::new(4.0, 4.0, 2.0);
        for function in DecayFunction::ALL {
            let params = FieldParams {
                function,
                rate: 0.5,
                ..Default::default()
            };
            let cut = candidates(&elev, &a, &params, Operation::Cut).unwrap().cut.unwrap();
            for &v in cut.data().iter().filter(|v| !v.is_nan()) {
                assert!(v <= 10.0, "{} raised the surface to {}", function, v);
            }
        }
    }

    #[test]
    fn test_relative_mode_offsets_surface() {
        let elev = flat_grid(5, 5, 100.0);
        let a = Attractor::new(2.5, 2.5, -3.0);
        let params = FieldParams {
            mode: Mode::Relative,
            function: DecayFunction::Exponential,
            rate: 1.0,
            flat: 0.0,
        };
        let c = candidates(&elev, &a, &params, Operation::CutFill).unwrap();
        assert_relative_eq!(c.cut.unwrap().get(2, 2).unwrap(), 97.0);
        // a negative offset never yields a fill above the surface
        assert!(c.fill.unwrap().get(2, 2).unwrap().is_nan());
    }

    #[test]
    fn test_flat_radius_keeps_full_offset() {
        let elev = flat_grid(9, 9, 0.0);
        let a = Attractor::new(4.5, 4.5, 4.0);
        let params = FieldParams {
            flat: 2.0,
            ..linear(1.0)
        };
        let fill = candidates(&elev, &a, &params, Operation::Fill).unwrap().fill.unwrap();
        assert_relative_eq!(fill.get(4, 6).unwrap(), 4.0);
        assert_relative_eq!(fill.get(4, 7).unwrap(), 3.0);
    }

    #[test]
    fn test_nodata_elevation_stays_nodata() {
        let mut elev = flat_grid(3, 3, 0.0);
        elev.set(1, 1, f64::NAN).unwrap();
        let a = Attractor::new(1.5, 1.5, 2.0);
        let c = candidates(&elev, &a, &linear(1.0), Operation::CutFill).unwrap();
        assert!(c.fill.unwrap().get(1, 1).unwrap().is_nan());
        let j = joint_candidates(&elev, &[a], &linear(1.0), Operation::CutFill).unwrap();
        assert!(j.fill.unwrap().get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_joint_matches_per_attractor_reduction() {
        let region = Region::from_shape(12, 12, 0.0, 12.0, 1.0, 1.0).unwrap();
        let elev = Grid::from_fn(region, |x, y| 0.3 * x - 0.2 * y);
        let attractors = vec![
            Attractor::new(2.0, 3.0, 4.0),
            Attractor::new(9.0, 9.0, -3.0),
            Attractor::new(6.0, 6.0, 1.0),
        ];
        let params = FieldParams {
            function: DecayFunction::Gaussian,
            rate: 2.0,
            ..Default::default()
        };

        let per: Vec<Candidates> = attractors
            .iter()
            .map(|a| candidates(&elev, a, &params, Operation::CutFill).unwrap())
            .collect();
        let cuts: Vec<Grid> = per.iter().filter_map(|c| c.cut.clone()).collect();
        let fills: Vec<Grid> = per.iter().filter_map(|c| c.fill.clone()).collect();
        let min_cut = reduce(&cuts, ReduceMethod::Minimum).unwrap();
        let max_fill = reduce(&fills, ReduceMethod::Maximum).unwrap();

        let joint = joint_candidates(&elev, &attractors, &params, Operation::CutFill).unwrap();
        let (jc, jf) = (joint.cut.unwrap(), joint.fill.unwrap());
        for (a, b) in jc.data().iter().zip(min_cut.data().iter()) {
            assert!((a.is_nan() && b.is_nan()) || a == b);
        }
        for (a, b) in jf.data().iter().zip(max_fill.data().iter()) {
            assert!((a.is_nan() && b.is_nan()) || a == b);
        }
    }

    #[test]
    fn test_seed_candidates_use_nearest_seed() {
        let elev = flat_grid(1, 10, 0.0);
        let mut seeds = Grid::nodata(*elev.region());
        seeds.set(0, 0, 3.0).unwrap();
        seeds.set(0, 9, 6.0).unwrap();

        let fill = seed_candidates(&elev, &seeds, &linear(1.0), Operation::Fill)
            .unwrap()
            .fill
            .unwrap();
        assert_relative_eq!(fill.get(0, 0).unwrap(), 3.0);
        assert_relative_eq!(fill.get(0, 2).unwrap(), 1.0);
        assert_relative_eq!(fill.get(0, 9).unwrap(), 6.0);
        assert_relative_eq!(fill.get(0, 6).unwrap(), 3.0);
        // nearest seed is the low one, which has decayed below the surface
        assert!(fill.get(0, 4).unwrap().is_nan());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let elev = flat_grid(2, 2, 0.0);
        let a = Attractor::new(1.0, 1.0, 1.0);
        assert!(candidates(&elev, &a, &linear(0.0), Operation::Cut).is_err());
        let negative_flat = FieldParams {
            flat: -1.0,
            ..Default::default()
        };
        assert!(joint_candidates(&elev, &[a], &negative_flat, Operation::Fill).is_err());
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("CutFill".parse::<Operation>().unwrap(), Operation::CutFill);
        assert_eq!("relative".parse::<Mode>().unwrap(), Mode::Relative);
        assert!("both".parse::<Operation>().is_err());
        assert_eq!(Operation::Fill.to_string(), "fill");
    }
}
