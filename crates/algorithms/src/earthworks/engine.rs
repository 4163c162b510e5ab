//! Earthworks engine
//!
//! Segments the source region with a quadtree, synthesizes and aggregates
//! each partition independently, then merges the partition surfaces with the
//! same selection rule used inside a partition.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use earthworks_core::{Algorithm, Attractor, Error, Grid, Result};
use earthworks_parallel::{partition, ParallelStrategy, ProcessingMode, QuadtreeParams};

use super::decay::DecayFunction;
use super::field::{candidates, joint_candidates, FieldParams, Mode, Operation, Synthesis};
use super::series::Series;
use super::volume::{difference, volume_summary, VolumeSummary};

/// Residual deviation below which an attractor no longer counts as
/// influencing a cell when the border is derived automatically
pub const BORDER_TOLERANCE: f64 = 1e-9;

/// Parameters for an earthworks run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthworksParams {
    pub operation: Operation,
    pub mode: Mode,
    pub function: DecayFunction,
    /// Decay rate (default 0.1)
    pub rate: f64,
    /// Radius of full influence around attractors (default 0)
    pub flat: f64,
    pub synthesis: Synthesis,
    pub quadtree: QuadtreeParams,
    pub processing: ProcessingMode,
}

impl Default for EarthworksParams {
    fn default() -> Self {
        Self {
            operation: Operation::CutFill,
            mode: Mode::Absolute,
            function: DecayFunction::Linear,
            rate: 0.1,
            flat: 0.0,
            synthesis: Synthesis::PerAttractor,
            quadtree: QuadtreeParams::default(),
            processing: ProcessingMode::default(),
        }
    }
}

impl EarthworksParams {
    /// Field synthesis subset of the parameters
    pub fn field(&self) -> FieldParams {
        FieldParams {
            mode: self.mode,
            function: self.function,
            rate: self.rate,
            flat: self.flat,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.field().validate()?;
        self.quadtree.validate()?;
        self.processing.validate()
    }
}

/// Output of [`earthworks`]
#[derive(Debug, Clone)]
pub struct EarthworksResult {
    /// Modelled surface over the region of the elevation grid
    pub earthworks: Grid,
    /// Number of partitions processed
    pub partitions: usize,
    /// Whether quadtree segmentation was applied
    pub segmented: bool,
}

/// Earthworks algorithm
#[derive(Debug, Clone, Default)]
pub struct Earthworks;

impl Algorithm for Earthworks {
    type Input = (Grid, Vec<Attractor>);
    type Output = EarthworksResult;
    type Params = EarthworksParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Earthworks"
    }

    fn description(&self) -> &'static str {
        "Model cut and fill around attractors with distance-decayed influence"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (elevation, attractors) = input;
        earthworks(&elevation, &attractors, params)
    }
}

/// Model cut and fill on `elevation` around `attractors`.
///
/// The elevation grid is read-only; the result covers its region. Any
/// failing partition aborts the whole run.
pub fn earthworks(elevation: &Grid, attractors: &[Attractor], params: EarthworksParams) -> Result<EarthworksResult> {
    params.validate()?;
    if attractors.is_empty() {
        return Err(Error::MissingInput("no attractors to model".into()));
    }

    let source = *elevation.region();
    let field = params.field();
    let operation = params.operation;
    let synthesis = params.synthesis;

    info!(
        "Earthworks: {} attractors, {} {} with {} decay (rate {}, flat {})",
        attractors.len(),
        params.mode,
        operation,
        params.function,
        params.rate,
        params.flat
    );

    let border = match params.quadtree.border {
        Some(border) => border,
        None => influence_border(elevation, attractors, &params),
    };
    let partitioning = partition(&source, attractors, &params.quadtree, border)?;

    if !partitioning.is_segmented() {
        let earthworks = synthesize(elevation, attractors, &field, operation, synthesis)?;
        return Ok(EarthworksResult {
            earthworks,
            partitions: 1,
            segmented: false,
        });
    }

    let parts = &partitioning.partitions;
    let surfaces = params.processing.try_par_map(0..parts.len(), |i| {
        let part = &parts[i];
        debug!(
            "Partition {}/{}: {} attractors over {}x{} cells",
            i + 1,
            parts.len(),
            part.attractors.len(),
            part.processing_region.rows(),
            part.processing_region.cols()
        );
        let local = elevation.window(&part.processing_region)?;
        synthesize(&local, &part.attractors, &field, operation, synthesis)
    })?;

    let mut merged = Series::new(source, operation);
    for surface in surfaces {
        merged.absorb_earthworks(surface, elevation)?;
    }

    Ok(EarthworksResult {
        earthworks: merged.finish(elevation)?,
        partitions: parts.len(),
        segmented: true,
    })
}

/// Run [`earthworks`] and difference the result against the elevation
pub fn earthworks_with_volume(
    elevation: &Grid,
    attractors: &[Attractor],
    params: EarthworksParams,
) -> Result<(EarthworksResult, Grid, VolumeSummary)> {
    let operation = params.operation;
    let result = earthworks(elevation, attractors, params)?;
    let volume = difference(elevation, &result.earthworks)?;
    let summary = volume_summary(&volume, operation)?;
    Ok((result, volume, summary))
}

/// Earthworks surface of `attractors` over the region of `elevation`
fn synthesize(
    elevation: &Grid,
    attractors: &[Attractor],
    field: &FieldParams,
    operation: Operation,
    synthesis: Synthesis,
) -> Result<Grid> {
    let mut series = Series::new(*elevation.region(), operation);
    match synthesis {
        Synthesis::Joint => series.absorb(joint_candidates(elevation, attractors, field, operation)?)?,
        Synthesis::PerAttractor => {
            for attractor in attractors {
                series.absorb(candidates(elevation, attractor, field, operation)?)?;
            }
        }
    }
    series.finish(elevation)
}

/// Distance beyond which no attractor changes a cell by more than
/// [`BORDER_TOLERANCE`], capped at the diagonal of the region
pub fn influence_border(elevation: &Grid, attractors: &[Attractor], params: &EarthworksParams) -> f64 {
    let stats = elevation.statistics();
    let magnitude = attractors
        .iter()
        .map(|a| match (params.mode, stats.min, stats.max) {
            (Mode::Relative, _, _) => a.target_z.abs(),
            (Mode::Absolute, Some(lo), Some(hi)) => (a.target_z - lo).abs().max((a.target_z - hi).abs()),
            (Mode::Absolute, _, _) => 0.0,
        })
        .fold(0.0, f64::max);

    let diagonal = elevation.region().diagonal();
    let reach = params
        .function
        .influence_radius(params.rate, magnitude, BORDER_TOLERANCE, diagonal);
    let border = (params.flat + reach).min(diagonal);
    debug!("Derived border {} from dz magnitude {}", border, magnitude);
    border
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use earthworks_core::Region;

    fn flat_grid(rows: usize, cols: usize, z: f64) -> Grid {
        let region = Region::from_shape(rows, cols, 0.0, rows as f64, 1.0, 1.0).unwrap();
        Grid::filled(region, z)
    }

    #[test]
    fn test_no_attractors_is_an_error() {
        let elev = flat_grid(4, 4, 0.0);
        assert!(matches!(
            earthworks(&elev, &[], EarthworksParams::default()),
            Err(Error::MissingInput(_))
        ));
    }

    #[test]
    fn test_invalid_rate_is_an_error() {
        let elev = flat_grid(4, 4, 0.0);
        let params = EarthworksParams {
            rate: -0.5,
            ..Default::default()
        };
        let out = earthworks(&elev, &[Attractor::new(1.0, 1.0, 1.0)], params);
        assert!(matches!(out, Err(Error::InvalidParameter { name: "rate", .. })));
    }

    #[test]
    fn test_small_grid_bypasses_segmentation() {
        let elev = flat_grid(10, 10, 0.0);
        let result = Earthworks
            .execute_default((elev, vec![Attractor::new(5.5, 4.5, 5.0)]))
            .unwrap();
        assert!(!result.segmented);
        assert_eq!(result.partitions, 1);
    }

    #[test]
    fn test_influence_border() {
        let elev = flat_grid(100, 100, 10.0);
        let params = EarthworksParams {
            rate: 0.5,
            flat: 2.0,
            ..Default::default()
        };
        let border = influence_border(&elev, &[Attractor::new(1.0, 1.0, 14.0)], &params);
        assert_relative_eq!(border, 2.0 + 4.0 / 0.5, epsilon = 1e-6);

        let relative = EarthworksParams {
            mode: Mode::Relative,
            ..params
        };
        let border = influence_border(&elev, &[Attractor::new(1.0, 1.0, -3.0)], &relative);
        assert_relative_eq!(border, 2.0 + 3.0 / 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_explicit_border_is_used() {
        let elev = flat_grid(40, 40, 0.0);
        let attractors: Vec<_> = (0..40)
            .map(|i| Attractor::new(i as f64 + 0.5, 39.5 - i as f64, 1.0))
            .collect();
        let params = EarthworksParams {
            rate: 1.0,
            quadtree: QuadtreeParams {
                threshold: 4,
                min_cells: 0,
                border: Some(2.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = earthworks(&elev, &attractors, params).unwrap();
        assert!(result.segmented);
        assert!(result.partitions > 1);
    }

    #[test]
    fn test_with_volume() {
        let elev = flat_grid(10, 10, 0.0);
        let params = EarthworksParams {
            operation: Operation::Fill,
            rate: 1.0,
            ..Default::default()
        };
        let (result, volume, summary) =
            earthworks_with_volume(&elev, &[Attractor::new(5.5, 4.5, 2.0)], params).unwrap();
        assert_relative_eq!(result.earthworks.get(5, 5).unwrap(), 2.0);
        assert_relative_eq!(volume.get(5, 5).unwrap(), 2.0);
        assert!(summary.net_fill > 0.0);
        assert_eq!(summary.net_cut, 0.0);
    }
}
