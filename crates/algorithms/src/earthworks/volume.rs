//! Volumetric change between the original and modelled surfaces

use serde::{Deserialize, Serialize};

use earthworks_core::algebra::zonal_stats;
use earthworks_core::{Grid, Result};

use super::field::Operation;

/// `earthworks - elevation` at every cell
pub fn difference(elevation: &Grid, earthworks: &Grid) -> Result<Grid> {
    earthworks.zip_map(elevation, |e, z| e - z)
}

/// Net volumes in cubic map units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeSummary {
    pub operation: Operation,
    /// Area of one cell (`ns_res * ew_res`)
    pub cell_area: f64,
    /// Signed sum of all changes
    pub net_change: f64,
    /// Sum of raised cells, `>= 0`
    pub net_fill: f64,
    /// Sum of lowered cells, `<= 0`
    pub net_cut: f64,
}

impl VolumeSummary {
    /// Figures relevant to the operation, labelled
    pub fn reported(&self) -> Vec<(&'static str, f64)> {
        let mut out = Vec::with_capacity(3);
        if self.operation == Operation::CutFill {
            out.push(("Net change", self.net_change));
        }
        if self.operation.wants_fill() {
            out.push(("Net fill", self.net_fill));
        }
        if self.operation.wants_cut() {
            out.push(("Net cut", self.net_cut));
        }
        out
    }

    /// Human-readable report lines, e.g. `Net fill: 12.5 cubic meters`
    pub fn lines(&self, units: &str) -> Vec<String> {
        self.reported()
            .into_iter()
            .map(|(label, value)| format!("{}: {} cubic {}", label, value, units.to_lowercase()))
            .collect()
    }
}

/// Summarise a volume grid produced by [`difference`].
///
/// Sums over empty selections report `0.0`.
pub fn volume_summary(volume: &Grid, operation: Operation) -> Result<VolumeSummary> {
    let cell_area = volume.region().cell_area();

    let raised = volume.map(|v| if v > 0.0 { 1.0 } else { f64::NAN });
    let lowered = volume.map(|v| if v < 0.0 { 1.0 } else { f64::NAN });

    let net = |sum: f64| if sum.is_nan() { 0.0 } else { cell_area * sum };

    Ok(VolumeSummary {
        operation,
        cell_area,
        net_change: net(zonal_stats(volume, None)?.sum),
        net_fill: net(zonal_stats(volume, Some(&raised))?.sum),
        net_cut: net(zonal_stats(volume, Some(&lowered))?.sum),
    })
}
