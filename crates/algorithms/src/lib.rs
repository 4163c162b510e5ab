//! # Earthworks Algorithms
//!
//! Cut and fill modelling for Earthworks.
//!
//! ## Modules
//!
//! - **earthworks**: decay functions, field synthesis, aggregation, volume, engine

pub mod earthworks;
pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::earthworks::{
        earthworks, earthworks_with_volume, attractors_from_coordinates, attractors_from_raster,
        difference, volume_summary,
        DecayFunction, Earthworks, EarthworksParams, EarthworksResult, Mode, Operation, Synthesis,
        VolumeSummary,
    };
    pub use earthworks_core::prelude::*;
    pub use earthworks_parallel::{ProcessingMode, QuadtreeParams};
}
