//! # Earthworks Core
//!
//! Core types, traits and I/O for earthworks modelling.
//!
//! This crate provides:
//! - `Region`: rectangular, resolution-aligned extent
//! - `Grid`: dense scalar field over a region (`NaN` is no-data)
//! - `Attractor`: point carrying a target elevation
//! - Map-algebra primitives: evaluate, reduce, distance transform, zonal statistics
//! - Algorithm trait for a consistent API
//! - Minimal GeoTIFF I/O

pub mod algebra;
pub mod attractor;
pub mod error;
pub mod io;
pub mod raster;

pub use attractor::Attractor;
pub use error::{Error, Result};
pub use raster::{Grid, Region};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::algebra::{distance_transform, evaluate, reduce, zonal_stats, ReduceMethod};
    pub use crate::attractor::Attractor;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{Grid, Region};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
