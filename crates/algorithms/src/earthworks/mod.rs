//! Attractor-driven earthworks modelling
//!
//! - Decay: attenuation laws applied to attractor offsets
//! - Field: candidate cut and fill surfaces per attractor, jointly, or from seed cells
//! - Series: order-independent aggregation of candidates
//! - Volume: change grid and net cut/fill figures
//! - Input: attractors from spot rasters and coordinate lists
//! - Engine: quadtree-partitioned synthesis over an elevation grid

mod decay;
mod engine;
mod field;
mod input;
mod series;
mod volume;

pub use decay::{validate_rate, DecayFunction};
pub use engine::{
    earthworks, earthworks_with_volume, influence_border, Earthworks, EarthworksParams, EarthworksResult,
    BORDER_TOLERANCE,
};
pub use field::{
    candidates, flat_clamp, horizontal_distance, joint_candidates, seed_candidates, Candidates, FieldParams, Mode,
    Operation, Synthesis,
};
pub use input::{attractors_from_coordinates, attractors_from_raster, parse_coordinate_list, parse_z_list};
pub use series::{aggregate, select, Series};
pub use volume::{difference, volume_summary, VolumeSummary};
