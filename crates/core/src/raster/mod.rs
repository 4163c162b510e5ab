//! Grid data structures and regions

mod grid;
mod region;

pub use grid::{Grid, GridStatistics};
pub use region::Region;
