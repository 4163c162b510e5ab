//! # Earthworks Parallel
//!
//! Spatial segmentation and task dispatch for earthworks modelling.
//!
//! This crate provides:
//! - Quadtree segmentation of the source region into attractor partitions
//! - Sequential or Rayon-backed dispatch of independent partition tasks

pub mod quadtree;
pub mod strategy;

pub use quadtree::{partition, Bypass, Partition, Partitioning, QuadtreeParams};
pub use strategy::{ParallelStrategy, ProcessingMode};
