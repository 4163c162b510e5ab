//! Quadtree segmentation of the source region
//!
//! Recursively quarters the source region until each leaf holds at most
//! `threshold` attractors. Leaves that hold attractors become partitions whose
//! processing region is grown by a border and clipped to the source region, so
//! that influence crossing a seam is still computed on both sides of it.
//!
//! Splits happen on whole rows and columns, so every leaf stays on the source
//! lattice and the leaves tile the source region exactly.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use earthworks_core::{Attractor, Error, Region, Result};

/// Parameters for quadtree segmentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadtreeParams {
    /// Segment at all. When false the whole region is one partition.
    pub enabled: bool,
    /// Attractor count at or below which a region is not subdivided.
    /// A leaf may still exceed it when it cannot be split any further.
    pub threshold: usize,
    /// Border in map units added around each partition before synthesis.
    /// `None` lets the engine derive it from the decay function's reach.
    pub border: Option<f64>,
    /// Grids with fewer cells than this are never segmented.
    pub min_cells: usize,
    /// Recursion guard for dense clusters of coincident attractors.
    pub max_depth: usize,
}

impl Default for QuadtreeParams {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 50,
            border: None,
            min_cells: 10_000,
            max_depth: 12,
        }
    }
}

impl QuadtreeParams {
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(Error::invalid_parameter("threshold", self.threshold, "must be at least 1"));
        }
        if let Some(border) = self.border {
            if !(border.is_finite() && border >= 0.0) {
                return Err(Error::invalid_parameter("border", border, "must be a non-negative number"));
            }
        }
        Ok(())
    }
}

/// A sub-region and the attractors it owns
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Quadtree leaf; leaves tile the source region
    pub region: Region,
    /// `region` grown by the border and clipped to the source region
    pub processing_region: Region,
    pub attractors: Vec<Attractor>,
}

/// A quadtree leaf before pruning
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub region: Region,
    pub attractors: Vec<Attractor>,
    pub depth: usize,
}

/// Why segmentation was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bypass {
    Disabled,
    SmallGrid { cells: usize, min_cells: usize },
    BelowThreshold { attractors: usize, threshold: usize },
}

impl fmt::Display for Bypass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bypass::Disabled => write!(f, "segmentation disabled"),
            Bypass::SmallGrid { cells, min_cells } => {
                write!(f, "grid has {} cells, fewer than {}", cells, min_cells)
            }
            Bypass::BelowThreshold { attractors, threshold } => {
                write!(f, "{} attractors do not exceed the threshold of {}", attractors, threshold)
            }
        }
    }
}

/// Result of [`partition`]
#[derive(Debug, Clone)]
pub struct Partitioning {
    pub partitions: Vec<Partition>,
    /// Set when the whole source region was kept as a single partition
    pub bypass: Option<Bypass>,
    /// Border actually applied, in map units
    pub border: f64,
}

impl Partitioning {
    pub fn is_segmented(&self) -> bool {
        self.bypass.is_none()
    }
}

/// Split `source` into partitions of at most `params.threshold` attractors.
///
/// `border` is the padding in map units applied to every partition (callers
/// usually resolve `params.border` first). Leaves without attractors are
/// pruned. A processing region that ends up with no cells is an error.
pub fn partition(
    source: &Region,
    attractors: &[Attractor],
    params: &QuadtreeParams,
    border: f64,
) -> Result<Partitioning> {
    params.validate()?;
    if !(border.is_finite() && border >= 0.0) {
        return Err(Error::invalid_parameter("border", border, "must be a non-negative number"));
    }

    let bypass = if !params.enabled {
        Some(Bypass::Disabled)
    } else if source.cells() < params.min_cells {
        Some(Bypass::SmallGrid {
            cells: source.cells(),
            min_cells: params.min_cells,
        })
    } else if attractors.len() <= params.threshold {
        Some(Bypass::BelowThreshold {
            attractors: attractors.len(),
            threshold: params.threshold,
        })
    } else {
        None
    };

    if let Some(reason) = bypass {
        info!("Skipping quadtree segmentation: {}", reason);
        return Ok(Partitioning {
            partitions: vec![Partition {
                region: *source,
                processing_region: *source,
                attractors: attractors.to_vec(),
            }],
            bypass,
            border,
        });
    }

    let all_leaves = leaves(source, attractors, params)?;
    let leaf_count = all_leaves.len();
    let partitions = all_leaves
        .into_iter()
        .filter(|leaf| !leaf.attractors.is_empty())
        .map(|leaf| {
            let processing_region = leaf.region.grow(border)?.clip_to(source)?;
            Ok(Partition {
                region: leaf.region,
                processing_region,
                attractors: leaf.attractors,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Quadtree segmentation: {} partitions from {} leaves (border {})",
        partitions.len(),
        leaf_count,
        border
    );

    Ok(Partitioning {
        partitions,
        bypass: None,
        border,
    })
}

/// All quadtree leaves of `source`, including empty ones.
///
/// Every attractor lands in exactly one leaf: split lines belong to the
/// north and east children, and attractors outside the source region are
/// assigned by clamping them onto it.
pub fn leaves(source: &Region, attractors: &[Attractor], params: &QuadtreeParams) -> Result<Vec<Leaf>> {
    params.validate()?;
    let mut out = Vec::new();
    let root = Window {
        row: 0,
        col: 0,
        rows: source.rows(),
        cols: source.cols(),
    };
    subdivide(source, root, attractors.to_vec(), 0, params, &mut out)?;
    Ok(out)
}

/// Cell window inside the source region
#[derive(Debug, Clone, Copy)]
struct Window {
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
}

fn subdivide(
    source: &Region,
    window: Window,
    members: Vec<Attractor>,
    depth: usize,
    params: &QuadtreeParams,
    out: &mut Vec<Leaf>,
) -> Result<()> {
    let region = source.window(window.row, window.col, window.rows, window.cols)?;
    let splittable = window.rows >= 2 || window.cols >= 2;

    if members.len() <= params.threshold || depth >= params.max_depth || !splittable {
        if members.len() > params.threshold {
            warn!(
                "Quadtree leaf at depth {} keeps {} attractors above threshold {}",
                depth,
                members.len(),
                params.threshold
            );
        }
        out.push(Leaf {
            region,
            attractors: members,
            depth,
        });
        return Ok(());
    }

    let row_halves = halves(window.row, window.rows);
    let col_halves = halves(window.col, window.cols);
    let y_split = source.north - row_halves[row_halves.len() - 1].0 as f64 * source.ns_res;
    let x_split = source.west + col_halves[col_halves.len() - 1].0 as f64 * source.ew_res;

    // NW, NE, SW, SE
    let mut buckets: Vec<Vec<Attractor>> = vec![Vec::new(); row_halves.len() * col_halves.len()];
    for attractor in members {
        let (x, y) = source.clamp(attractor.x, attractor.y);
        let ri = usize::from(row_halves.len() == 2 && y < y_split);
        let ci = usize::from(col_halves.len() == 2 && x >= x_split);
        buckets[ri * col_halves.len() + ci].push(attractor);
    }

    debug!(
        "Quadtree split at depth {}: {}x{} cells into {:?}",
        depth,
        window.rows,
        window.cols,
        buckets.iter().map(Vec::len).collect::<Vec<_>>()
    );

    let mut buckets = buckets.into_iter();
    for &(row, rows) in &row_halves {
        for &(col, cols) in &col_halves {
            let bucket = buckets.next().unwrap_or_default();
            subdivide(source, Window { row, col, rows, cols }, bucket, depth + 1, params, out)?;
        }
    }
    Ok(())
}

/// Bisect `[start, start + len)`; an axis of one cell is not split.
fn halves(start: usize, len: usize) -> Vec<(usize, usize)> {
    if len < 2 {
        vec![(start, len)]
    } else {
        let half = len / 2;
        vec![(start, half), (start + half, len - half)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(rows: usize, cols: usize) -> Region {
        Region::from_shape(rows, cols, 0.0, rows as f64, 1.0, 1.0).unwrap()
    }

    fn scattered(n: usize, extent: f64) -> Vec<Attractor> {
        (0..n)
            .map(|i| {
                let f = i as f64;
                Attractor::new((f * 7.31) % extent, (f * 3.17 + 0.5) % extent, f)
            })
            .collect()
    }

    fn params(threshold: usize) -> QuadtreeParams {
        QuadtreeParams {
            threshold,
            min_cells: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_leaves_tile_source_exactly() {
        let src = source(37, 53);
        let attractors = scattered(200, 37.0);
        let all = leaves(&src, &attractors, &params(5)).unwrap();

        let mut covered = vec![vec![0u8; 53]; 37];
        for leaf in &all {
            let (r0, c0) = leaf.region.offset_in(&src).unwrap();
            for r in r0..r0 + leaf.region.rows() {
                for c in c0..c0 + leaf.region.cols() {
                    covered[r][c] += 1;
                }
            }
        }
        assert!(covered.iter().flatten().all(|&n| n == 1), "leaves must tile without gaps or overlaps");
    }

    #[test]
    fn test_every_attractor_assigned_once() {
        let src = source(64, 64);
        let mut attractors = scattered(300, 64.0);
        // on split lines and outside the source region
        attractors.push(Attractor::new(32.0, 32.0, 1.0));
        attractors.push(Attractor::new(-5.0, 70.0, 2.0));

        let all = leaves(&src, &attractors, &params(8)).unwrap();
        let total: usize = all.iter().map(|l| l.attractors.len()).sum();
        assert_eq!(total, attractors.len());
        assert!(all.iter().all(|l| l.attractors.len() <= 8));
    }

    #[test]
    fn test_partition_prunes_empty_and_grows_border() {
        let src = source(100, 100);
        let mut attractors = scattered(40, 25.0);
        attractors.extend(scattered(40, 25.0).into_iter().map(|a| Attractor::new(a.x + 75.0, a.y + 75.0, a.target_z)));

        let result = partition(&src, &attractors, &params(10), 3.0).unwrap();
        assert!(result.is_segmented());
        assert!(result.partitions.len() >= 8);
        for p in &result.partitions {
            assert!(!p.attractors.is_empty());
            let (r, c) = p.region.offset_in(&p.processing_region).unwrap();
            assert!(r <= 3 && c <= 3);
            p.processing_region.offset_in(&src).unwrap();
        }
        let total: usize = result.partitions.iter().map(|p| p.attractors.len()).sum();
        assert_eq!(total, attractors.len());
    }

    #[test]
    fn test_bypass_reasons() {
        let src = source(20, 20);
        let attractors = scattered(10, 20.0);

        let disabled = QuadtreeParams { enabled: false, ..params(1) };
        let r = partition(&src, &attractors, &disabled, 1.0).unwrap();
        assert_eq!(r.bypass, Some(Bypass::Disabled));
        assert_eq!(r.partitions.len(), 1);
        assert_eq!(r.partitions[0].processing_region, src);

        let small = QuadtreeParams { min_cells: 1000, ..params(1) };
        let r = partition(&src, &attractors, &small, 1.0).unwrap();
        assert!(matches!(r.bypass, Some(Bypass::SmallGrid { .. })));

        let r = partition(&src, &attractors, &params(10), 1.0).unwrap();
        assert!(matches!(r.bypass, Some(Bypass::BelowThreshold { .. })));
        assert_eq!(r.partitions[0].attractors.len(), 10);
    }

    #[test]
    fn test_coincident_attractors_terminate() {
        let src = source(16, 16);
        let attractors = vec![Attractor::new(4.5, 4.5, 1.0); 100];
        let all = leaves(&src, &attractors, &params(3)).unwrap();
        let dense: Vec<_> = all.iter().filter(|l| !l.attractors.is_empty()).collect();
        assert_eq!(dense.len(), 1);
        assert_eq!(dense[0].region.shape(), (1, 1));
        assert_eq!(dense[0].attractors.len(), 100);
    }

    #[test]
    fn test_thin_region_splits_one_axis() {
        let src = source(1, 64);
        let attractors = scattered(64, 64.0)
            .into_iter()
            .map(|a| Attractor::new(a.x, 0.5, a.target_z))
            .collect::<Vec<_>>();
        let all = leaves(&src, &attractors, &params(4)).unwrap();
        assert!(all.iter().all(|l| l.region.rows() == 1));
        assert!(all.len() > 1);
    }

    #[test]
    fn test_invalid_params() {
        let src = source(4, 4);
        assert!(partition(&src, &[], &params(0), 1.0).is_err());
        assert!(partition(&src, &[], &params(1), -1.0).is_err());
    }
}
