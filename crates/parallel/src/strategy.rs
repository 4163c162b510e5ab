//! Task dispatch for independent partition computations

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use earthworks_core::{Error, Result};

/// Processing mode for independent tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

/// Strategy for running a batch of independent tasks
pub trait ParallelStrategy {
    /// Map a fallible task over indices and collect the results in index order.
    ///
    /// The first error aborts the batch and is returned; no partial result
    /// is produced.
    fn try_par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn try_par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => range.map(f).collect(),
            #[cfg(feature = "parallel")]
            ProcessingMode::Parallel => range.into_par_iter().map(f).collect(),
            #[cfg(feature = "parallel")]
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .map_err(|e| Error::Other(format!("Failed to build thread pool: {}", e)))?;
                pool.install(|| range.into_par_iter().map(f).collect())
            }
            #[cfg(not(feature = "parallel"))]
            ProcessingMode::Parallel | ProcessingMode::ParallelWith(_) => range.map(f).collect(),
        }
    }
}

impl ProcessingMode {
    /// Validate the requested thread count
    pub fn validate(&self) -> Result<()> {
        if let ProcessingMode::ParallelWith(0) = self {
            return Err(Error::invalid_parameter("threads", 0, "must be at least 1"));
        }
        Ok(())
    }

    /// Number of worker threads this mode will use
    pub fn threads(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::ParallelWith(n) => *n,
            #[cfg(feature = "parallel")]
            ProcessingMode::Parallel => rayon::current_num_threads(),
            #[cfg(not(feature = "parallel"))]
            ProcessingMode::Parallel => 1,
        }
    }
}
