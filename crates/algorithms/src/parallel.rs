//! Fan-out strategies for per-site work

use crate::maybe_rayon::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Processing mode for the per-site fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global pool
    #[default]
    Parallel,
    /// Parallel on a dedicated pool with the given number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Map `f` over `0..len`, returning results in index order.
    ///
    /// Without the `parallel` feature every mode runs sequentially.
    pub fn par_map<T, F>(&self, len: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => (0..len).map(f).collect(),
            ProcessingMode::Parallel => (0..len).into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => with_pool(*threads, len, f),
        }
    }
}

#[cfg(feature = "parallel")]
fn with_pool<T, F>(threads: usize, len: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(|| (0..len).into_par_iter().map(f).collect()),
        Err(e) => {
            warn!("could not build a {}-thread pool ({}), using the global pool", threads, e);
            (0..len).into_par_iter().map(f).collect()
        }
    }
}

#[cfg(not(feature = "parallel"))]
fn with_pool<T, F>(threads: usize, len: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    warn!("built without the `parallel` feature, ignoring {} threads", threads);
    (0..len).map(f).collect()
}
