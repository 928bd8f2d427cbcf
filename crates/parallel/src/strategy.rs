//! Parallel processing strategies

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::warn;

/// Processing mode for per-point work
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

impl ProcessingMode {
    /// Mode for a `--threads` style option: `None` or 0 means all cores,
    /// 1 means sequential.
    pub fn from_threads(threads: Option<usize>) -> Self {
        match threads {
            None | Some(0) => ProcessingMode::Parallel,
            Some(1) => ProcessingMode::Sequential,
            Some(n) => ProcessingMode::ParallelWith(n),
        }
    }

    /// Worker count this mode will use
    pub fn threads(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_cpus(),
            ProcessingMode::ParallelWith(n) => (*n).max(1),
        }
    }

    /// Run `op` inside a dedicated pool of `threads` workers. If the pool
    /// cannot be built the work runs on the global pool instead.
    fn install<R, OP>(threads: usize, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(op),
            Err(e) => {
                warn!(threads, error = %e, "thread pool unavailable, using global pool");
                op()
            }
        }
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Map a function over indices and collect results in index order
    fn par_map<T, F>(&self, range: Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;

    /// Like [`par_map`](Self::par_map), with per-worker scratch state
    /// created by `init` and reused across the indices that worker handles.
    fn par_map_init<T, S, I, F>(&self, range: Range<usize>, init: I, f: F) -> Vec<T>
    where
        T: Send,
        I: Fn() -> S + Sync + Send,
        F: Fn(&mut S, usize) -> T + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn par_map<T, F>(&self, range: Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => range.map(f).collect(),
            ProcessingMode::Parallel => range.into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => {
                Self::install(*threads, || range.into_par_iter().map(f).collect())
            }
        }
    }

    fn par_map_init<T, S, I, F>(&self, range: Range<usize>, init: I, f: F) -> Vec<T>
    where
        T: Send,
        I: Fn() -> S + Sync + Send,
        F: Fn(&mut S, usize) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => {
                let mut state = init();
                range.map(|i| f(&mut state, i)).collect()
            }
            ProcessingMode::Parallel => range.into_par_iter().map_init(init, f).collect(),
            ProcessingMode::ParallelWith(threads) => Self::install(*threads, || {
                range.into_par_iter().map_init(init, f).collect()
            }),
        }
    }
}

/// Get the number of available CPU cores
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}
