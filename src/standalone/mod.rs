//! An in-process MapReduce engine.
//!
//! Map tasks run over input partitions on a dedicated worker pool, their
//! output is shuffled into `n_reduce` hash buckets, and each bucket is
//! reduced independently.

pub mod engine;

/// Sizing of one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Worker threads, and the number of map partitions.
    pub num_workers: usize,
    /// Reduce buckets.
    pub num_reduce: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_workers: 3,
            num_reduce: 11,
        }
    }
}

impl EngineConfig {
    pub fn new(num_workers: usize, num_reduce: u32) -> Self {
        Self {
            num_workers: num_workers.max(1),
            num_reduce: num_reduce.max(1),
        }
    }
}
