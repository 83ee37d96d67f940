//! Per-user API billing over access logs, computed with MapReduce.
//!
//! Every log line is priced against a [`rates::RateTable`] and the priced
//! lines are summed per user. The same aggregation can run as a single
//! sequential fold or as a map/shuffle/reduce job over a pool of workers;
//! see [`strategy`]. Input may live on the local filesystem or on an
//! S3-compatible object store.

use bytes::Bytes;
use std::hash::Hasher;

pub mod billing;
pub mod cmd;
pub mod error;
pub mod parse;
pub mod rates;
pub mod report;
pub mod settings;
pub mod standalone;
pub mod storage;
pub mod strategy;
pub mod telemetry;
pub mod utils;
pub mod workload;

pub use billing::{Contribution, Usage, UserTotal};
pub use error::{BillingError, Result};
pub use parse::{parse_line, ParsedRecord};
pub use rates::RateTable;
pub use report::BillingReport;

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// The output of an application map function.
///
/// There are 2 layers of [`anyhow::Result`]s here. The outer layer
/// accounts for errors that arise while creating the iterator.
/// The inner layer accounts for errors that occur during iteration.
///
/// This accomodates both batch (all keys emitted at once) and lazy
/// (keys only emitted when the iterator is consumed) map operations.
pub type MapOutput = anyhow::Result<Box<dyn Iterator<Item = anyhow::Result<KeyValue>>>>;

/// A map function takes a key-value pair and auxiliary arguments.
///
/// It returns an iterator that yields new key-value pairs.
pub type MapFn = fn(kv: KeyValue, aux: Bytes) -> MapOutput;

/// A reduce function takes in a key, an iterator over values for that key,
/// and an auxiliary argument. It returns an [`anyhow::Result`]
/// containing a single output value.
pub type ReduceFn = fn(
    key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    aux: Bytes,
) -> anyhow::Result<Bytes>;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct KeyValue {
    /// The key.
    pub key: Bytes,
    /// The value.
    pub value: Bytes,
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }

    /// Get the key of this key-value pair.
    ///
    /// This method is cheap, since [`Bytes`] are cheaply cloneable.
    #[inline]
    pub fn key(&self) -> Bytes {
        self.key.clone()
    }

    /// Consumes the key-value pair and returns the value.
    #[inline]
    pub fn into_value(self) -> Bytes {
        self.value
    }
}

/// Hashes an intermediate key. Compute a reduce bucket for a given key
/// by calculating `ihash(key) % n_reduce`.
pub fn ihash(key: &[u8]) -> u32 {
    let mut hasher = fnv::FnvHasher::with_key(0);
    hasher.write(key);
    (hasher.finish() & 0x7fff_ffff) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ihash_is_stable_and_non_negative() {
        assert_eq!(ihash(b"user1"), ihash(b"user1"));
        assert!(ihash(b"user1") <= 0x7fff_ffff);
    }

    #[test]
    fn ihash_spreads_users_over_buckets() {
        let buckets: std::collections::HashSet<u32> = (0..64)
            .map(|i| ihash(format!("user{i}").as_bytes()) % 8)
            .collect();
        assert!(buckets.len() > 1);
    }
}
