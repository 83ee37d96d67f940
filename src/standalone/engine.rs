use anyhow::{Context, Result};
use bytes::Bytes;
use dashmap::DashMap;
use itertools::Itertools;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::time::Instant;
use tracing::{debug, info, info_span};
use uuid::Uuid;

use crate::standalone::EngineConfig;
use crate::*;

// types related to this engine
type BucketIndex = u32;
pub type Buckets = DashMap<BucketIndex, Vec<KeyValue>>;

/// Builds the worker pool that runs map and reduce tasks.
pub fn worker_pool(config: &EngineConfig) -> Result<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_workers)
        .thread_name(|i| format!("mr-worker-{i}"))
        .build()
        .context("failed to start the worker pool")
}

/// Runs the map function over every input on `pool` and shuffles the
/// emitted pairs into `ihash(key) % num_reduce_worker` buckets.
///
/// Inside a bucket, pairs keep the order of their inputs. If several inputs
/// fail, the error of the earliest one is returned.
pub fn perform_map(
    pool: &ThreadPool,
    engine: &Workload,
    inputs: Vec<KeyValue>,
    serialized_args: &Bytes,
    num_reduce_worker: u32,
) -> Result<Buckets> {
    let map_func = engine.map_fn;
    let mapped: Vec<Result<Vec<KeyValue>>> = pool.install(|| {
        inputs
            .into_par_iter()
            .map(|kv| -> Result<Vec<KeyValue>> {
                map_func(kv, serialized_args.clone())?.collect()
            })
            .collect()
    });

    let buckets: Buckets = Buckets::new();
    for output in mapped {
        for KeyValue { key, value } in output? {
            let bucket_no = ihash(&key) % num_reduce_worker.max(1);
            buckets
                .entry(bucket_no)
                .or_default()
                .push(KeyValue { key, value });
        }
    }
    Ok(buckets)
}

/// Reduces every bucket on `pool`, one reduce call per distinct key.
///
/// Values reach the reduce function in the order they were mapped.
pub fn perform_reduce(
    pool: &ThreadPool,
    engine: &Workload,
    serialized_args: &Bytes,
    buckets: Buckets,
) -> Result<Vec<KeyValue>> {
    let reduce_func = engine.reduce_fn;
    let reduced: Vec<Result<Vec<KeyValue>>> = pool.install(|| {
        buckets
            .into_par_iter()
            .map(|(reduce_id, mut bkt)| -> Result<Vec<KeyValue>> {
                debug!(reduce_id, pairs = bkt.len(), "reducing bucket");
                // stable, so equal keys stay in map order
                bkt.sort_by_key(KeyValue::key);
                let mut out = Vec::new();
                for (key, value_group) in &bkt.into_iter().chunk_by(KeyValue::key) {
                    let iter = value_group.map(KeyValue::into_value);
                    let value = reduce_func(key.clone(), Box::new(iter), serialized_args.clone())?;
                    out.push(KeyValue { key, value });
                }
                Ok(out)
            })
            .collect()
    });

    let mut output = Vec::new();
    for bucket in reduced {
        output.extend(bucket?);
    }
    Ok(output)
}

/// Runs one complete map, shuffle and reduce job.
///
/// Output pairs are in no particular order.
pub fn run_job(
    engine: &Workload,
    inputs: Vec<KeyValue>,
    serialized_args: Bytes,
    config: &EngineConfig,
) -> Result<Vec<KeyValue>> {
    let job_id = Uuid::new_v4();
    let span = info_span!("mapreduce", %job_id);
    let _enter = span.enter();

    let pool = worker_pool(config)?;
    let num_inputs = inputs.len();

    let map_start = Instant::now();
    let buckets = perform_map(&pool, engine, inputs, &serialized_args, config.num_reduce)?;
    info!(
        phase = "map",
        partitions = num_inputs,
        workers = config.num_workers,
        buckets = buckets.len(),
        wall_ms = map_start.elapsed().as_millis() as u64,
        "Map phase complete"
    );

    let reduce_start = Instant::now();
    let output = perform_reduce(&pool, engine, &serialized_args, buckets)?;
    info!(
        phase = "reduce",
        keys = output.len(),
        wall_ms = reduce_start.elapsed().as_millis() as u64,
        "Reduce phase complete"
    );
    Ok(output)
}
