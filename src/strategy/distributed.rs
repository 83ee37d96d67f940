use bytes::Bytes;
use tracing::info;

use crate::billing::Usage;
use crate::error::{BillingError, Result};
use crate::rates::RateTable;
use crate::report::BillingReport;
use crate::standalone::{engine, EngineConfig};
use crate::strategy::AggregationStrategy;
use crate::{utils, workload, KeyValue};

/// Map, shuffle and reduce on a worker pool.
///
/// The input is cut into `num_workers` contiguous partitions, each mapped
/// independently. A malformed line anywhere aborts the run; the earliest one
/// in input order is reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistributedStrategy {
    config: EngineConfig,
}

impl DistributedStrategy {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn partitions(&self, lines: &[String]) -> anyhow::Result<Vec<KeyValue>> {
        utils::partition(lines, self.config.num_workers)
            .enumerate()
            .map(|(i, chunk)| {
                Ok(KeyValue::new(
                    Bytes::from(format!("part-{i:05}")),
                    workload::billing::encode_lines(chunk)?,
                ))
            })
            .collect()
    }

    fn collect_report(output: Vec<KeyValue>) -> anyhow::Result<BillingReport> {
        let mut report = BillingReport::new();
        for KeyValue { key, value } in output {
            report.insert(utils::string_from_bytes(key)?, Usage::from_bytes(value)?);
        }
        Ok(report)
    }
}

impl AggregationStrategy for DistributedStrategy {
    fn name(&self) -> &'static str {
        "distributed"
    }

    fn aggregate(&self, lines: &[String], rates: &RateTable) -> Result<BillingReport> {
        info!(
            lines = lines.len(),
            strategy = self.name(),
            workers = self.config.num_workers,
            reducers = self.config.num_reduce,
            "aggregating"
        );
        let aux = workload::billing::encode_rates(rates).map_err(BillingError::Engine)?;
        let inputs = self.partitions(lines).map_err(BillingError::Engine)?;
        let output = engine::run_job(&workload::billing_workload(), inputs, aux, &self.config)
            .map_err(BillingError::from_engine)?;
        Self::collect_report(output).map_err(BillingError::Engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn partitions_are_contiguous_and_labelled() {
        let strategy = DistributedStrategy::new(EngineConfig::new(2, 1));
        let parts = strategy.partitions(&lines(&["a", "b", "c"])).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].key, Bytes::from("part-00000"));
        assert_eq!(parts[0].value, Bytes::from(r#"["a","b"]"#));
        assert_eq!(parts[1].value, Bytes::from(r#"["c"]"#));
    }

    #[test]
    fn more_workers_than_lines() {
        let strategy = DistributedStrategy::new(EngineConfig::new(16, 4));
        let rates: RateTable = [("login", 0.25)].into_iter().collect();
        let report = strategy
            .aggregate(&lines(&["t u login 200 4ms"]), &rates)
            .unwrap();
        assert_eq!(report.get("u"), Some(Usage::new(4, 1.0)));
    }

    #[test]
    fn reports_the_earliest_malformed_line() {
        let strategy = DistributedStrategy::new(EngineConfig::new(3, 2));
        let input = lines(&[
            "t a login 200 1ms",
            "first bad line",
            "t b login 200 1ms",
            "second bad line",
            "t c login 200 1ms",
            "third bad line",
        ]);
        match strategy.aggregate(&input, &RateTable::default()) {
            Err(BillingError::MalformedLine { line, .. }) => assert_eq!(line, "first bad line"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
