use tracing::{debug, info};

use crate::billing::transform;
use crate::error::Result;
use crate::parse::parse_line;
use crate::rates::RateTable;
use crate::report::BillingReport;
use crate::strategy::AggregationStrategy;

/// Single pass, single thread, stops at the first malformed line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStrategy;

impl LocalStrategy {
    /// Folds any line sequence, consuming it lazily.
    pub fn fold_lines<I, S>(&self, lines: I, rates: &RateTable) -> Result<BillingReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = BillingReport::new();
        let mut records = 0usize;
        for line in lines {
            let line = line.as_ref();
            if line.trim().is_empty() {
                continue;
            }
            report.add(transform(parse_line(line)?, rates));
            records += 1;
        }
        debug!(records, users = report.len(), "local fold complete");
        Ok(report)
    }
}

impl AggregationStrategy for LocalStrategy {
    fn name(&self) -> &'static str {
        "local"
    }

    fn aggregate(&self, lines: &[String], rates: &RateTable) -> Result<BillingReport> {
        info!(lines = lines.len(), strategy = self.name(), "aggregating");
        self.fold_lines(lines, rates)
    }
}
