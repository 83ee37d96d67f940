//! Interchangeable ways of turning log lines into a [`BillingReport`].
//!
//! Both strategies price lines the same way and fold each user's
//! contributions in input order, so for the same input they produce
//! bit-identical totals.

use crate::error::Result;
use crate::rates::RateTable;
use crate::report::BillingReport;

pub mod distributed;
pub mod local;

pub use distributed::DistributedStrategy;
pub use local::LocalStrategy;

/// Given a line sequence and a rate table, produce per-user totals.
///
/// Blank lines are skipped. Any malformed line fails the whole run and no
/// partial report is returned.
pub trait AggregationStrategy {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn aggregate(&self, lines: &[String], rates: &RateTable) -> Result<BillingReport>;
}
