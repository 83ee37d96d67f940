//! The per-user result listing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::billing::{Contribution, Usage, UserTotal};

/// Totals keyed by user, always iterated in ascending user order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillingReport {
    totals: BTreeMap<String, Usage>,
}

impl BillingReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one contribution into its user's running total.
    pub fn add(&mut self, contribution: Contribution) {
        let total = self.totals.entry(contribution.user).or_default();
        *total = total.combine(contribution.usage);
    }

    /// Sets a user's fully reduced total, replacing any previous one.
    pub fn insert(&mut self, user: impl Into<String>, usage: Usage) {
        self.totals.insert(user.into(), usage);
    }

    pub fn get(&self, user: &str) -> Option<Usage> {
        self.totals.get(user).copied()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Users in ascending order.
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.totals.keys().map(String::as_str)
    }

    pub fn totals(&self) -> impl Iterator<Item = UserTotal> + '_ {
        self.totals
            .iter()
            .map(|(user, usage)| UserTotal::new(user.as_str(), *usage))
    }

    /// One formatted line per user, without terminators.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.totals().map(|total| total.to_string())
    }

    /// The whole listing, every line terminated by `\n`.
    pub fn render(&self) -> String {
        self.lines().fold(String::new(), |mut out, line| {
            out.push_str(&line);
            out.push('\n');
            out
        })
    }
}

impl FromIterator<Contribution> for BillingReport {
    fn from_iter<I: IntoIterator<Item = Contribution>>(iter: I) -> Self {
        let mut report = BillingReport::new();
        for contribution in iter {
            report.add(contribution);
        }
        report
    }
}

/// File name for a timestamped result listing.
pub fn results_file_name(at: DateTime<Utc>) -> String {
    format!("billing_results_{}.txt", at.format("%Y%m%d_%H%M%S"))
}
