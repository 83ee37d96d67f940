//! Per-task billing rates.
//!
//! A [`RateTable`] is built once per run from a [`ConfigSource`] and then
//! passed by reference to everything that prices a record.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BillingError, Result};

/// Prefix selecting rate entries in the configuration source.
pub const RATE_PREFIX: &str = "RATE_";

/// Anything exposing environment-style key/value pairs.
pub trait ConfigSource {
    /// All pairs, in no particular order.
    fn vars(&self) -> Vec<(String, String)>;

    /// The value of a single key.
    fn var(&self, key: &str) -> Option<String> {
        self.vars()
            .into_iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }
}

/// The process environment. Keys or values that are not valid UTF-8 are
/// invisible.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn vars(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl ConfigSource for [(&str, &str)] {
    fn vars(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl<const N: usize> ConfigSource for [(&str, &str); N] {
    fn vars(&self) -> Vec<(String, String)> {
        self.as_slice().vars()
    }
}

/// Mapping from task name to cost per millisecond.
///
/// Task names are matched exactly. A task that is not in the table costs
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    rates: BTreeMap<String, f64>,
}

impl RateTable {
    /// Loads every `RATE_<task>` entry from `source`.
    ///
    /// All-or-nothing: the first value that is not a finite, non-negative
    /// number fails the whole table.
    pub fn from_source<S: ConfigSource + ?Sized>(source: &S) -> Result<Self> {
        let mut rates = BTreeMap::new();
        for (key, value) in source.vars() {
            let Some(task) = key.strip_prefix(RATE_PREFIX) else {
                continue;
            };
            let rate = parse_rate(&value).ok_or_else(|| BillingError::Configuration {
                task: task.to_string(),
                value: value.clone(),
            })?;
            rates.insert(task.to_string(), rate);
        }
        debug!(tasks = rates.len(), "loaded rate table");
        Ok(Self { rates })
    }

    /// Rate for `task`, or `0.0` when the task is not configured.
    #[inline]
    pub fn rate(&self, task: &str) -> f64 {
        self.rates.get(task).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl<T: Into<String>> FromIterator<(T, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (T, f64)>>(iter: I) -> Self {
        Self {
            rates: iter.into_iter().map(|(t, r)| (t.into(), r)).collect(),
        }
    }
}

fn parse_rate(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|rate| rate.is_finite() && *rate >= 0.0)
}
