//! Error taxonomy for a billing run.

use thiserror::Error;

/// Everything that can stop a billing run.
///
/// Unknown tasks are deliberately absent: a well-formed line whose task has
/// no configured rate is billed at zero, not rejected.
#[derive(Debug, Error)]
pub enum BillingError {
    /// A `RATE_<task>` value is not a non-negative number.
    #[error("invalid rate for {task}: {value}")]
    Configuration {
        /// Task name recovered from the key.
        task: String,
        /// Raw value as found in the configuration source.
        value: String,
    },

    /// Any other setting that could not be interpreted.
    #[error("invalid setting {key}={value}: {reason}")]
    InvalidSetting {
        key: String,
        value: String,
        reason: String,
    },

    /// A log line that does not follow `<ts> <user> <task> <status> <n>ms`.
    #[error("malformed log line '{line}': {reason}")]
    MalformedLine { line: String, reason: String },

    /// The line source could not be read at all.
    #[error("source unavailable: {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },

    /// The report sink could not be written.
    #[error("output unavailable: {target}: {reason}")]
    OutputUnavailable { target: String, reason: String },

    /// The execution engine failed for a reason outside the billing taxonomy.
    #[error("execution engine failure: {0:#}")]
    Engine(anyhow::Error),
}

impl BillingError {
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Self::MalformedLine {
            line: line.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn source(path: &str, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn output(target: &str, reason: impl ToString) -> Self {
        Self::OutputUnavailable {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Recovers a typed error from an engine-level [`anyhow::Error`].
    ///
    /// Workload functions raise [`BillingError`]s through `anyhow`, so
    /// anything else came from the engine itself.
    pub fn from_engine(err: anyhow::Error) -> Self {
        match err.downcast::<BillingError>() {
            Ok(billing) => billing,
            Err(other) => Self::Engine(other),
        }
    }

    /// `true` for the per-line parse failure.
    pub fn is_malformed_line(&self) -> bool {
        matches!(self, Self::MalformedLine { .. })
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BillingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_keep_their_billing_type() {
        let err = anyhow::Error::new(BillingError::malformed("a b", "expected 5 fields, found 2"));
        assert!(BillingError::from_engine(err).is_malformed_line());
    }

    #[test]
    fn foreign_engine_errors_are_wrapped() {
        let err = BillingError::from_engine(anyhow::anyhow!("worker pool exploded"));
        assert!(matches!(err, BillingError::Engine(_)));
        assert!(err.to_string().contains("worker pool exploded"));
    }

    #[test]
    fn configuration_error_names_task_and_value() {
        let err = BillingError::Configuration {
            task: "login".into(),
            value: "cheap".into(),
        };
        assert_eq!(err.to_string(), "invalid rate for login: cheap");
    }
}
