//! Log line parsing.
//!
//! The wire format is five whitespace-separated fields:
//!
//! ```text
//! <timestamp> <user> <task> <status> <integer>ms
//! ```

use crate::error::{BillingError, Result};

const FIELD_COUNT: usize = 5;
const DURATION_SUFFIX: &str = "ms";

/// The billing-relevant part of one log line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedRecord {
    pub user: String,
    pub task: String,
    pub duration_ms: u64,
}

/// Parses a single log line.
///
/// Timestamp and status are checked for presence only.
pub fn parse_line(line: &str) -> Result<ParsedRecord> {
    let line = line.trim();
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [_timestamp, user, task, _status, duration] = fields[..] else {
        return Err(BillingError::malformed(
            line,
            format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
        ));
    };

    Ok(ParsedRecord {
        user: user.to_string(),
        task: task.to_string(),
        duration_ms: parse_duration(line, duration)?,
    })
}

fn parse_duration(line: &str, token: &str) -> Result<u64> {
    let digits = token.strip_suffix(DURATION_SUFFIX).ok_or_else(|| {
        BillingError::malformed(line, format!("invalid duration format: '{token}'"))
    })?;
    digits
        .parse::<u64>()
        .map_err(|_| BillingError::malformed(line, format!("cannot parse duration: '{token}'")))
}
