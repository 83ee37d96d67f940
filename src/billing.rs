//! Pricing records and combining the results.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::parse::ParsedRecord;
use crate::rates::RateTable;

/// Encoded size of a [`Usage`]: `u64` duration then `f64` cost.
pub const USAGE_LEN: usize = 16;

/// A `(duration, cost)` pair. The unit of both map output and reduce input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Usage {
    pub duration_ms: u64,
    pub cost: f64,
}

impl Usage {
    pub const ZERO: Usage = Usage {
        duration_ms: 0,
        cost: 0.0,
    };

    pub fn new(duration_ms: u64, cost: f64) -> Self {
        Self { duration_ms, cost }
    }

    /// Adds both components. No rounding happens here.
    ///
    /// Duration saturates at `u64::MAX`.
    #[inline]
    #[must_use]
    pub fn combine(self, other: Usage) -> Usage {
        Usage {
            duration_ms: self.duration_ms.saturating_add(other.duration_ms),
            cost: self.cost + other.cost,
        }
    }

    /// Big-endian duration followed by the raw bits of the cost.
    pub fn to_bytes(self) -> Bytes {
        let mut buf = BytesMut::with_capacity(USAGE_LEN);
        buf.put_u64(self.duration_ms);
        buf.put_f64(self.cost);
        buf.freeze()
    }

    /// Inverse of [`Usage::to_bytes`].
    pub fn from_bytes(mut buf: Bytes) -> anyhow::Result<Usage> {
        anyhow::ensure!(
            buf.len() == USAGE_LEN,
            "usage record must be {USAGE_LEN} bytes, got {}",
            buf.len()
        );
        let duration_ms = buf.get_u64();
        let cost = buf.get_f64();
        Ok(Usage { duration_ms, cost })
    }
}

impl std::iter::Sum for Usage {
    fn sum<I: Iterator<Item = Usage>>(iter: I) -> Self {
        iter.fold(Usage::ZERO, Usage::combine)
    }
}

/// One priced log line, keyed by user.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub user: String,
    pub usage: Usage,
}

/// Prices a record: `cost = duration_ms * rate(task)`.
///
/// Tasks without a rate are counted for duration and cost nothing.
pub fn transform(record: ParsedRecord, rates: &RateTable) -> Contribution {
    let cost = record.duration_ms as f64 * rates.rate(&record.task);
    Contribution {
        user: record.user,
        usage: Usage::new(record.duration_ms, cost),
    }
}

/// Everything one user was billed for.
#[derive(Debug, Clone, PartialEq)]
pub struct UserTotal {
    pub user: String,
    pub total_duration_ms: u64,
    pub total_cost: f64,
}

impl UserTotal {
    pub fn new(user: impl Into<String>, usage: Usage) -> Self {
        Self {
            user: user.into(),
            total_duration_ms: usage.duration_ms,
            total_cost: usage.cost,
        }
    }
}

impl std::fmt::Display for UserTotal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: total_duration={}ms, total_cost={:.2}",
            self.user, self.total_duration_ms, self.total_cost
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_line;

    fn rates() -> RateTable {
        [("login", 0.005), ("createOrder", 0.010)].into_iter().collect()
    }

    #[test]
    fn cost_is_duration_times_rate() {
        let record = parse_line("2025-05-02T00:00:00Z user1 createOrder 201 200ms").unwrap();
        let contribution = transform(record, &rates());
        assert_eq!(contribution.user, "user1");
        assert_eq!(contribution.usage.duration_ms, 200);
        assert_eq!(contribution.usage.cost, 200.0 * 0.010);
    }

    #[test]
    fn unknown_task_keeps_duration_and_costs_zero() {
        let record = parse_line("2025-05-02T00:00:00Z user9 deleteAccount 204 42ms").unwrap();
        let contribution = transform(record, &rates());
        assert_eq!(contribution.usage, Usage::new(42, 0.0));
    }

    #[test]
    fn combine_adds_both_fields() {
        let total = Usage::new(100, 0.5).combine(Usage::new(200, 2.0));
        assert_eq!(total.duration_ms, 300);
        assert!((total.cost - 2.5).abs() < 1e-12);
    }

    #[test]
    fn combine_is_commutative() {
        let a = Usage::new(17, 0.1);
        let b = Usage::new(5, 0.7);
        assert_eq!(a.combine(b), b.combine(a));
    }

    #[test]
    fn combine_is_associative_for_exact_values() {
        let a = Usage::new(100, 0.5);
        let b = Usage::new(3, 0.125);
        let c = Usage::new(9_000, 36.75);
        assert_eq!(a.combine(b).combine(c), a.combine(b.combine(c)));
    }

    #[test]
    fn combine_is_associative_within_float_tolerance() {
        let a = Usage::new(100, 0.1);
        let b = Usage::new(3, 0.2);
        let c = Usage::new(9, 0.3);
        let left = a.combine(b).combine(c);
        let right = a.combine(b.combine(c));
        assert_eq!(left.duration_ms, right.duration_ms);
        assert!((left.cost - right.cost).abs() <= f64::EPSILON * 4.0);
    }

    #[test]
    fn zero_is_identity() {
        let a = Usage::new(12, 3.25);
        assert_eq!(Usage::ZERO.combine(a), a);
        assert_eq!(a.combine(Usage::ZERO), a);
    }

    #[test]
    fn duration_saturates() {
        let total = Usage::new(u64::MAX - 1, 0.0).combine(Usage::new(10, 0.0));
        assert_eq!(total.duration_ms, u64::MAX);
    }

    #[test]
    fn sum_folds_in_order() {
        let total: Usage = [Usage::new(1, 0.25), Usage::new(2, 0.5), Usage::new(3, 0.75)]
            .into_iter()
            .sum();
        assert_eq!(total, Usage::new(6, 1.5));
    }

    #[test]
    fn encoding_preserves_cost_bits() {
        let usage = Usage::new(300, 0.1 + 0.2);
        let decoded = Usage::from_bytes(usage.to_bytes()).unwrap();
        assert_eq!(decoded.cost.to_bits(), usage.cost.to_bits());
        assert_eq!(decoded.duration_ms, 300);
    }

    #[test]
    fn short_encoding_is_rejected() {
        assert!(Usage::from_bytes(Bytes::from_static(b"short")).is_err());
    }

    #[test]
    fn display_rounds_cost_to_cents() {
        let total = UserTotal::new("user1", Usage::new(300, 2.5));
        assert_eq!(total.to_string(), "user1: total_duration=300ms, total_cost=2.50");
        let total = UserTotal::new("user2", Usage::new(50, 0.25));
        assert_eq!(total.to_string(), "user2: total_duration=50ms, total_cost=0.25");
    }
}
