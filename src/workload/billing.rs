//! A MapReduce-compatible implementation of per-user billing.
//!
//! The map input value is a JSON array of log lines and the auxiliary
//! bytes are the JSON-encoded [`RateTable`]. Lines are never re-split, so a
//! line that itself contains a newline is still one (malformed) record. Map emits
//! `user -> Usage` pairs, reduce folds them with [`Usage::combine`].

use crate::billing::{transform, Usage};
use crate::parse::parse_line;
use crate::rates::RateTable;
use crate::*;
use anyhow::Result;
use bytes::Bytes;

/// Serializes `rates` into the auxiliary argument expected by [`map`].
pub fn encode_rates(rates: &RateTable) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(rates)?))
}

/// Serializes one partition of log lines into a map input value.
pub fn encode_lines<S: AsRef<str>>(lines: &[S]) -> Result<Bytes> {
    let lines: Vec<&str> = lines.iter().map(|line| line.as_ref()).collect();
    Ok(Bytes::from(serde_json::to_vec(&lines)?))
}

pub fn map(kv: KeyValue, aux: Bytes) -> MapOutput {
    let rates: RateTable = serde_json::from_slice(&aux)?;
    let mut lines: Vec<String> = serde_json::from_slice(&kv.value)?;
    lines.retain(|line| !line.trim().is_empty());

    let iter = lines.into_iter().map(move |line| -> Result<KeyValue> {
        let contribution = transform(parse_line(&line)?, &rates);
        Ok(KeyValue {
            key: utils::string_to_bytes(contribution.user),
            value: contribution.usage.to_bytes(),
        })
    });
    Ok(Box::new(iter))
}

pub fn reduce(
    _key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    let mut total = Usage::ZERO;
    for value in values {
        total = total.combine(Usage::from_bytes(value)?);
    }
    Ok(total.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aux() -> Bytes {
        let rates: RateTable = [("login", 0.005), ("createOrder", 0.010)].into_iter().collect();
        encode_rates(&rates).unwrap()
    }

    fn input(lines: &[&str]) -> KeyValue {
        KeyValue::new(Bytes::from("part-0"), encode_lines(lines).unwrap())
    }

    #[test]
    fn map_emits_one_pair_per_line() {
        let out = map(
            input(&[
                "2025-05-02T00:00:00Z user1 login 200 100ms",
                "",
                "   ",
                "2025-05-02T00:02:00Z user2 login 200 50ms",
            ]),
            aux(),
        )
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].key, Bytes::from("user1"));
        assert_eq!(Usage::from_bytes(out[0].value.clone()).unwrap(), Usage::new(100, 0.5));
        assert_eq!(out[1].key, Bytes::from("user2"));
        assert_eq!(Usage::from_bytes(out[1].value.clone()).unwrap(), Usage::new(50, 0.25));
    }

    #[test]
    fn map_surfaces_malformed_lines_as_billing_errors() {
        let mut out = map(input(&["t user1 login 200 100"]), aux()).unwrap();
        let err = out.next().unwrap().unwrap_err();
        assert!(BillingError::from_engine(err).is_malformed_line());
    }

    #[test]
    fn embedded_newline_stays_one_record() {
        let mut out = map(input(&["t u login 200 1ms\nt u login 200 2ms"]), aux()).unwrap();
        let err = BillingError::from_engine(out.next().unwrap().unwrap_err());
        assert!(err.is_malformed_line(), "{err}");
        assert!(out.next().is_none());
    }

    #[test]
    fn map_rejects_garbage_aux() {
        assert!(map(input(&["t u login 200 1ms"]), Bytes::from_static(b"not json")).is_err());
    }

    #[test]
    fn reduce_sums_every_value() {
        let values = vec![Usage::new(100, 0.5).to_bytes(), Usage::new(200, 2.0).to_bytes()];
        let out = reduce(Bytes::from("user1"), Box::new(values.into_iter()), aux()).unwrap();
        assert_eq!(Usage::from_bytes(out).unwrap(), Usage::new(300, 2.5));
    }
}
