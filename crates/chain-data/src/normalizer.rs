//! Turns provider records into [`NormalizedTransaction`]s.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::{debug, warn};

use crate::models::{sats_to_btc, NormalizedTransaction, RawTransaction, TransactionDirection};

/// Naive formats the provider uses; interpreted as UTC.
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeOutcome {
    Transaction(NormalizedTransaction),
    /// The record does not move funds for the tracked address.
    ZeroChange,
    /// Missing id or timestamp, or a timestamp that does not parse.
    Malformed(String),
}

impl NormalizeOutcome {
    pub fn into_transaction(self) -> Option<NormalizedTransaction> {
        match self {
            Self::Transaction(tx) => Some(tx),
            _ => None,
        }
    }
}

/// Normalizes one record reported for `address`.
///
/// Never fails: records that cannot be used come back as
/// [`NormalizeOutcome::ZeroChange`] or [`NormalizeOutcome::Malformed`].
pub fn normalize(address: &str, raw: &RawTransaction) -> NormalizeOutcome {
    let txid = match raw.hash.as_deref().map(str::trim) {
        Some(hash) if !hash.is_empty() => hash.to_string(),
        _ => return malformed(address, "missing transaction id".to_string()),
    };

    let timestamp = match raw.time.as_deref() {
        Some(time) => match parse_provider_timestamp(time) {
            Some(ts) => ts,
            None => {
                return malformed(
                    address,
                    format!("unparsable timestamp '{}' on {}", time, txid),
                )
            }
        },
        None => return malformed(address, format!("missing timestamp on {}", txid)),
    };

    let Some(direction) = TransactionDirection::from_balance_change(raw.balance_change) else {
        debug!("Skipping {} for {}: zero balance change", txid, address);
        return NormalizeOutcome::ZeroChange;
    };

    // Mempool transactions come back with block_id = -1.
    let block_height = raw.block_id.filter(|height| *height >= 0);

    NormalizeOutcome::Transaction(NormalizedTransaction {
        txid,
        block_height,
        timestamp,
        value: sats_to_btc(raw.balance_change).abs(),
        direction,
    })
}

/// Parses RFC 3339 timestamps and the provider's naive `YYYY-MM-DD HH:MM:SS`.
pub fn parse_provider_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn malformed(address: &str, reason: String) -> NormalizeOutcome {
    warn!("Dropping malformed record for {}: {}", address, reason);
    NormalizeOutcome::Malformed(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const ADDRESS: &str = "bc1qtracked";

    fn raw(hash: &str, block_id: i64, time: &str, change: i64) -> RawTransaction {
        RawTransaction {
            hash: Some(hash.to_string()),
            block_id: Some(block_id),
            time: Some(time.to_string()),
            balance_change: change,
        }
    }

    #[test]
    fn test_positive_change_is_received() {
        let tx = normalize(ADDRESS, &raw("aa", 800_000, "2024-01-02 03:04:05", 150_000_000))
            .into_transaction()
            .unwrap();

        assert_eq!(tx.txid, "aa");
        assert_eq!(tx.block_height, Some(800_000));
        assert_eq!(tx.value, dec!(1.5));
        assert_eq!(tx.direction, TransactionDirection::Received);
        assert_eq!(tx.signed_value(), dec!(1.5));
        assert_eq!(
            tx.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
        );
    }

    #[test]
    fn test_negative_change_is_sent_with_absolute_value() {
        let tx = normalize(ADDRESS, &raw("bb", 1, "2024-01-02T03:04:05Z", -50_000_000))
            .into_transaction()
            .unwrap();

        assert_eq!(tx.value, dec!(0.5));
        assert_eq!(tx.direction, TransactionDirection::Sent);
        assert_eq!(tx.signed_value(), dec!(-0.5));
    }

    #[test]
    fn test_zero_change_is_dropped() {
        let outcome = normalize(ADDRESS, &raw("cc", 1, "2024-01-02 03:04:05", 0));
        assert_eq!(outcome, NormalizeOutcome::ZeroChange);
    }

    #[test]
    fn test_unconfirmed_block_is_absent() {
        let tx = normalize(ADDRESS, &raw("dd", -1, "2024-01-02 03:04:05", 10))
            .into_transaction()
            .unwrap();
        assert_eq!(tx.block_height, None);

        let mut record = raw("ee", 0, "2024-01-02 03:04:05", 10);
        record.block_id = None;
        let tx = normalize(ADDRESS, &record).into_transaction().unwrap();
        assert_eq!(tx.block_height, None);
    }

    #[test]
    fn test_missing_hash_is_malformed() {
        let mut record = raw("", 1, "2024-01-02 03:04:05", 10);
        assert!(matches!(
            normalize(ADDRESS, &record),
            NormalizeOutcome::Malformed(_)
        ));

        record.hash = None;
        assert!(matches!(
            normalize(ADDRESS, &record),
            NormalizeOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_missing_or_bad_timestamp_is_malformed() {
        let mut record = raw("ff", 1, "yesterday", 10);
        assert!(matches!(
            normalize(ADDRESS, &record),
            NormalizeOutcome::Malformed(ref reason) if reason.contains("yesterday")
        ));

        record.time = None;
        assert!(matches!(
            normalize(ADDRESS, &record),
            NormalizeOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_provider_timestamp("2023-06-01 12:00:00"), Some(expected));
        assert_eq!(parse_provider_timestamp("2023-06-01T12:00:00"), Some(expected));
        assert_eq!(parse_provider_timestamp("2023-06-01T12:00:00Z"), Some(expected));
        assert_eq!(
            parse_provider_timestamp("2023-06-01T14:00:00+02:00"),
            Some(expected)
        );
        assert_eq!(parse_provider_timestamp("01/06/2023"), None);
    }
}
