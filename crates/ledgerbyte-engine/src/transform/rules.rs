//! The analytics schema contract as an ordered list of named rules.

use chrono::{DateTime, NaiveDateTime};
use ledgerbyte_types::record::{AcceptedRecord, CleanedRecord, RejectedRecord};
use ledgerbyte_types::rule::{RuleId, Violation};

/// Default lower bound (exclusive) for `order_id`.
pub const DEFAULT_MIN_ORDER_ID: i64 = 1000;

const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Offsets as PostgreSQL renders `timestamptz` text, e.g. `+00` or `+05:30`.
const OFFSET_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
];

/// Schema contract for the analytics table.
///
/// Rules are evaluated in [`RuleId::ALL`] order and every violation is kept,
/// so a rejected record explains all of its problems at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaContract {
    min_order_id: i64,
}

impl Default for SchemaContract {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_ORDER_ID)
    }
}

impl SchemaContract {
    #[must_use]
    pub fn new(min_order_id: i64) -> Self {
        Self { min_order_id }
    }

    #[must_use]
    pub fn min_order_id(&self) -> i64 {
        self.min_order_id
    }

    #[must_use]
    pub fn rules(&self) -> &'static [RuleId] {
        &RuleId::ALL
    }

    /// Evaluate a single rule.
    #[must_use]
    pub fn check(&self, rule: RuleId, record: &CleanedRecord) -> Option<Violation> {
        let message = match rule {
            RuleId::OrderIdThreshold => (record.order_id <= self.min_order_id).then(|| {
                format!(
                    "{} is not greater than {}",
                    record.order_id, self.min_order_id
                )
            }),
            RuleId::PriceNonNegative => {
                if !record.price_usd.is_finite() {
                    Some(format!("{} is not a finite number", record.price_usd))
                } else if record.price_usd < 0.0 {
                    Some(format!("{} is negative", record.price_usd))
                } else {
                    None
                }
            }
            RuleId::QuantityInteger => i32::try_from(record.quantity)
                .is_err()
                .then(|| format!("{} does not fit a 32-bit integer", record.quantity)),
            RuleId::CustomerKeyPresent => record
                .customer_key
                .is_none()
                .then(|| "value is missing".to_string()),
            // always filled by repair
            RuleId::CustomerNamePresent | RuleId::RegionPresent => None,
            RuleId::TotalSaleNumber => (!record.total_sale.is_finite())
                .then(|| format!("{} is not a finite number", record.total_sale)),
            RuleId::CreationTimestampValid => parse_timestamp(&record.creation_timestamp)
                .is_none()
                .then(|| {
                    format!(
                        "'{}' is not a valid timestamp",
                        record.creation_timestamp
                    )
                }),
        };
        message.map(|m| Violation::new(rule, m))
    }

    /// Every violation of `record`, in rule order.
    #[must_use]
    pub fn evaluate(&self, record: &CleanedRecord) -> Vec<Violation> {
        self.rules()
            .iter()
            .filter_map(|rule| self.check(*rule, record))
            .collect()
    }

    /// Accept `record` into its load-ready form, or reject it with every
    /// violation found.
    ///
    /// # Errors
    ///
    /// Returns the [`RejectedRecord`] when any rule fails.
    pub fn admit(&self, record: CleanedRecord) -> Result<AcceptedRecord, RejectedRecord> {
        let violations = self.evaluate(&record);
        let quantity = i32::try_from(record.quantity).ok();
        let timestamp = parse_timestamp(&record.creation_timestamp);

        match (violations.is_empty(), quantity, timestamp) {
            (true, Some(quantity), Some(creation_timestamp)) => Ok(AcceptedRecord {
                order_id: record.order_id,
                customer_key: record.customer_key.unwrap_or_default(),
                customer_name: record.customer_name,
                region: record.region,
                price_usd: record.price_usd,
                quantity,
                total_sale: record.total_sale,
                creation_timestamp,
            }),
            _ => Err(RejectedRecord { record, violations }),
        }
    }
}

/// Parse an extracted timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD[ T]HH:MM:SS` with an optional fractional
/// second, and the same with a trailing `+HH[:MM]` offset. Offset forms are
/// normalized to naive UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            OFFSET_TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.naive_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn cleaned(order_id: i64) -> CleanedRecord {
        CleanedRecord {
            order_id,
            customer_key: Some("CUST_001".into()),
            customer_name: "Ann".into(),
            region: "EU".into(),
            price_usd: 25.0,
            quantity: 4,
            total_sale: 100.0,
            creation_timestamp: "2024-01-15 10:30:00".into(),
        }
    }

    #[rstest]
    #[case(999, false)]
    #[case(1000, false)]
    #[case(1001, true)]
    #[case(50_000, true)]
    fn order_id_threshold_is_exclusive(#[case] order_id: i64, #[case] accepted: bool) {
        let contract = SchemaContract::default();
        assert_eq!(contract.admit(cleaned(order_id)).is_ok(), accepted);
    }

    #[test]
    fn threshold_follows_configuration() {
        let contract = SchemaContract::new(0);
        assert!(contract.admit(cleaned(1)).is_ok());
        assert!(contract.admit(cleaned(0)).is_err());
    }

    #[test]
    fn rejected_record_names_order_id_field() {
        let rejected = SchemaContract::default().admit(cleaned(500)).unwrap_err();
        assert_eq!(rejected.violations.len(), 1);
        assert_eq!(rejected.violations[0].rule, RuleId::OrderIdThreshold);
        assert!(rejected.reason().contains("order_id"));
        assert_eq!(rejected.record, cleaned(500));
    }

    #[test]
    fn collects_every_violation_in_rule_order() {
        let mut record = cleaned(10);
        record.price_usd = f64::NAN;
        record.total_sale = f64::NAN;
        record.customer_key = None;
        record.creation_timestamp = "yesterday".into();

        let rules: Vec<RuleId> = SchemaContract::default()
            .evaluate(&record)
            .into_iter()
            .map(|v| v.rule)
            .collect();
        assert_eq!(
            rules,
            vec![
                RuleId::OrderIdThreshold,
                RuleId::PriceNonNegative,
                RuleId::CustomerKeyPresent,
                RuleId::TotalSaleNumber,
                RuleId::CreationTimestampValid,
            ]
        );
    }

    #[test]
    fn missing_customer_key_is_rejected() {
        let mut record = cleaned(1001);
        record.customer_key = None;
        let rejected = SchemaContract::default().admit(record).unwrap_err();
        assert_eq!(rejected.violations.len(), 1);
        assert_eq!(rejected.violations[0].rule, RuleId::CustomerKeyPresent);
        assert_eq!(rejected.violations[0].message, "value is missing");
    }

    #[test]
    fn empty_strings_count_as_present() {
        let mut record = cleaned(1001);
        record.customer_key = Some(String::new());
        record.customer_name = String::new();
        record.region = "  ".into();

        let accepted = SchemaContract::default().admit(record).unwrap();
        assert_eq!(accepted.customer_key, "");
        assert_eq!(accepted.customer_name, "");
        assert_eq!(accepted.region, "  ");
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut record = cleaned(1001);
        record.price_usd = -0.5;
        let violation = SchemaContract::default()
            .check(RuleId::PriceNonNegative, &record)
            .unwrap();
        assert_eq!(violation.message, "-0.5 is negative");
    }

    #[test]
    fn quantity_must_fit_target_column() {
        let mut record = cleaned(1001);
        record.quantity = i64::from(i32::MAX) + 1;
        record.total_sale = record.price_usd * 2_147_483_648.0;
        let rejected = SchemaContract::default().admit(record).unwrap_err();
        assert_eq!(rejected.violations[0].rule, RuleId::QuantityInteger);
    }

    #[test]
    fn accepted_record_carries_parsed_timestamp() {
        let accepted = SchemaContract::default().admit(cleaned(1001)).unwrap();
        assert_eq!(accepted.quantity, 4);
        assert_eq!(
            accepted.creation_timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap()
        );
    }

    #[rstest]
    #[case("2024-01-15 10:30:00")]
    #[case("2024-01-15 10:30:00.123456")]
    #[case("2024-01-15T10:30:00")]
    #[case("2024-01-15T10:30:00.5")]
    #[case("2024-01-15T10:30:00Z")]
    #[case("2024-01-15T12:30:00+02:00")]
    #[case("2024-01-15 10:30:00+00")]
    #[case("2024-01-15 10:30:00.25+00")]
    #[case("2024-01-15 16:00:00+05:30")]
    #[case("2024-01-15T05:30:00-05")]
    fn parses_supported_timestamp_forms(#[case] raw: &str) {
        let parsed = parse_timestamp(raw).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(parsed.format("%H:%M").to_string(), "10:30");
    }

    #[rstest]
    #[case("")]
    #[case("2024-13-01 00:00:00")]
    #[case("15/01/2024 10:30")]
    #[case("2024-01-15")]
    fn rejects_malformed_timestamps(#[case] raw: &str) {
        assert!(parse_timestamp(raw).is_none());
    }
}
