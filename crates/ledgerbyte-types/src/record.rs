//! Record shapes for each stage of a pipeline run.
//!
//! Raw records arrive from the extractor, are merged into [`MergedRecord`],
//! repaired into [`RepairedRecord`], extended with derived metrics into
//! [`CleanedRecord`], and finally partitioned into [`AcceptedRecord`] and
//! [`RejectedRecord`] by the validation gate.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::rule::Violation;

/// Quantity assumed for orders with no recorded quantity.
pub const DEFAULT_QUANTITY: i64 = 1;

/// Region assigned when neither the order nor its customer has one.
pub const UNKNOWN_REGION: &str = "Unknown";

/// Customer name flag for orders whose `customer_key` matched no customer.
pub const INVALID_CUSTOMER: &str = "Invalid Customer";

/// Stand-in for an `order_id` that was NULL at the source. It never clears
/// the `order_id` threshold, so such rows are rejected rather than lost.
pub const MISSING_ORDER_ID: i64 = i64::MIN;

/// Columns the orders table must expose.
pub const ORDER_COLUMNS: [&str; 5] = [
    "order_id",
    "customer_key",
    "raw_price",
    "quantity",
    "creation_timestamp",
];

/// Columns the customers table must expose.
pub const CUSTOMER_COLUMNS: [&str; 4] = ["customer_key", "customer_name", "region", "email_address"];

/// One row of the raw orders table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrder {
    pub order_id: i64,
    /// `None` when the source value is NULL; such orders never join.
    pub customer_key: Option<String>,
    /// Stored price; the sign is not trustworthy.
    pub raw_price: f64,
    pub quantity: Option<i64>,
    /// Timestamp text as extracted. Validity is decided by the gate.
    pub creation_timestamp: String,
}

/// One row of the raw customers table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCustomer {
    pub customer_key: String,
    pub customer_name: String,
    pub region: Option<String>,
    pub email_address: Option<String>,
}

/// The two materialized input sets handed over by an extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTables {
    pub orders: Vec<RawOrder>,
    pub customers: Vec<RawCustomer>,
}

/// An order left-joined with its customer. Customer attributes are `None`
/// when the join found no match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub order_id: i64,
    pub customer_key: Option<String>,
    pub raw_price: f64,
    pub quantity: Option<i64>,
    pub creation_timestamp: String,
    pub customer_name: Option<String>,
    pub region: Option<String>,
}

/// A merged record after defect repair: every optional attribute is filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairedRecord {
    pub order_id: i64,
    pub customer_key: Option<String>,
    pub customer_name: String,
    pub region: String,
    pub raw_price: f64,
    pub quantity: i64,
    pub creation_timestamp: String,
}

impl From<RepairedRecord> for MergedRecord {
    fn from(record: RepairedRecord) -> Self {
        Self {
            order_id: record.order_id,
            customer_key: record.customer_key,
            raw_price: record.raw_price,
            quantity: Some(record.quantity),
            creation_timestamp: record.creation_timestamp,
            customer_name: Some(record.customer_name),
            region: Some(record.region),
        }
    }
}

/// Candidate for validation: repaired fields plus derived metrics.
///
/// Field order matches the analytics table layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub order_id: i64,
    pub customer_key: Option<String>,
    pub customer_name: String,
    pub region: String,
    pub price_usd: f64,
    pub quantity: i64,
    pub total_sale: f64,
    pub creation_timestamp: String,
}

/// A record that satisfied every schema rule, in its load-ready form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedRecord {
    pub order_id: i64,
    pub customer_key: String,
    pub customer_name: String,
    pub region: String,
    pub price_usd: f64,
    pub quantity: i32,
    pub total_sale: f64,
    pub creation_timestamp: NaiveDateTime,
}

/// A record the gate refused, with every rule it violated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub record: CleanedRecord,
    pub violations: Vec<Violation>,
}

impl RejectedRecord {
    #[must_use]
    pub fn order_id(&self) -> i64 {
        self.record.order_id
    }

    /// All violation messages joined into one diagnostic line.
    #[must_use]
    pub fn reason(&self) -> String {
        self.violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Fail with [`TransformError::MissingColumns`] unless every `required`
/// column appears in `present`.
///
/// # Errors
///
/// Returns the full list of absent columns for `table`.
pub fn require_columns<S: AsRef<str>>(
    table: &str,
    present: &[S],
    required: &[&str],
) -> Result<(), TransformError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !present.iter().any(|p| p.as_ref() == **column))
        .map(|column| (*column).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TransformError::MissingColumns {
            table: table.to_string(),
            columns: missing,
        })
    }
}
