//! Arrow layout of the analytics table handed to loaders.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, Float64Array, Int32Array, Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use crate::record::AcceptedRecord;

/// Column order of the analytics table. Loaders must keep it verbatim.
pub const ANALYTICS_COLUMNS: [&str; 8] = [
    "order_id",
    "customer_key",
    "customer_name",
    "region",
    "price_usd",
    "quantity",
    "total_sale",
    "creation_timestamp",
];

/// Arrow schema of the analytics table. Every column is non-nullable.
#[must_use]
pub fn analytics_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(ANALYTICS_COLUMNS[0], DataType::Int64, false),
        Field::new(ANALYTICS_COLUMNS[1], DataType::Utf8, false),
        Field::new(ANALYTICS_COLUMNS[2], DataType::Utf8, false),
        Field::new(ANALYTICS_COLUMNS[3], DataType::Utf8, false),
        Field::new(ANALYTICS_COLUMNS[4], DataType::Float64, false),
        Field::new(ANALYTICS_COLUMNS[5], DataType::Int32, false),
        Field::new(ANALYTICS_COLUMNS[6], DataType::Float64, false),
        Field::new(
            ANALYTICS_COLUMNS[7],
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        ),
    ]))
}

/// Encode accepted records into one `RecordBatch` with [`analytics_schema`].
///
/// # Errors
///
/// Returns an `ArrowError` if the arrays fail schema checks.
pub fn accepted_to_batch(records: &[AcceptedRecord]) -> Result<RecordBatch, ArrowError> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(records.iter().map(|r| r.order_id))),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.customer_key.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.customer_name.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.region.as_str()),
        )),
        Arc::new(Float64Array::from_iter_values(records.iter().map(|r| r.price_usd))),
        Arc::new(Int32Array::from_iter_values(records.iter().map(|r| r.quantity))),
        Arc::new(Float64Array::from_iter_values(records.iter().map(|r| r.total_sale))),
        Arc::new(TimestampMicrosecondArray::from_iter_values(
            records
                .iter()
                .map(|r| r.creation_timestamp.and_utc().timestamp_micros()),
        )),
    ];

    RecordBatch::try_new(analytics_schema(), columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use chrono::NaiveDate;

    fn accepted(order_id: i64, quantity: i32) -> AcceptedRecord {
        AcceptedRecord {
            order_id,
            customer_key: "CUST_001".into(),
            customer_name: "Ann".into(),
            region: "EU".into(),
            price_usd: 12.5,
            quantity,
            total_sale: 12.5 * f64::from(quantity),
            creation_timestamp: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
        }
    }

    #[test]
    fn schema_follows_analytics_column_order() {
        let schema = analytics_schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, ANALYTICS_COLUMNS);
        assert!(schema.fields().iter().all(|f| !f.is_nullable()));
    }

    #[test]
    fn batch_carries_every_record() {
        let batch = accepted_to_batch(&[accepted(1001, 2), accepted(1002, 4)]).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), ANALYTICS_COLUMNS.len());

        let totals = batch
            .column(6)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert!((totals.value(1) - 50.0).abs() < 1e-9);

        let stamps = batch
            .column(7)
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .unwrap();
        assert_eq!(stamps.null_count(), 0);
        assert_eq!(stamps.value(0), 1_705_314_600_000_000);
    }

    #[test]
    fn empty_input_yields_empty_batch() {
        let batch = accepted_to_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.schema(), analytics_schema());
    }
}
