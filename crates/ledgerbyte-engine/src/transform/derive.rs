//! Derived sale metrics.

use ledgerbyte_types::record::{CleanedRecord, RepairedRecord};

/// `price_usd = |raw_price|`, `total_sale = price_usd * quantity`.
///
/// Non-finite prices stay non-finite; the validation gate rejects them.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn derive(record: RepairedRecord) -> CleanedRecord {
    let price_usd = record.raw_price.abs();
    let total_sale = price_usd * record.quantity as f64;
    CleanedRecord {
        order_id: record.order_id,
        customer_key: record.customer_key,
        customer_name: record.customer_name,
        region: record.region,
        price_usd,
        quantity: record.quantity,
        total_sale,
        creation_timestamp: record.creation_timestamp,
    }
}

#[must_use]
pub fn derive_all(records: Vec<RepairedRecord>) -> Vec<CleanedRecord> {
    records.into_iter().map(derive).collect()
}
