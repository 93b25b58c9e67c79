//! Deterministic repair of known source defects.
//!
//! Steps run in a fixed order: deduplicate by `order_id`, then fill absent
//! `quantity`, `region` and `customer_name`. A blank region counts as
//! absent. Every step is total.

use std::collections::HashSet;

use ledgerbyte_types::record::{
    MergedRecord, RepairedRecord, DEFAULT_QUANTITY, INVALID_CUSTOMER, UNKNOWN_REGION,
};

/// How many values each repair step changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairCounts {
    pub duplicates_removed: usize,
    pub quantities_imputed: usize,
    pub regions_imputed: usize,
    pub customer_names_imputed: usize,
}

/// Run every repair step over `records`.
#[must_use]
pub fn repair(records: Vec<MergedRecord>) -> (Vec<RepairedRecord>, RepairCounts) {
    let (mut records, duplicates_removed) = deduplicate(records);
    let counts = RepairCounts {
        duplicates_removed,
        quantities_imputed: impute_quantity(&mut records),
        regions_imputed: impute_region(&mut records),
        customer_names_imputed: impute_customer_name(&mut records),
    };

    let repaired = records.into_iter().map(into_repaired).collect();
    (repaired, counts)
}

/// Keep the first record seen for each `order_id`. Returns the survivors in
/// input order and the number of records dropped.
#[must_use]
pub fn deduplicate(records: Vec<MergedRecord>) -> (Vec<MergedRecord>, usize) {
    let before = records.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<MergedRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.order_id))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Absent quantity means one unit was ordered.
pub fn impute_quantity(records: &mut [MergedRecord]) -> usize {
    fill(records, |r| &mut r.quantity, |_| false, || DEFAULT_QUANTITY)
}

/// Missing and whitespace-only regions both become [`UNKNOWN_REGION`].
pub fn impute_region(records: &mut [MergedRecord]) -> usize {
    fill(
        records,
        |r| &mut r.region,
        |region: &String| region.trim().is_empty(),
        || UNKNOWN_REGION.to_string(),
    )
}

/// Orders whose customer did not join are flagged rather than dropped.
pub fn impute_customer_name(records: &mut [MergedRecord]) -> usize {
    fill(
        records,
        |r| &mut r.customer_name,
        |_| false,
        || INVALID_CUSTOMER.to_string(),
    )
}

/// Replace every value that is `None` or that `vacant` treats as empty.
fn fill<T>(
    records: &mut [MergedRecord],
    slot: impl Fn(&mut MergedRecord) -> &mut Option<T>,
    vacant: impl Fn(&T) -> bool,
    default: impl Fn() -> T,
) -> usize {
    let mut filled = 0;
    for record in records.iter_mut() {
        let value = slot(record);
        if value.as_ref().map_or(true, &vacant) {
            *value = Some(default());
            filled += 1;
        }
    }
    filled
}

fn into_repaired(record: MergedRecord) -> RepairedRecord {
    RepairedRecord {
        order_id: record.order_id,
        customer_key: record.customer_key,
        customer_name: record
            .customer_name
            .unwrap_or_else(|| INVALID_CUSTOMER.to_string()),
        region: record.region.unwrap_or_else(|| UNKNOWN_REGION.to_string()),
        raw_price: record.raw_price,
        quantity: record.quantity.unwrap_or(DEFAULT_QUANTITY),
        creation_timestamp: record.creation_timestamp,
    }
}
