//! Left-outer join of orders onto customers.

use std::collections::HashMap;

use ledgerbyte_types::error::TransformError;
use ledgerbyte_types::record::{MergedRecord, RawCustomer, RawOrder};

/// Joined records plus the number of orders that matched no customer.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutput {
    pub records: Vec<MergedRecord>,
    pub unmatched: usize,
}

/// Join every order with the customer sharing its `customer_key`.
///
/// Produces exactly one record per order, in order input order. Orders
/// without a matching customer, including those with no key at all, keep
/// `None` customer attributes.
///
/// # Errors
///
/// Returns [`TransformError::DuplicateCustomerKey`] for the first key (in
/// customer input order) that occurs more than once.
pub fn merge(
    orders: Vec<RawOrder>,
    customers: Vec<RawCustomer>,
) -> Result<MergeOutput, TransformError> {
    let index = index_customers(customers)?;

    let mut unmatched = 0;
    let records = orders
        .into_iter()
        .map(|order| {
            let customer = order.customer_key.as_ref().and_then(|key| index.get(key));
            if customer.is_none() {
                unmatched += 1;
            }
            MergedRecord {
                order_id: order.order_id,
                customer_name: customer.map(|c| c.customer_name.clone()),
                region: customer.and_then(|c| c.region.clone()),
                customer_key: order.customer_key,
                raw_price: order.raw_price,
                quantity: order.quantity,
                creation_timestamp: order.creation_timestamp,
            }
        })
        .collect();

    Ok(MergeOutput { records, unmatched })
}

fn index_customers(
    customers: Vec<RawCustomer>,
) -> Result<HashMap<String, RawCustomer>, TransformError> {
    let mut occurrences: HashMap<&str, usize> = HashMap::with_capacity(customers.len());
    for customer in &customers {
        *occurrences.entry(customer.customer_key.as_str()).or_default() += 1;
    }

    if let Some((key, count)) = customers.iter().find_map(|c| {
        let count = occurrences.get(c.customer_key.as_str()).copied().unwrap_or(0);
        (count > 1).then_some((c.customer_key.clone(), count))
    }) {
        return Err(TransformError::DuplicateCustomerKey {
            key,
            occurrences: count,
        });
    }

    Ok(customers
        .into_iter()
        .map(|c| (c.customer_key.clone(), c))
        .collect())
}
