//! Deterministic synthetic source data with known defects.
//!
//! Orders are numbered `1000 + i` for `i` in `1..=orders`, with three planted
//! defects: order 50 reuses id 1049, order 100 references the nonexistent
//! customer `CUST_999`, and order 200 carries a negated price. About 10% of
//! customers lack a region and about 5% of orders lack a quantity.

use anyhow::ensure;
use chrono::{Duration, NaiveDateTime, Utc};
use ledgerbyte_types::record::{RawCustomer, RawOrder, RawTables};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Customer key that no generated customer owns.
pub const ORPHAN_CUSTOMER_KEY: &str = "CUST_999";

/// Largest customer count that leaves [`ORPHAN_CUSTOMER_KEY`] unowned.
pub const MAX_CUSTOMERS: usize = 998;

const DUPLICATE_ORDER_INDEX: usize = 50;
const ORPHAN_ORDER_INDEX: usize = 100;
const NEGATIVE_PRICE_INDEX: usize = 200;
const ORDER_ID_BASE: i64 = 1000;
const TIMESTAMP_WINDOW_DAYS: i64 = 30;

const FIRST_NAMES: [&str; 12] = [
    "Ada", "Bruno", "Chen", "Dalia", "Emeka", "Freya", "Goran", "Hana", "Ivan", "Jia", "Kofi",
    "Lena",
];
const LAST_NAMES: [&str; 10] = [
    "Okafor", "Lindqvist", "Moreau", "Tanaka", "Silva", "Novak", "Haddad", "Kowalski", "Reyes",
    "Byrne",
];
const COUNTRIES: [&str; 10] = [
    "Brazil", "Canada", "Egypt", "France", "Germany", "India", "Japan", "Kenya", "Mexico",
    "Norway",
];

/// Shape of the generated data set.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub customers: usize,
    pub orders: usize,
    /// Fixed seed for reproducible output; `None` draws from entropy.
    pub seed: Option<u64>,
    /// Timestamps fall in the 30 days before this instant.
    pub reference_time: NaiveDateTime,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            customers: 100,
            orders: 1000,
            seed: None,
            reference_time: Utc::now().naive_utc(),
        }
    }
}

/// Generate both raw tables.
///
/// # Errors
///
/// Returns an error when `customers` exceeds [`MAX_CUSTOMERS`], since the
/// planted orphan order would then join a real customer.
pub fn generate(config: &GeneratorConfig) -> anyhow::Result<RawTables> {
    ensure!(
        config.customers <= MAX_CUSTOMERS,
        "customers must be at most {MAX_CUSTOMERS} so that {ORPHAN_CUSTOMER_KEY} stays unmatched, got {}",
        config.customers
    );

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let customers = generate_customers(&mut rng, config.customers);
    let keys: Vec<&str> = customers.iter().map(|c| c.customer_key.as_str()).collect();
    let orders = generate_orders(&mut rng, config, &keys);

    Ok(RawTables { orders, customers })
}

fn generate_customers(rng: &mut StdRng, count: usize) -> Vec<RawCustomer> {
    (1..=count)
        .map(|i| {
            let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Pat");
            let last = LAST_NAMES.choose(rng).copied().unwrap_or("Doe");
            let region = (rng.gen::<f64>() > 0.1)
                .then(|| COUNTRIES.choose(rng).copied().unwrap_or("Unknown").to_string());
            RawCustomer {
                customer_key: format!("CUST_{i:03}"),
                customer_name: format!("{first} {last}"),
                region,
                email_address: Some(format!(
                    "{}.{}{i}@example.com",
                    first.to_lowercase(),
                    last.to_lowercase()
                )),
            }
        })
        .collect()
}

fn generate_orders(rng: &mut StdRng, config: &GeneratorConfig, keys: &[&str]) -> Vec<RawOrder> {
    let window_secs = TIMESTAMP_WINDOW_DAYS * 24 * 60 * 60;

    (1..=config.orders)
        .map(|i| {
            let order_id = if i == DUPLICATE_ORDER_INDEX {
                ORDER_ID_BASE + 49
            } else {
                ORDER_ID_BASE + i64::try_from(i).unwrap_or(i64::MAX - ORDER_ID_BASE)
            };

            let customer_key = if i == ORPHAN_ORDER_INDEX {
                ORPHAN_CUSTOMER_KEY
            } else {
                keys.choose(rng).copied().unwrap_or(ORPHAN_CUSTOMER_KEY)
            };

            let price = (rng.gen_range(10.0..=500.0_f64) * 100.0).round() / 100.0;
            let raw_price = if i == NEGATIVE_PRICE_INDEX { -price } else { price };

            let quantity = (rng.gen::<f64>() > 0.05).then(|| rng.gen_range(1..=5_i64));

            let created =
                config.reference_time - Duration::seconds(rng.gen_range(0..=window_secs));

            RawOrder {
                order_id,
                customer_key: Some(customer_key.to_string()),
                raw_price,
                quantity,
                creation_timestamp: created.format("%Y-%m-%d %H:%M:%S").to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::parse_timestamp;
    use chrono::NaiveDate;

    fn seeded(seed: u64) -> GeneratorConfig {
        GeneratorConfig {
            seed: Some(seed),
            reference_time: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn same_seed_same_data() {
        assert_eq!(generate(&seeded(7)).unwrap(), generate(&seeded(7)).unwrap());
        assert_ne!(generate(&seeded(7)).unwrap(), generate(&seeded(8)).unwrap());
    }

    #[test]
    fn plants_the_known_defects() {
        let tables = generate(&seeded(42)).unwrap();
        assert_eq!(tables.customers.len(), 100);
        assert_eq!(tables.orders.len(), 1000);

        assert_eq!(tables.orders[48].order_id, 1049);
        assert_eq!(tables.orders[49].order_id, 1049);
        assert_eq!(tables.orders[99].customer_key.as_deref(), Some(ORPHAN_CUSTOMER_KEY));
        assert!(tables.orders[199].raw_price < 0.0);
        assert_eq!(tables.orders[999].order_id, 2000);

        let negatives = tables.orders.iter().filter(|o| o.raw_price < 0.0).count();
        assert_eq!(negatives, 1);
    }

    #[test]
    fn values_stay_in_range() {
        let config = seeded(3);
        let tables = generate(&config).unwrap();
        let earliest = config.reference_time - Duration::days(TIMESTAMP_WINDOW_DAYS);

        for order in &tables.orders {
            let price = order.raw_price.abs();
            assert!((10.0..=500.0).contains(&price), "price {price}");
            assert!(((price * 100.0).round() - price * 100.0).abs() < 1e-6);
            if let Some(q) = order.quantity {
                assert!((1..=5).contains(&q));
            }
            let ts = parse_timestamp(&order.creation_timestamp).unwrap();
            assert!(ts >= earliest && ts <= config.reference_time);
        }

        assert_eq!(tables.customers[0].customer_key, "CUST_001");
        assert_eq!(tables.customers[99].customer_key, "CUST_100");
    }

    #[test]
    fn small_sets_skip_defects_out_of_range() {
        let tables = generate(&GeneratorConfig {
            customers: 3,
            orders: 10,
            ..seeded(1)
        })
        .unwrap();
        let ids: Vec<i64> = tables.orders.iter().map(|o| o.order_id).collect();
        assert_eq!(ids, (1001..=1010).collect::<Vec<_>>());
        assert!(tables
            .orders
            .iter()
            .all(|o| o.customer_key.as_deref() != Some(ORPHAN_CUSTOMER_KEY)));
    }

    #[test]
    fn no_customers_means_every_order_is_orphaned() {
        let tables = generate(&GeneratorConfig {
            customers: 0,
            orders: 5,
            ..seeded(1)
        })
        .unwrap();
        assert!(tables.customers.is_empty());
        assert!(tables
            .orders
            .iter()
            .all(|o| o.customer_key.as_deref() == Some(ORPHAN_CUSTOMER_KEY)));
    }

    #[test]
    fn customer_count_keeps_orphan_unowned() {
        let err = generate(&GeneratorConfig {
            customers: MAX_CUSTOMERS + 1,
            orders: 10,
            ..seeded(1)
        })
        .unwrap_err();
        assert!(err.to_string().contains(ORPHAN_CUSTOMER_KEY), "got: {err}");

        let tables = generate(&GeneratorConfig {
            customers: MAX_CUSTOMERS,
            orders: 100,
            ..seeded(1)
        })
        .unwrap();
        assert_eq!(tables.customers.last().unwrap().customer_key, "CUST_998");
        assert!(tables
            .customers
            .iter()
            .all(|c| c.customer_key != ORPHAN_CUSTOMER_KEY));
    }
}
