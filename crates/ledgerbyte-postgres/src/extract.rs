//! Raw-table extraction from PostgreSQL.
//!
//! Columns are cast server-side to the shapes the transform expects:
//! `raw_price` to `float8`, `quantity` to `int8`, and the timestamp to its
//! text form so the validation gate decides whether it parses. SQL NULLs map
//! to values the gate rejects (`MISSING_ORDER_ID`, NaN price, absent key,
//! empty timestamp) so one bad row never fails the extract.

use std::fmt::Write as _;

use anyhow::{bail, Context};
use ledgerbyte_engine::config::{ConnectionConfig, SourceConfig};
use ledgerbyte_engine::Extractor;
use ledgerbyte_types::record::{
    require_columns, RawCustomer, RawOrder, RawTables, CUSTOMER_COLUMNS, MISSING_ORDER_ID,
    ORDER_COLUMNS,
};
use pg_escape::quote_identifier;
use tokio_postgres::{Client, Row};

use crate::client::connect;

/// Reads the raw orders and customers tables from the source database.
#[derive(Debug, Clone)]
pub struct PostgresExtractor {
    connection: ConnectionConfig,
    orders_table: String,
    customers_table: String,
}

impl PostgresExtractor {
    #[must_use]
    pub fn new(source: &SourceConfig) -> Self {
        Self {
            connection: source.connection.clone(),
            orders_table: source.orders_table.clone(),
            customers_table: source.customers_table.clone(),
        }
    }
}

impl Extractor for PostgresExtractor {
    async fn extract(&self, limit: Option<u64>) -> anyhow::Result<RawTables> {
        let client = connect(&self.connection).await?;

        ensure_columns(&client, &self.orders_table, &ORDER_COLUMNS).await?;
        ensure_columns(&client, &self.customers_table, &CUSTOMER_COLUMNS).await?;

        let orders = client
            .query(&orders_query(&self.orders_table, limit), &[])
            .await
            .with_context(|| format!("Failed to read {}", self.orders_table))?
            .iter()
            .map(order_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;
        tracing::info!(table = %self.orders_table, rows = orders.len(), "Extracted orders");
        let missing_ids = orders
            .iter()
            .filter(|o| o.order_id == MISSING_ORDER_ID)
            .count();
        if missing_ids > 0 {
            tracing::warn!(
                table = %self.orders_table,
                rows = missing_ids,
                "Orders with NULL order_id will be rejected"
            );
        }

        let customers = client
            .query(&customers_query(&self.customers_table), &[])
            .await
            .with_context(|| format!("Failed to read {}", self.customers_table))?
            .iter()
            .map(customer_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;
        tracing::info!(
            table = %self.customers_table,
            rows = customers.len(),
            "Extracted customers"
        );

        Ok(RawTables { orders, customers })
    }
}

/// Fail unless `table` exists in the current schema with every required
/// column. Missing columns surface as a structural error.
async fn ensure_columns(client: &Client, table: &str, required: &[&str]) -> anyhow::Result<()> {
    let present: Vec<String> = client
        .query(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1",
            &[&table],
        )
        .await
        .with_context(|| format!("Failed to inspect columns of {table}"))?
        .iter()
        .map(|row| row.try_get::<_, String>(0))
        .collect::<Result<_, _>>()?;

    if present.is_empty() {
        bail!("table '{table}' does not exist in the current schema");
    }
    require_columns(table, present.as_slice(), required)?;
    Ok(())
}

pub(crate) fn orders_query(table: &str, limit: Option<u64>) -> String {
    let mut sql = format!(
        "SELECT order_id::int8, customer_key::text, raw_price::float8, \
         quantity::int8, creation_timestamp::text FROM {} ORDER BY ctid",
        quote_identifier(table)
    );
    if let Some(limit) = limit {
        let _ = write!(sql, " LIMIT {limit}");
    }
    sql
}

pub(crate) fn customers_query(table: &str) -> String {
    format!(
        "SELECT customer_key::text, customer_name::text, region::text, \
         email_address::text FROM {} ORDER BY ctid",
        quote_identifier(table)
    )
}

fn order_from_row(row: &Row) -> anyhow::Result<RawOrder> {
    Ok(raw_order(
        row.try_get(0)?,
        row.try_get(1)?,
        row.try_get(2)?,
        row.try_get(3)?,
        row.try_get(4)?,
    ))
}

/// Map one nullable orders row onto a [`RawOrder`].
pub(crate) fn raw_order(
    order_id: Option<i64>,
    customer_key: Option<String>,
    raw_price: Option<f64>,
    quantity: Option<i64>,
    creation_timestamp: Option<String>,
) -> RawOrder {
    RawOrder {
        order_id: order_id.unwrap_or(MISSING_ORDER_ID),
        customer_key,
        raw_price: raw_price.unwrap_or(f64::NAN),
        quantity,
        creation_timestamp: creation_timestamp.unwrap_or_default(),
    }
}

fn customer_from_row(row: &Row) -> anyhow::Result<RawCustomer> {
    Ok(RawCustomer {
        customer_key: row.try_get::<_, Option<String>>(0)?.unwrap_or_default(),
        customer_name: row.try_get::<_, Option<String>>(1)?.unwrap_or_default(),
        region: row.try_get(2)?,
        email_address: row.try_get(3)?,
    })
}
