//! Recreate the raw source tables from generated data.
//!
//! Both tables are dropped and recreated with fixed DDL, then filled with
//! chunked INSERTs inside one transaction.

use std::fmt::Write as _;

use anyhow::Context;
use ledgerbyte_engine::config::SourceConfig;
use ledgerbyte_engine::transform::parse_timestamp;
use ledgerbyte_types::record::RawTables;
use pg_escape::quote_identifier;
use tokio_postgres::types::ToSql;
use tokio_postgres::Transaction;

use crate::client::connect;
use crate::load::INSERT_CHUNK_SIZE;

type Param = Box<dyn ToSql + Send + Sync>;

/// Column name and the cast applied to its placeholder.
const CUSTOMER_INSERT_COLUMNS: [(&str, &str); 4] = [
    ("customer_key", ""),
    ("customer_name", ""),
    ("region", ""),
    ("email_address", ""),
];

const ORDER_INSERT_COLUMNS: [(&str, &str); 5] = [
    ("order_id", "::int8"),
    ("customer_key", ""),
    ("raw_price", "::float8"),
    ("quantity", "::int8"),
    ("creation_timestamp", "::timestamp"),
];

pub(crate) fn customers_ddl(table: &str) -> String {
    let table = quote_identifier(table);
    format!(
        "DROP TABLE IF EXISTS {table};\n\
         CREATE TABLE {table} (\n    \
             customer_key VARCHAR(10) PRIMARY KEY,\n    \
             customer_name VARCHAR(100) NOT NULL,\n    \
             region TEXT,\n    \
             email_address VARCHAR(100)\n\
         );"
    )
}

pub(crate) fn orders_ddl(table: &str) -> String {
    let table = quote_identifier(table);
    format!(
        "DROP TABLE IF EXISTS {table};\n\
         CREATE TABLE {table} (\n    \
             order_id INTEGER,\n    \
             customer_key VARCHAR(10),\n    \
             raw_price NUMERIC,\n    \
             quantity INTEGER,\n    \
             creation_timestamp TIMESTAMP WITHOUT TIME ZONE\n\
         );"
    )
}

pub(crate) fn insert_sql(table: &str, columns: &[(&str, &str)], rows: usize) -> String {
    let col_list = columns
        .iter()
        .map(|(name, _)| quote_identifier(name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!("INSERT INTO {} ({col_list}) VALUES ", quote_identifier(table));
    let mut param = 0;
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (pos, (_, cast)) in columns.iter().enumerate() {
            if pos > 0 {
                sql.push_str(", ");
            }
            param += 1;
            let _ = write!(sql, "${param}{cast}");
        }
        sql.push(')');
    }
    sql
}

/// Drop, recreate, and fill the raw customers and orders tables.
///
/// Returns the number of customer and order rows written.
///
/// # Errors
///
/// Returns an error if the connection, DDL, or any INSERT fails. The
/// transaction is rolled back in that case.
pub async fn seed_raw_tables(source: &SourceConfig, tables: &RawTables) -> anyhow::Result<(u64, u64)> {
    let mut client = connect(&source.connection).await?;
    let tx = client
        .transaction()
        .await
        .context("Failed to begin seed transaction")?;

    tx.batch_execute(&customers_ddl(&source.customers_table))
        .await
        .with_context(|| format!("Failed to recreate {}", source.customers_table))?;
    tx.batch_execute(&orders_ddl(&source.orders_table))
        .await
        .with_context(|| format!("Failed to recreate {}", source.orders_table))?;

    let customer_rows: Vec<Vec<Param>> = tables
        .customers
        .iter()
        .map(|c| {
            vec![
                Box::new(c.customer_key.clone()) as Param,
                Box::new(c.customer_name.clone()),
                Box::new(c.region.clone()),
                Box::new(c.email_address.clone()),
            ]
        })
        .collect();
    let customers = insert_rows(
        &tx,
        &source.customers_table,
        &CUSTOMER_INSERT_COLUMNS,
        &customer_rows,
    )
    .await?;

    let order_rows: Vec<Vec<Param>> = tables
        .orders
        .iter()
        .map(|o| {
            vec![
                Box::new(o.order_id) as Param,
                Box::new(o.customer_key.clone()),
                Box::new(o.raw_price),
                Box::new(o.quantity),
                Box::new(parse_timestamp(&o.creation_timestamp)),
            ]
        })
        .collect();
    let orders = insert_rows(&tx, &source.orders_table, &ORDER_INSERT_COLUMNS, &order_rows).await?;

    tx.commit().await.context("Failed to commit seed transaction")?;

    tracing::info!(
        customers_table = %source.customers_table,
        customers,
        orders_table = %source.orders_table,
        orders,
        "Seeded raw tables"
    );
    Ok((customers, orders))
}

async fn insert_rows(
    tx: &Transaction<'_>,
    table: &str,
    columns: &[(&str, &str)],
    rows: &[Vec<Param>],
) -> anyhow::Result<u64> {
    let mut written = 0;
    for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
        let sql = insert_sql(table, columns, chunk.len());
        let params: Vec<&(dyn ToSql + Sync)> = chunk
            .iter()
            .flatten()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();
        tx.execute(&sql, &params)
            .await
            .with_context(|| format!("INSERT into {table} failed"))?;
        written += chunk.len() as u64;
    }
    Ok(written)
}
