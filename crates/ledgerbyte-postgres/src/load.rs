//! Analytics table loader.
//!
//! Each load runs in one transaction: ensure schema and table, truncate,
//! then multi-value INSERT in chunks. A failed load leaves the previous
//! table contents in place.

use std::fmt::Write as _;

use anyhow::{anyhow, Context};
use arrow::array::{
    Array, ArrayRef, Float64Array, Int32Array, Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime};
use ledgerbyte_engine::config::{ConnectionConfig, DestinationConfig, SourceConfig};
use ledgerbyte_engine::Loader;
use pg_escape::quote_identifier;
use tokio_postgres::types::ToSql;
use tokio_postgres::Transaction;

use crate::client::connect;
use crate::type_map::arrow_to_pg_type;

/// Rows per INSERT statement.
pub(crate) const INSERT_CHUNK_SIZE: usize = 1000;

/// Replaces the contents of the analytics table with each batch.
#[derive(Debug, Clone)]
pub struct PostgresLoader {
    connection: ConnectionConfig,
    schema: String,
    table: String,
}

impl PostgresLoader {
    /// Loader for `destination`, connecting with the source credentials when
    /// the destination names none.
    #[must_use]
    pub fn new(destination: &DestinationConfig, source: &SourceConfig) -> Self {
        Self {
            connection: destination.connection_or(&source.connection).clone(),
            schema: destination.schema.clone(),
            table: destination.table.clone(),
        }
    }

    fn qualified_table(&self) -> String {
        qualified_table(&self.schema, &self.table)
    }
}

impl Loader for PostgresLoader {
    async fn load(&mut self, batch: &RecordBatch) -> anyhow::Result<u64> {
        let qualified = self.qualified_table();
        tracing::info!(
            table = %qualified,
            rows = batch.num_rows(),
            "Starting load"
        );

        let mut client = connect(&self.connection).await?;
        let tx = client
            .transaction()
            .await
            .context("Failed to begin load transaction")?;

        tx.batch_execute(&format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            quote_identifier(&self.schema)
        ))
        .await
        .with_context(|| format!("Failed to create schema {}", self.schema))?;

        let ddl = create_table_sql(&qualified, &batch.schema());
        tracing::debug!(ddl = %ddl, "Ensuring analytics table");
        tx.batch_execute(&ddl)
            .await
            .with_context(|| format!("Failed to create table {qualified}"))?;

        tx.batch_execute(&format!("TRUNCATE TABLE {qualified}"))
            .await
            .with_context(|| format!("Failed to truncate {qualified}"))?;

        let written = insert_batch(&tx, &qualified, batch).await?;

        tx.commit()
            .await
            .context("Failed to commit load transaction")?;

        tracing::info!(table = %qualified, rows = written, "Load complete");
        Ok(written)
    }
}

pub(crate) fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(table))
}

pub(crate) fn create_table_sql(qualified_table: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|field| {
            let nullable = if field.is_nullable() { "" } else { " NOT NULL" };
            format!(
                "{} {}{}",
                quote_identifier(field.name()),
                arrow_to_pg_type(field.data_type()),
                nullable
            )
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        qualified_table,
        columns.join(", ")
    )
}

/// `INSERT INTO t (cols) VALUES ($1, ..), (..)` for `rows` rows.
pub(crate) fn insert_sql(qualified_table: &str, schema: &Schema, rows: usize) -> String {
    let col_list = schema
        .fields()
        .iter()
        .map(|f| quote_identifier(f.name()))
        .collect::<Vec<_>>()
        .join(", ");
    let width = schema.fields().len();

    let mut sql = format!("INSERT INTO {qualified_table} ({col_list}) VALUES ");
    let mut param = 0;
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for col in 0..width {
            if col > 0 {
                sql.push_str(", ");
            }
            param += 1;
            let _ = write!(sql, "${param}");
        }
        sql.push(')');
    }
    sql
}

async fn insert_batch(
    tx: &Transaction<'_>,
    qualified_table: &str,
    batch: &RecordBatch,
) -> anyhow::Result<u64> {
    let num_rows = batch.num_rows();
    if num_rows == 0 {
        return Ok(0);
    }

    let schema = batch.schema();
    let typed_cols = batch
        .columns()
        .iter()
        .map(TypedCol::from_array)
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut total_rows: u64 = 0;
    for chunk_start in (0..num_rows).step_by(INSERT_CHUNK_SIZE) {
        let chunk_end = (chunk_start + INSERT_CHUNK_SIZE).min(num_rows);
        let sql = insert_sql(qualified_table, &schema, chunk_end - chunk_start);

        let params: Vec<SqlParamValue<'_>> = (chunk_start..chunk_end)
            .flat_map(|row| typed_cols.iter().map(move |col| col.value(row)))
            .collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(SqlParamValue::as_tosql).collect();

        tx.execute(&sql, &param_refs).await.with_context(|| {
            format!("Multi-value INSERT failed for {qualified_table}, rows {chunk_start}-{chunk_end}")
        })?;
        total_rows += (chunk_end - chunk_start) as u64;
    }

    Ok(total_rows)
}

/// Arrow column resolved to its concrete array type once per batch.
enum TypedCol<'a> {
    Int32(&'a Int32Array),
    Int64(&'a Int64Array),
    Float64(&'a Float64Array),
    Utf8(&'a StringArray),
    TimestampMicros(&'a TimestampMicrosecondArray),
}

impl<'a> TypedCol<'a> {
    fn from_array(array: &'a ArrayRef) -> anyhow::Result<Self> {
        let any = array.as_any();
        let typed = match array.data_type() {
            DataType::Int32 => any.downcast_ref().map(TypedCol::Int32),
            DataType::Int64 => any.downcast_ref().map(TypedCol::Int64),
            DataType::Float64 => any.downcast_ref().map(TypedCol::Float64),
            DataType::Utf8 => any.downcast_ref().map(TypedCol::Utf8),
            DataType::Timestamp(TimeUnit::Microsecond, None) => {
                any.downcast_ref().map(TypedCol::TimestampMicros)
            }
            other => return Err(anyhow!("unsupported column type {other}")),
        };
        typed.ok_or_else(|| anyhow!("column does not match its {} type", array.data_type()))
    }

    fn value(&self, row: usize) -> SqlParamValue<'a> {
        match self {
            Self::Int32(arr) => SqlParamValue::Int32((!arr.is_null(row)).then(|| arr.value(row))),
            Self::Int64(arr) => SqlParamValue::Int64((!arr.is_null(row)).then(|| arr.value(row))),
            Self::Float64(arr) => {
                SqlParamValue::Float64((!arr.is_null(row)).then(|| arr.value(row)))
            }
            Self::Utf8(arr) => SqlParamValue::Text((!arr.is_null(row)).then(|| arr.value(row))),
            Self::TimestampMicros(arr) => SqlParamValue::Timestamp(if arr.is_null(row) {
                None
            } else {
                DateTime::from_timestamp_micros(arr.value(row)).map(|dt| dt.naive_utc())
            }),
        }
    }
}

enum SqlParamValue<'a> {
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float64(Option<f64>),
    Text(Option<&'a str>),
    Timestamp(Option<NaiveDateTime>),
}

impl SqlParamValue<'_> {
    fn as_tosql(&self) -> &(dyn ToSql + Sync) {
        match self {
            Self::Int32(v) => v,
            Self::Int64(v) => v,
            Self::Float64(v) => v,
            Self::Text(v) => v,
            Self::Timestamp(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerbyte_types::arrow::{accepted_to_batch, analytics_schema};
    use chrono::NaiveDate;
    use ledgerbyte_types::record::AcceptedRecord;
    use rstest::rstest;

    fn accepted(order_id: i64) -> AcceptedRecord {
        AcceptedRecord {
            order_id,
            customer_key: "CUST_001".into(),
            customer_name: "Ann".into(),
            region: "EU".into(),
            price_usd: 25.0,
            quantity: 4,
            total_sale: 100.0,
            creation_timestamp: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
        }
    }

    #[test]
    fn create_table_uses_analytics_layout() {
        let ddl = create_table_sql(&qualified_table("public", "analytics_sales"), &analytics_schema());
        assert_eq!(
            ddl,
            "CREATE TABLE IF NOT EXISTS public.analytics_sales (\
             order_id BIGINT NOT NULL, customer_key TEXT NOT NULL, \
             customer_name TEXT NOT NULL, region TEXT NOT NULL, \
             price_usd DOUBLE PRECISION NOT NULL, quantity INTEGER NOT NULL, \
             total_sale DOUBLE PRECISION NOT NULL, creation_timestamp TIMESTAMP NOT NULL)"
        );
    }

    #[test]
    fn insert_sql_numbers_params_row_major() {
        let sql = insert_sql("public.analytics_sales", &analytics_schema(), 2);
        assert!(sql.starts_with("INSERT INTO public.analytics_sales (order_id, customer_key,"));
        assert!(sql.contains("VALUES ($1, $2, $3, $4, $5, $6, $7, $8), ($9,"));
        assert!(sql.ends_with("$16)"));
    }

    #[rstest]
    #[case(1, "$8)")]
    #[case(3, "$24)")]
    #[case(INSERT_CHUNK_SIZE, "$8000)")]
    fn insert_sql_sizes_to_chunk(#[case] rows: usize, #[case] last: &str) {
        let sql = insert_sql("public.analytics_sales", &analytics_schema(), rows);
        assert_eq!(sql.matches('(').count(), rows + 1);
        assert!(sql.ends_with(last));
    }

    #[rstest]
    #[case("public", "analytics_sales", "public.analytics_sales")]
    #[case("Reporting", "sales", "\"Reporting\".sales")]
    #[case("public", "Sales 2024", "public.\"Sales 2024\"")]
    fn qualified_table_quotes_when_needed(
        #[case] schema: &str,
        #[case] table: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(qualified_table(schema, table), expected);
    }

    #[test]
    fn typed_columns_yield_record_values() {
        let batch = accepted_to_batch(&[accepted(1001), accepted(1002)]).unwrap();
        let cols: Vec<TypedCol<'_>> = batch
            .columns()
            .iter()
            .map(TypedCol::from_array)
            .collect::<anyhow::Result<_>>()
            .unwrap();
        assert_eq!(cols.len(), 8);

        assert!(matches!(cols[0].value(1), SqlParamValue::Int64(Some(1002))));
        assert!(matches!(cols[3].value(0), SqlParamValue::Text(Some("EU"))));
        assert!(matches!(cols[5].value(0), SqlParamValue::Int32(Some(4))));
        match cols[7].value(0) {
            SqlParamValue::Timestamp(Some(ts)) => {
                assert_eq!(ts, accepted(1).creation_timestamp);
            }
            _ => panic!("expected timestamp param"),
        }
    }

    #[test]
    fn loader_falls_back_to_source_connection() {
        let source = SourceConfig {
            connection: ConnectionConfig {
                host: "db".into(),
                port: 5432,
                user: "etl".into(),
                password: String::new(),
                database: "shop".into(),
            },
            orders_table: "raw_orders".into(),
            customers_table: "raw_customers".into(),
        };
        let loader = PostgresLoader::new(&DestinationConfig::default(), &source);
        assert_eq!(loader.connection.display_target(), "db:5432/shop");
        assert_eq!(loader.qualified_table(), "public.analytics_sales");
    }
}
