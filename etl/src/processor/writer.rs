use crate::schema::OutputTable;
use crate::storage::StorageLocation;
use chrono::{DateTime, Utc};
use common::Result;
use datafusion::arrow::array::UInt64Array;
use datafusion::arrow::datatypes::DataType;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::common::config::TableParquetOptions;
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::logical_expr::cast;
use datafusion::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Not;
use tracing::{info, warn};

pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Outcome of one table write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWriteSummary {
    pub table: OutputTable,
    pub location: String,
    pub rows_written: u64,
}

/// Contents of the `_SUCCESS` object stored at a table root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMarker {
    pub table: String,
    pub rows_written: u64,
    pub partition_columns: Vec<String>,
    pub written_at: DateTime<Utc>,
}

/// Persists dimension and fact frames as Parquet tables under one output
/// root. Every write replaces whatever the table location held before.
pub struct TableWriter {
    ctx: SessionContext,
    output: StorageLocation,
    compression: String,
}

impl TableWriter {
    pub fn new(ctx: SessionContext, output: StorageLocation, compression: &str) -> Self {
        Self {
            ctx,
            output,
            compression: compression.to_string(),
        }
    }

    pub async fn write(&self, table: OutputTable, df: DataFrame) -> Result<TableWriteSummary> {
        let location = self.output.child(table.name())?;

        let removed = location.delete_all().await?;
        if removed > 0 {
            info!(%table, removed, "Cleared previous table contents");
        }

        let df = self.prepare(table, df).await?;
        let partition_by = table
            .partition_columns()
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        info!(%table, location = location.uri(), ?partition_by, "Writing table");

        let result = df
            .write_parquet(
                location.uri(),
                DataFrameWriteOptions::new().with_partition_by(partition_by.clone()),
                Some(self.parquet_options(table)),
            )
            .await?;
        let rows_written = rows_written(&result);

        let marker = TableMarker {
            table: table.name().to_string(),
            rows_written,
            partition_columns: partition_by,
            written_at: Utc::now(),
        };
        location
            .put(SUCCESS_MARKER, serde_json::to_vec_pretty(&marker)?)
            .await?;

        info!(%table, rows_written, "Table written");

        Ok(TableWriteSummary {
            table,
            location: location.uri().to_string(),
            rows_written,
        })
    }

    /// Fixes the column layout, drops rows with a null partition key and
    /// turns partition columns into strings for the hive directory names.
    ///
    /// Partitioned frames are materialized once here; the null-key count
    /// and the write both read the cached batches.
    async fn prepare(&self, table: OutputTable, df: DataFrame) -> Result<DataFrame> {
        let columns = table.columns();
        let partitions = table.partition_columns();

        let df = df.select(columns.iter().map(|c| col(*c)).collect::<Vec<_>>())?;
        let Some(null_key) = partitions
            .iter()
            .map(|c| col(*c).is_null())
            .reduce(|a, b| a.or(b))
        else {
            return Ok(df);
        };

        let df = df.cache().await?;
        let dropped = df.clone().filter(null_key.clone())?.count().await?;
        if dropped > 0 {
            warn!(%table, dropped, ?partitions, "Dropping rows with a null partition key");
        }

        let df = df.filter(null_key.not())?.select(
            columns
                .iter()
                .map(|c| {
                    if partitions.contains(c) {
                        cast(col(*c), DataType::Utf8).alias(*c)
                    } else {
                        col(*c)
                    }
                })
                .collect::<Vec<_>>(),
        )?;

        Ok(df)
    }

    fn parquet_options(&self, table: OutputTable) -> TableParquetOptions {
        let mut options = self.ctx.copied_table_options().parquet;
        options.global.compression = Some(self.compression.clone());
        options
            .key_value_metadata
            .insert("sparkify.table".to_string(), Some(table.name().to_string()));
        options.key_value_metadata.insert(
            "sparkify.written_at".to_string(),
            Some(Utc::now().to_rfc3339()),
        );
        options
    }
}

fn rows_written(batches: &[RecordBatch]) -> u64 {
    batches
        .iter()
        .filter_map(|batch| batch.column_by_name("count"))
        .filter_map(|column| column.as_any().downcast_ref::<UInt64Array>())
        .flat_map(|counts| counts.iter().flatten())
        .sum()
}
