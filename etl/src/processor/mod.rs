pub mod logs;
pub mod songs;
pub mod udf;
pub mod writer;

pub use logs::ActivityLogProcessor;
pub use songs::SongCatalogProcessor;
pub use udf::register_udfs;
pub use writer::{TableMarker, TableWriteSummary, TableWriter};

use crate::storage::StorageLocation;
use crate::utils::glob::PathPattern;
use crate::utils::paths::LakePaths;
use arrow::datatypes::Schema;
use async_trait::async_trait;
use common::{Error, Result};
use datafusion::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// One stage of the job: reads a source dataset and writes the tables
/// derived from it.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, paths: &LakePaths) -> Result<Vec<TableWriteSummary>>;
}

/// Loads every file matching `pattern` under `root` as one NDJSON frame.
///
/// Fails with [`Error::NoInputFiles`] when nothing matches.
pub async fn load_json(
    ctx: &SessionContext,
    root: &StorageLocation,
    pattern: &str,
    schema: &Schema,
) -> Result<DataFrame> {
    let pattern = PathPattern::parse(pattern)?;
    let files = root.list_matching(&pattern).await?;

    if files.is_empty() {
        return Err(Error::NoInputFiles {
            root: root.uri().to_string(),
            pattern: pattern.as_str().to_string(),
        });
    }

    info!(
        root = root.uri(),
        pattern = pattern.as_str(),
        files = files.len(),
        "Loading JSON input"
    );

    let options = NdJsonReadOptions::default()
        .schema(schema)
        .file_extension(crate::storage::location::JSON_EXTENSION);
    let df = ctx.read_json(files, options).await?;

    Ok(df)
}

static TEMP_VIEW_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Runs `sql` against `df` registered under a throwaway view name, which
/// the query refers to as `{view}`.
async fn with_temp_view(ctx: &SessionContext, df: DataFrame, sql: &str) -> Result<DataFrame> {
    let view = format!(
        "temp_view_{}",
        TEMP_VIEW_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    ctx.register_table(view.as_str(), df.into_view())?;

    // The plan holds the provider, so the name can go straight away.
    let result = ctx.sql(&sql.replace("{view}", &view)).await;
    ctx.deregister_table(view.as_str())?;

    Ok(result?)
}

/// Keeps a single row per distinct `key`: the first one under `order_by`
/// (a SQL `ORDER BY` list). Columns and their order are preserved.
pub async fn keep_first_by(
    ctx: &SessionContext,
    df: DataFrame,
    key: &str,
    order_by: &str,
) -> Result<DataFrame> {
    let columns = df
        .schema()
        .fields()
        .iter()
        .map(|f| quote_ident(f.name()))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "SELECT {columns} FROM (\
           SELECT *, ROW_NUMBER() OVER (PARTITION BY {key} ORDER BY {order_by}) AS dedup_rank \
           FROM {{view}}\
         ) ranked WHERE dedup_rank = 1",
        columns = columns,
        key = quote_ident(key),
        order_by = order_by,
    );

    with_temp_view(ctx, df, &sql).await
}

/// Appends `alias`, a 1-based Int64 row counter following `order_by`.
pub async fn number_rows(
    ctx: &SessionContext,
    df: DataFrame,
    order_by: &str,
    alias: &str,
) -> Result<DataFrame> {
    let sql = format!(
        "SELECT *, CAST(ROW_NUMBER() OVER (ORDER BY {order_by}) AS BIGINT) AS {alias} FROM {{view}}",
        order_by = order_by,
        alias = quote_ident(alias),
    );

    with_temp_view(ctx, df, &sql).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::array::{Array, Int64Array, RecordBatch, StringArray};
    use datafusion::arrow::compute::cast;
    use datafusion::arrow::datatypes::{DataType, Field};
    use std::sync::Arc;

    fn users(ctx: &SessionContext) -> DataFrame {
        let schema = Arc::new(Schema::new(vec![
            Field::new("userId", DataType::Utf8, true),
            Field::new("level", DataType::Utf8, true),
            Field::new("ts", DataType::Int64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["7", "7", "9"])),
                Arc::new(StringArray::from(vec!["free", "paid", "free"])),
                Arc::new(Int64Array::from(vec![100, 200, 150])),
            ],
        )
        .unwrap();
        ctx.read_batch(batch).unwrap()
    }

    fn strings(batches: &[RecordBatch], name: &str) -> Vec<String> {
        batches
            .iter()
            .flat_map(|batch| {
                let column = cast(batch.column_by_name(name).unwrap(), &DataType::Utf8).unwrap();
                let column = column.as_any().downcast_ref::<StringArray>().unwrap();
                (0..column.len())
                    .map(|i| column.value(i).to_string())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_keep_first_by_prefers_order() {
        let ctx = SessionContext::new();

        let deduped = keep_first_by(&ctx, users(&ctx), "userId", "\"ts\" DESC")
            .await
            .unwrap()
            .sort(vec![col("userId").sort(true, true)])
            .unwrap();

        let fields: Vec<String> = deduped
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(fields, vec!["userId", "level", "ts"]);

        let batches = deduped.collect().await.unwrap();
        assert_eq!(strings(&batches, "userId"), vec!["7", "9"]);
        assert_eq!(strings(&batches, "level"), vec!["paid", "free"]);
    }

    #[tokio::test]
    async fn test_number_rows_follows_order() {
        let ctx = SessionContext::new();

        let numbered = number_rows(&ctx, users(&ctx), "\"ts\"", "row_id")
            .await
            .unwrap()
            .sort(vec![col("row_id").sort(true, true)])
            .unwrap();

        let batches = numbered.collect().await.unwrap();
        assert_eq!(strings(&batches, "ts"), vec!["100", "150", "200"]);
        assert_eq!(strings(&batches, "row_id"), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_temp_views_are_removed() {
        let ctx = SessionContext::new();
        number_rows(&ctx, users(&ctx), "\"ts\"", "row_id").await.unwrap();

        let catalog = ctx.catalog("datafusion").unwrap();
        let schema = catalog.schema("public").unwrap();
        assert!(schema.table_names().is_empty());
    }

    #[tokio::test]
    async fn test_load_json_requires_matches() {
        let ctx = SessionContext::new();
        let dir = tempfile::tempdir().unwrap();
        let root = StorageLocation::resolve(&ctx, dir.path().to_str().unwrap()).unwrap();

        let err = load_json(&ctx, &root, "song_data/*/*/*", &Schema::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoInputFiles { .. }));
    }
}
