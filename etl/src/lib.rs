pub mod pipeline;
pub mod processor;
pub mod schema;
pub mod session;
pub mod storage;
pub mod utils;

use common::Result;
use common::config::Settings;
use pipeline::{JobDriver, JobReport};
use session::EtlSession;
use tracing::info;
use utils::paths::LakePaths;

/// Runs the complete song/log to Parquet job described by `config_path`.
pub async fn run_etl_pipeline(config_path: &str) -> Result<JobReport> {
    let settings = Settings::new(config_path)?;
    run_with_settings(&settings).await
}

pub async fn run_with_settings(settings: &Settings) -> Result<JobReport> {
    let session = EtlSession::new(settings)?;
    let paths = LakePaths::new(&settings.etl.input_root, &settings.etl.output_root);

    let report = JobDriver::for_session(&session).run(&paths).await?;

    info!(
        tables = report.tables.len(),
        rows_written = report.rows_written(),
        "ETL pipeline completed"
    );

    Ok(report)
}
