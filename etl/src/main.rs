use anyhow::Context;
use clap::{Arg, Command};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "dl.cfg";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("sparkify-etl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Loads song and activity-log JSON into partitioned Parquet tables")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file (default: dl.cfg)"),
        )
        .get_matches();

    init_tracing();

    let config_path = matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_CONFIG);
    tracing::info!(config = config_path, "Starting ETL pipeline");

    let report = sparkify_etl::run_etl_pipeline(config_path)
        .await
        .with_context(|| format!("ETL pipeline failed (config: {})", config_path))?;

    for table in &report.tables {
        tracing::info!(
            table = %table.table,
            location = %table.location,
            rows = table.rows_written,
            "Wrote table"
        );
    }

    Ok(())
}
