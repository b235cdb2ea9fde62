use crate::processor::register_udfs;
use crate::storage::{S3Config, S3Manager, StorageLocation};
use common::Result;
use common::config::Settings;
use datafusion::prelude::*;
use tracing::info;

/// A DataFusion context wired to the job's input and output stores.
///
/// Credentials live in the stores registered on this context only; nothing
/// is exported to the process environment. Clones share the context.
#[derive(Clone)]
pub struct EtlSession {
    ctx: SessionContext,
    compression: String,
}

impl EtlSession {
    pub fn new(settings: &Settings) -> Result<Self> {
        let ctx = SessionContext::new();
        register_udfs(&ctx)?;

        let s3_manager = S3Manager::new(S3Config::from(&settings.aws));
        for root in [&settings.etl.input_root, &settings.etl.output_root] {
            s3_manager.register_root(&ctx, root)?;
        }

        info!(
            input_root = %settings.etl.input_root,
            output_root = %settings.etl.output_root,
            region = %settings.aws.aws_region,
            "ETL session ready"
        );

        Ok(Self {
            ctx,
            compression: settings.etl.compression.clone(),
        })
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn compression(&self) -> &str {
        &self.compression
    }

    /// Resolves `uri` to a location in one of the session's stores.
    pub fn resolve(&self, uri: &str) -> Result<StorageLocation> {
        StorageLocation::resolve(&self.ctx, uri)
    }
}
