use crate::processor::{ActivityLogProcessor, Extractor, SongCatalogProcessor, TableWriteSummary};
use crate::session::EtlSession;
use crate::utils::paths::LakePaths;
use common::Result;
use tracing::{error, info};

/// Tables written by one run, in write order.
#[derive(Debug, Default, Clone)]
pub struct JobReport {
    pub tables: Vec<TableWriteSummary>,
}

impl JobReport {
    pub fn rows_written(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_written).sum()
    }
}

/// Runs extractors one after another against the same roots.
///
/// A failing extractor stops the run. Tables written by earlier extractors
/// are left in place.
pub struct JobDriver {
    extractors: Vec<Box<dyn Extractor>>,
}

impl JobDriver {
    pub fn new(extractors: Vec<Box<dyn Extractor>>) -> Self {
        Self { extractors }
    }

    /// Song catalog first, then activity logs.
    pub fn for_session(session: &EtlSession) -> Self {
        Self::new(vec![
            Box::new(SongCatalogProcessor::new(session)),
            Box::new(ActivityLogProcessor::new(session)),
        ])
    }

    pub async fn run(&self, paths: &LakePaths) -> Result<JobReport> {
        let mut report = JobReport::default();

        for extractor in &self.extractors {
            info!(extractor = extractor.name(), "Starting extractor");
            match extractor.run(paths).await {
                Ok(tables) => {
                    info!(
                        extractor = extractor.name(),
                        tables = tables.len(),
                        "Extractor finished"
                    );
                    report.tables.extend(tables);
                }
                Err(e) => {
                    error!(extractor = extractor.name(), error = %e, "Extractor failed");
                    return Err(e);
                }
            }
        }

        Ok(report)
    }
}
