use futures::{StreamExt, stream};
use serde::Serialize;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use webscrape_common::{Result, ScrapeError};
use webscrape_config::ScrapeSettings;
use webscrape_core::{ExtractionConfig, Extractor, FlowRecord, Relationship};
use webscrape_drivers::BrowserBackend;

/// Exit status when at least one record routed to failure.
const EXIT_ROUTED_FAILURE: u8 = 2;

/// A named extraction.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub config: ExtractionConfig,
}

/// Enabled jobs from the settings file.
pub fn jobs_from_settings(settings: &ScrapeSettings) -> Result<Vec<Job>> {
    let jobs: Vec<Job> = settings
        .enabled_jobs()
        .map(|spec| Job {
            id: spec.id.clone(),
            config: spec.to_extraction_config(),
        })
        .collect();
    if jobs.is_empty() {
        return Err(ScrapeError::Config("no enabled jobs configured".into()));
    }
    Ok(jobs)
}

/// Run every job once, with at most `max_concurrent` browser sessions open.
///
/// Records come back in completion order.
pub async fn run_round<B: BrowserBackend>(
    extractor: &Extractor<B>,
    jobs: &[Job],
    max_concurrent: usize,
    cancel: &CancellationToken,
) -> Vec<(String, FlowRecord)> {
    stream::iter(jobs)
        .map(|job| async move {
            let result = extractor.extract_with_cancel(&job.config, cancel).await;
            (job.id.clone(), FlowRecord::from(result))
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await
}

#[derive(Serialize)]
struct RoutedLine<'a> {
    job: &'a str,
    #[serde(flatten)]
    record: &'a FlowRecord,
}

/// Write one record as a JSON line.
pub fn emit<W: Write>(out: &mut W, job: &str, record: &FlowRecord) -> Result<()> {
    let line = serde_json::to_string(&RoutedLine { job, record })
        .map_err(|e| ScrapeError::Other(e.into()))?;
    writeln!(out, "{line}")?;
    out.flush()?;
    Ok(())
}

/// 0 when everything routed to success, 2 when anything routed to failure.
pub fn exit_status(records: &[(String, FlowRecord)]) -> u8 {
    if records
        .iter()
        .any(|(_, r)| r.relationship == Relationship::Failure)
    {
        EXIT_ROUTED_FAILURE
    } else {
        0
    }
}
