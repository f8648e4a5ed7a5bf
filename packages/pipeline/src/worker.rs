//! Job bodies.
//!
//! Each function runs on a blocking thread, builds its own external session
//! from [`JobServices`], reports progress through an [`EventSink`] and returns
//! the job's outcome. The session is dropped when the function returns.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use ftclaw_harvester::enrich::needs_enrichment;
use ftclaw_harvester::{EnrichSummary, LawRecord};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::archive::{ArchiveReport, Archiver};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::export::write_workbook;
use crate::models::ScrapeTarget;
use crate::services::JobServices;

/// Final label of a listing run.
pub const LISTING_DONE_LABEL: &str = "완료";

/// Final label of an enrichment run.
pub const ENRICH_DONE_LABEL: &str = "정보 수집 완료 (법령 및 행정규칙/고시 정보 반영 완료)";

/// Messages from a running job to the coordinator.
#[derive(Debug)]
pub enum JobEvent {
    Progress {
        run_id: Uuid,
        progress: usize,
        total: usize,
        label: String,
    },
    RecordUpdated {
        run_id: Uuid,
        index: usize,
        record: LawRecord,
    },
    Finished {
        run_id: Uuid,
        outcome: JobOutcome,
    },
}

#[derive(Debug)]
pub enum JobOutcome {
    Listed(Vec<LawRecord>),
    Enriched(EnrichSummary),
    Archived(ArchiveReport),
    Exported(PathBuf),
    Failed(String),
}

/// Event sender bound to one run.
#[derive(Debug, Clone)]
pub struct EventSink {
    run_id: Uuid,
    events: UnboundedSender<JobEvent>,
}

impl EventSink {
    pub fn new(run_id: Uuid, events: UnboundedSender<JobEvent>) -> Self {
        Self { run_id, events }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn progress(&self, progress: usize, total: usize, label: impl Into<String>) {
        self.send(JobEvent::Progress {
            run_id: self.run_id,
            progress,
            total,
            label: label.into(),
        });
    }

    pub fn record_updated(&self, index: usize, record: LawRecord) {
        self.send(JobEvent::RecordUpdated {
            run_id: self.run_id,
            index,
            record,
        });
    }

    pub fn finished(&self, outcome: JobOutcome) {
        self.send(JobEvent::Finished {
            run_id: self.run_id,
            outcome,
        });
    }

    fn send(&self, event: JobEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!(run_id = %self.run_id, "coordinator gone, dropping job event");
        }
    }
}

/// Fetch the listing for every category of `target`, in order.
#[tracing::instrument(skip(services, sink), fields(run_id = %sink.run_id()))]
pub fn run_listing(services: &dyn JobServices, target: ScrapeTarget, sink: &EventSink) -> Result<JobOutcome> {
    let listing = services.listing()?;
    let categories = target.categories();
    let mut records: Vec<LawRecord> = Vec::new();

    for (i, category) in categories.iter().enumerate() {
        let label = format!("카테고리 {category} 수집 중... ({}/{})", i + 1, categories.len());
        sink.progress(records.len(), records.len(), label.as_str());

        let found = listing.fetch_category(*category);
        if !found.is_empty() {
            records.extend(found);
            sink.progress(records.len(), records.len(), label);
        }
    }

    tracing::info!(records = records.len(), "listing finished");
    Ok(JobOutcome::Listed(records))
}

/// Enrich every record that still carries placeholder dates.
#[tracing::instrument(skip(services, records, sink), fields(run_id = %sink.run_id(), records = records.len()))]
pub fn run_enrichment(
    services: &dyn JobServices,
    records: Vec<LawRecord>,
    pause: Duration,
    sink: &EventSink,
) -> Result<JobOutcome> {
    let enricher = services.enricher()?;
    tracing::info!(strategy = enricher.name(), "enrichment started");

    let total = records.len();
    let mut summary = EnrichSummary::default();

    for (i, mut record) in records.into_iter().enumerate() {
        let label = format!("[{}/{total}] {} 시행정보 수집 중...", i + 1, record.title);
        sink.progress(i, total, label.as_str());

        if needs_enrichment(&record) {
            let outcome = enricher.enrich(&record);
            summary.record(&outcome);
            outcome.apply(&mut record);
            sink.record_updated(i, record);

            if !pause.is_zero() {
                thread::sleep(pause);
            }
        } else {
            summary.skipped += 1;
        }

        sink.progress(i + 1, total, label);
    }

    tracing::info!(
        enriched = summary.enriched,
        not_found = summary.not_found,
        errors = summary.errors,
        skipped = summary.skipped,
        "enrichment finished"
    );
    Ok(JobOutcome::Enriched(summary))
}

/// Print every linked record to PDF.
pub fn run_archive(
    services: &dyn JobServices,
    config: &ServerConfig,
    records: &[LawRecord],
    target_dir: Option<&Path>,
    sink: &EventSink,
) -> Result<JobOutcome> {
    let archiver = Archiver::new(services.browser()?, &config.output_dir).with_pause(config.archive_pause);
    let total = records.len();
    let report = archiver.run(records, target_dir, |done, label| sink.progress(done, total, label))?;
    Ok(JobOutcome::Archived(report))
}

pub fn run_export(records: &[LawRecord], output_dir: &Path) -> Result<JobOutcome> {
    write_workbook(records, output_dir).map(JobOutcome::Exported)
}
