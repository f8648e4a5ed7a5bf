//! Single-job coordinator.
//!
//! One actor task owns [`JobState`]. HTTP handlers talk to it through a
//! [`CoordinatorHandle`]; running jobs report back over an event channel.
//! Only one job runs at a time and a rejected start leaves the state as it
//! was.

use std::path::PathBuf;
use std::sync::Arc;

use ftclaw_harvester::LawRecord;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{PipelineError, Result};
use crate::export::EMPTY_DATASET_MESSAGE;
use crate::models::{ArchiveStatus, Phase, ScrapeTarget, StatusSnapshot};
use crate::services::JobServices;
use crate::worker::{self, EventSink, JobEvent, JobOutcome, ENRICH_DONE_LABEL, LISTING_DONE_LABEL};

const COMMAND_BUFFER: usize = 64;

/// Rejection message while another job runs.
pub const BUSY_MESSAGE: &str = "이미 다른 작업이 진행 중입니다.";

/// Rejection message for enrichment before any listing.
pub const NO_DATASET_MESSAGE: &str = "먼저 데이터 수집을 완료해주세요.";

enum Command {
    StartScrape {
        target: ScrapeTarget,
        reply: oneshot::Sender<Result<()>>,
    },
    StartEnrich {
        reply: oneshot::Sender<Result<()>>,
    },
    StartArchive {
        target_dir: Option<PathBuf>,
        reply: oneshot::Sender<Result<()>>,
    },
    Export {
        reply: oneshot::Sender<Result<String>>,
    },
    Status {
        reply: oneshot::Sender<StatusSnapshot>,
    },
    Results {
        reply: oneshot::Sender<Vec<LawRecord>>,
    },
    ArchiveStatus {
        reply: oneshot::Sender<Option<PathBuf>>,
    },
}

/// State owned by the coordinator actor.
#[derive(Debug, Default)]
pub struct JobState {
    pub phase: Phase,
    pub progress: usize,
    pub total: usize,
    pub current_label: String,
    pub dataset: Vec<LawRecord>,
    pub archive_path: Option<PathBuf>,
    run_id: Option<Uuid>,
}

impl JobState {
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            phase: self.phase,
            is_running: self.phase.is_running(),
            progress: self.progress,
            total: self.total,
            current_label: self.current_label.clone(),
            record_count: self.dataset.len(),
        }
    }
}

/// Cloneable client for the coordinator actor.
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| PipelineError::CoordinatorUnavailable)?;
        response.await.map_err(|_| PipelineError::CoordinatorUnavailable)
    }

    pub async fn start_scrape(&self, target: ScrapeTarget) -> Result<()> {
        self.request(|reply| Command::StartScrape { target, reply })
            .await?
    }

    pub async fn start_enrich(&self) -> Result<()> {
        self.request(|reply| Command::StartEnrich { reply }).await?
    }

    pub async fn start_archive(&self, target_dir: Option<PathBuf>) -> Result<()> {
        self.request(|reply| Command::StartArchive { target_dir, reply })
            .await?
    }

    /// Write the spreadsheet and return its file name.
    pub async fn export(&self) -> Result<String> {
        self.request(|reply| Command::Export { reply }).await?
    }

    pub async fn status(&self) -> Result<StatusSnapshot> {
        self.request(|reply| Command::Status { reply }).await
    }

    pub async fn results(&self) -> Result<Vec<LawRecord>> {
        self.request(|reply| Command::Results { reply }).await
    }

    /// Path of the last bundle, if it still exists on disk.
    pub async fn archive_path(&self) -> Result<Option<PathBuf>> {
        let path = self.request(|reply| Command::ArchiveStatus { reply }).await?;
        match path {
            Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => Ok(Some(path)),
            _ => Ok(None),
        }
    }

    pub async fn archive_status(&self) -> Result<ArchiveStatus> {
        let path = self.archive_path().await?;
        Ok(ArchiveStatus {
            has_bundle: path.is_some(),
            bundle_filename: path
                .as_deref()
                .and_then(|p| p.file_name())
                .map(|name| name.to_string_lossy().into_owned()),
        })
    }
}

/// Start the coordinator actor on the current runtime.
pub fn spawn_coordinator(config: ServerConfig, services: Arc<dyn JobServices>) -> CoordinatorHandle {
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let coordinator = Coordinator::new(Arc::new(config), services, events_tx);
    tokio::spawn(coordinator.run(commands_rx, events_rx));

    CoordinatorHandle {
        commands: commands_tx,
    }
}

struct Coordinator {
    config: Arc<ServerConfig>,
    services: Arc<dyn JobServices>,
    state: JobState,
    pending_export: Option<oneshot::Sender<Result<String>>>,
    events: UnboundedSender<JobEvent>,
}

impl Coordinator {
    fn new(
        config: Arc<ServerConfig>,
        services: Arc<dyn JobServices>,
        events: UnboundedSender<JobEvent>,
    ) -> Self {
        Self {
            config,
            services,
            state: JobState::default(),
            pending_export: None,
            events,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut events: UnboundedReceiver<JobEvent>,
    ) {
        tracing::info!("job coordinator started");
        loop {
            tokio::select! {
                biased;

                Some(event) = events.recv() => self.handle_event(event),
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }
        tracing::info!("job coordinator stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::StartScrape { target, reply } => {
                let _ = reply.send(self.start_scrape(target));
            }
            Command::StartEnrich { reply } => {
                let _ = reply.send(self.start_enrich());
            }
            Command::StartArchive { target_dir, reply } => {
                let _ = reply.send(self.start_archive(target_dir));
            }
            Command::Export { reply } => match self.start_export() {
                Ok(()) => self.pending_export = Some(reply),
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            Command::Status { reply } => {
                let _ = reply.send(self.state.snapshot());
            }
            Command::Results { reply } => {
                let _ = reply.send(self.state.dataset.clone());
            }
            Command::ArchiveStatus { reply } => {
                let _ = reply.send(self.state.archive_path.clone());
            }
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.state.phase.is_running() {
            return Err(PipelineError::JobConflict(BUSY_MESSAGE.to_string()));
        }
        Ok(())
    }

    fn start_scrape(&mut self, target: ScrapeTarget) -> Result<()> {
        self.ensure_idle()?;

        self.state.dataset.clear();
        let sink = self.begin(Phase::Listing, 0);
        tracing::info!(run_id = %sink.run_id(), target = %target, "starting listing job");

        let services = Arc::clone(&self.services);
        self.supervise(sink, move |sink| {
            worker::run_listing(services.as_ref(), target, sink)
        });
        Ok(())
    }

    fn start_enrich(&mut self) -> Result<()> {
        if self.state.dataset.is_empty() {
            return Err(PipelineError::EmptyDataset(NO_DATASET_MESSAGE.to_string()));
        }
        self.ensure_idle()?;

        let records = self.state.dataset.clone();
        let sink = self.begin(Phase::Enriching, records.len());
        tracing::info!(run_id = %sink.run_id(), records = records.len(), "starting enrichment job");

        let services = Arc::clone(&self.services);
        let pause = self.config.enrich_pause;
        self.supervise(sink, move |sink| {
            worker::run_enrichment(services.as_ref(), records, pause, sink)
        });
        Ok(())
    }

    fn start_archive(&mut self, target_dir: Option<PathBuf>) -> Result<()> {
        if self.state.dataset.is_empty() {
            return Err(PipelineError::EmptyDataset(EMPTY_DATASET_MESSAGE.to_string()));
        }
        self.ensure_idle()?;

        self.state.archive_path = None;
        let records = self.state.dataset.clone();
        let sink = self.begin(Phase::Archiving, records.len());
        tracing::info!(run_id = %sink.run_id(), records = records.len(), "starting archive job");

        let services = Arc::clone(&self.services);
        let config = Arc::clone(&self.config);
        self.supervise(sink, move |sink| {
            worker::run_archive(services.as_ref(), &config, &records, target_dir.as_deref(), sink)
        });
        Ok(())
    }

    fn start_export(&mut self) -> Result<()> {
        if self.state.dataset.is_empty() {
            return Err(PipelineError::EmptyDataset(EMPTY_DATASET_MESSAGE.to_string()));
        }
        self.ensure_idle()?;

        let run_id = Uuid::new_v4();
        self.state.phase = Phase::Exporting;
        self.state.run_id = Some(run_id);

        let records = self.state.dataset.clone();
        let output_dir = self.config.output_dir.clone();
        self.supervise(EventSink::new(run_id, self.events.clone()), move |_| {
            worker::run_export(&records, &output_dir)
        });
        Ok(())
    }

    /// Enter `phase` with fresh progress and return the new run's sink.
    fn begin(&mut self, phase: Phase, total: usize) -> EventSink {
        let run_id = Uuid::new_v4();
        self.state.phase = phase;
        self.state.run_id = Some(run_id);
        self.state.progress = 0;
        self.state.total = total;
        self.state.current_label.clear();
        EventSink::new(run_id, self.events.clone())
    }

    /// Run `job` on a blocking thread and always report exactly one `Finished`.
    fn supervise<F>(&self, sink: EventSink, job: F)
    where
        F: FnOnce(&EventSink) -> Result<JobOutcome> + Send + 'static,
    {
        tokio::spawn(async move {
            let job_sink = sink.clone();
            let outcome = match tokio::task::spawn_blocking(move || job(&job_sink)).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    tracing::error!(run_id = %sink.run_id(), error = %e, "job failed");
                    JobOutcome::Failed(e.to_string())
                }
                Err(e) => {
                    tracing::error!(run_id = %sink.run_id(), error = %e, "job aborted");
                    JobOutcome::Failed(e.to_string())
                }
            };
            sink.finished(outcome);
        });
    }

    fn is_current(&self, run_id: Uuid) -> bool {
        self.state.run_id == Some(run_id)
    }

    fn handle_event(&mut self, event: JobEvent) {
        match event {
            JobEvent::Progress {
                run_id,
                progress,
                total,
                label,
            } if self.is_current(run_id) => {
                self.state.progress = self.state.progress.max(progress);
                self.state.total = total;
                self.state.current_label = label;
            }
            JobEvent::RecordUpdated {
                run_id,
                index,
                record,
            } if self.is_current(run_id) => {
                if let Some(slot) = self.state.dataset.get_mut(index) {
                    *slot = record;
                }
            }
            JobEvent::Finished { run_id, outcome } if self.is_current(run_id) => {
                self.finish(outcome);
            }
            other => tracing::debug!(event = ?other, "ignoring event from a finished run"),
        }
    }

    fn finish(&mut self, outcome: JobOutcome) {
        let phase = self.state.phase;
        self.state.phase = Phase::Idle;
        self.state.run_id = None;

        match outcome {
            JobOutcome::Listed(records) => {
                self.state.progress = records.len();
                self.state.total = records.len();
                self.state.dataset = records;
                self.state.current_label = LISTING_DONE_LABEL.to_string();
            }
            JobOutcome::Enriched(_) => {
                self.state.current_label = ENRICH_DONE_LABEL.to_string();
            }
            JobOutcome::Archived(report) => {
                self.state.current_label = report.label();
                self.state.archive_path = report.bundle;
            }
            JobOutcome::Exported(path) => {
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if let Some(reply) = self.pending_export.take() {
                    let _ = reply.send(Ok(file_name));
                }
            }
            JobOutcome::Failed(error) => {
                if phase == Phase::Exporting {
                    if let Some(reply) = self.pending_export.take() {
                        let _ = reply.send(Err(PipelineError::JobFailed(error)));
                    }
                } else {
                    self.state.current_label = format!("작업 실패: {error}");
                }
            }
        }
        tracing::info!(phase = %phase, label = %self.state.current_label, "job finished");
    }
}
