use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("harvester error: {0}")]
    Harvester(#[from] ftclaw_harvester::HarvesterError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("configuration error: {0}")]
    Config(String),

    /// Another job holds the coordinator.
    #[error("{0}")]
    JobConflict(String),

    /// The job needs a collected dataset first.
    #[error("{0}")]
    EmptyDataset(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("job failed: {0}")]
    JobFailed(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("job coordinator is not running")]
    CoordinatorUnavailable,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
