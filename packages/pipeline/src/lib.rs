pub mod api;
pub mod archive;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod export;
pub mod models;
pub mod services;
pub mod worker;

pub use api::{router, AppState};
pub use config::ServerConfig;
pub use coordinator::{spawn_coordinator, CoordinatorHandle};
pub use error::PipelineError;
pub use models::{ArchiveStatus, Phase, ScrapeTarget, StatusSnapshot};
pub use services::{JobServices, LiveServices};
