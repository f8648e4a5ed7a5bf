use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ftclaw_harvester::config::{DEFAULT_LISTING_DELAY, DEFAULT_SETTLE_DELAY, FTC_BASE_URL};

use crate::error::{PipelineError, Result};

/// Pause after each enriched record.
pub const DEFAULT_ENRICH_PAUSE: Duration = Duration::from_millis(500);

/// Pause after each archived record.
pub const DEFAULT_ARCHIVE_PAUSE: Duration = Duration::from_millis(300);

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_BROWSERLESS_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub output_dir: PathBuf,
    pub static_dir: PathBuf,
    pub ftc_base_url: String,
    pub browserless_url: String,
    pub browserless_token: Option<String>,
    /// Open API credential; `None` selects the browser strategy.
    pub api_credential: Option<String>,
    pub listing_delay: Duration,
    pub settle_delay: Duration,
    pub enrich_pause: Duration,
    pub archive_pause: Duration,
    /// Honour `target_dir` in PDF save requests. Requested directories must
    /// still lie inside `output_dir`.
    pub allow_pdf_target_dir: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let raw_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .parse()
            .map_err(|e| PipelineError::Config(format!("invalid BIND_ADDR '{raw_addr}': {e}")))?;

        let output_dir = std::env::var("OUTPUT_DIR")
            .unwrap_or_else(|_| "./output".into())
            .into();

        let static_dir = std::env::var("STATIC_DIR")
            .unwrap_or_else(|_| "static".into())
            .into();

        let ftc_base_url =
            std::env::var("FTC_BASE_URL").unwrap_or_else(|_| FTC_BASE_URL.to_string());

        let browserless_url = std::env::var("BROWSERLESS_URL")
            .unwrap_or_else(|_| DEFAULT_BROWSERLESS_URL.to_string());

        let browserless_token = env_secret("BROWSERLESS_TOKEN");

        let api_credential = env_secret("LAW_OPEN_API_OC")
            .or_else(|| env_secret("DATA_GO_KR_SERVICE_KEY"))
            .or_else(|| env_secret("LAW_API_KEY"));

        match api_credential {
            Some(_) => tracing::info!("open API credential found, using structured API enrichment"),
            None => tracing::info!(
                "no usable open API credential (LAW_OPEN_API_OC, DATA_GO_KR_SERVICE_KEY, LAW_API_KEY), \
                 using browser enrichment"
            ),
        }

        Ok(Self {
            bind_addr,
            output_dir,
            static_dir,
            ftc_base_url,
            browserless_url,
            browserless_token,
            api_credential,
            listing_delay: env_millis("LISTING_DELAY_MS").unwrap_or(DEFAULT_LISTING_DELAY),
            settle_delay: env_millis("SETTLE_DELAY_MS").unwrap_or(DEFAULT_SETTLE_DELAY),
            enrich_pause: env_millis("ENRICH_PAUSE_MS").unwrap_or(DEFAULT_ENRICH_PAUSE),
            archive_pause: env_millis("ARCHIVE_PAUSE_MS").unwrap_or(DEFAULT_ARCHIVE_PAUSE),
            allow_pdf_target_dir: env_flag("PDF_TARGET_DIR_ENABLED"),
        })
    }

    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            output_dir: output_dir.into(),
            static_dir: "static".into(),
            ftc_base_url: FTC_BASE_URL.to_string(),
            browserless_url: DEFAULT_BROWSERLESS_URL.to_string(),
            browserless_token: None,
            api_credential: None,
            listing_delay: DEFAULT_LISTING_DELAY,
            settle_delay: DEFAULT_SETTLE_DELAY,
            enrich_pause: DEFAULT_ENRICH_PAUSE,
            archive_pause: DEFAULT_ARCHIVE_PAUSE,
            allow_pdf_target_dir: false,
        }
    }

    pub fn with_api_credential(mut self, credential: impl Into<String>) -> Self {
        let credential = credential.into();
        self.api_credential = (!is_placeholder(&credential)).then(|| credential.trim().to_string());
        self
    }

    pub fn with_browserless(mut self, url: impl Into<String>, token: Option<String>) -> Self {
        self.browserless_url = url.into();
        self.browserless_token = token;
        self
    }

    pub fn with_pdf_target_dir(mut self, allow: bool) -> Self {
        self.allow_pdf_target_dir = allow;
        self
    }

    /// Zero every politeness delay and pause, for tests.
    pub fn without_delays(mut self) -> Self {
        self.listing_delay = Duration::ZERO;
        self.settle_delay = Duration::ZERO;
        self.enrich_pause = Duration::ZERO;
        self.archive_pause = Duration::ZERO;
        self
    }
}

/// Whether a configured secret is blank or an obvious placeholder.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return true;
    }
    let lower = value.to_lowercase();
    lower.starts_with("your_")
        || lower.starts_with("your-")
        || lower == "changeme"
        || lower.starts_with("xxx")
        || (value.starts_with('<') && value.ends_with('>'))
}

fn env_secret(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !is_placeholder(v))
        .map(|v| v.trim().to_string())
}

fn env_millis(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
