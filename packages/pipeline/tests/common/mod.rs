#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use ftclaw_harvester::enrich::{EnrichOutcome, Enricher};
use ftclaw_harvester::{
    BrowserSession, Category, EffectiveInfo, HarvesterError, LawRecord, ListingSource, PdfSource,
    RenderService,
};

use ftclaw_pipeline::config::ServerConfig;
use ftclaw_pipeline::coordinator::{spawn_coordinator, CoordinatorHandle};
use ftclaw_pipeline::error::{PipelineError, Result};
use ftclaw_pipeline::models::{ScrapeTarget, StatusSnapshot};
use ftclaw_pipeline::services::JobServices;

pub const FRAGMENT: &str = "[시행 2025. 1. 1.] [법률 제20101호, 2024. 1. 21., 일부개정]";

/// Blocks job threads until the test opens it.
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cond.notify_all();
    }

    pub fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cond.wait(open).unwrap();
        }
    }
}

/// What the fake enricher does for one title.
#[derive(Clone)]
pub enum Behaviour {
    Found(&'static str),
    Missing,
    Fail,
    Panic,
}

#[derive(Default)]
pub struct FakeServices {
    pub listings: HashMap<u8, Vec<LawRecord>>,
    pub behaviours: HashMap<String, Behaviour>,
    pub pages: HashMap<String, String>,
    pub gate: Option<Arc<Gate>>,
    pub browser_unavailable: bool,
    pub enrich_calls: Arc<AtomicUsize>,
}

impl FakeServices {
    pub fn with_listing(mut self, code: u8, records: Vec<LawRecord>) -> Self {
        self.listings.insert(code, records);
        self
    }

    pub fn with_behaviour(mut self, title: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(title.to_string(), behaviour);
        self
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }
}

impl JobServices for FakeServices {
    fn listing(&self) -> Result<Box<dyn ListingSource>> {
        Ok(Box::new(FakeListing {
            listings: self.listings.clone(),
            gate: self.gate.clone(),
        }))
    }

    fn enricher(&self) -> Result<Box<dyn Enricher>> {
        Ok(Box::new(FakeEnricher {
            behaviours: self.behaviours.clone(),
            calls: Arc::clone(&self.enrich_calls),
        }))
    }

    fn browser(&self) -> Result<BrowserSession> {
        if self.browser_unavailable {
            return Err(PipelineError::Harvester(HarvesterError::Render {
                status: 503,
                message: "browser service unavailable".to_string(),
            }));
        }
        Ok(BrowserSession::new(Box::new(FakeRenderer {
            pages: self.pages.clone(),
        }))
        .with_settle(Duration::ZERO)
        .with_waits(Duration::ZERO, Duration::ZERO))
    }
}

pub struct FakeListing {
    listings: HashMap<u8, Vec<LawRecord>>,
    gate: Option<Arc<Gate>>,
}

impl ListingSource for FakeListing {
    fn fetch_category(&self, category: Category) -> Vec<LawRecord> {
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        self.listings.get(&category.code()).cloned().unwrap_or_default()
    }
}

pub struct FakeEnricher {
    behaviours: HashMap<String, Behaviour>,
    calls: Arc<AtomicUsize>,
}

impl Enricher for FakeEnricher {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn enrich(&self, record: &LawRecord) -> EnrichOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviours.get(&record.title).cloned().unwrap_or(Behaviour::Missing) {
            Behaviour::Found(fragment) => EnrichOutcome::Enriched(EffectiveInfo::parse(fragment)),
            Behaviour::Missing => EnrichOutcome::NotFound,
            Behaviour::Fail => EnrichOutcome::error("navigation timeout"),
            Behaviour::Panic => panic!("enricher crashed"),
        }
    }
}

pub struct FakeRenderer {
    pages: HashMap<String, String>,
}

impl RenderService for FakeRenderer {
    fn render(&self, url: &str, _settle: Duration) -> ftclaw_harvester::Result<String> {
        self.pages.get(url).cloned().ok_or(HarvesterError::Render {
            status: 502,
            message: format!("navigation failed for {url}"),
        })
    }

    fn print_pdf(&self, source: PdfSource<'_>) -> ftclaw_harvester::Result<Vec<u8>> {
        let marker = match source {
            PdfSource::Html(_) => "html",
            PdfSource::Url(_) => "url",
        };
        Ok(format!("%PDF-1.4 {marker}").into_bytes())
    }
}

pub fn linked(category: &str, title: &str, link: &str) -> LawRecord {
    LawRecord::listed(category, "법률", title, "경쟁정책과", Some(link.to_string()))
}

pub fn unlinked(category: &str, title: &str) -> LawRecord {
    LawRecord::listed(category, "고시", title, "기업결합과", None)
}

pub fn config(output_dir: &std::path::Path) -> ServerConfig {
    ServerConfig::new(output_dir).without_delays()
}

pub fn start(output_dir: &std::path::Path, services: FakeServices) -> CoordinatorHandle {
    spawn_coordinator(config(output_dir), Arc::new(services))
}

/// Poll until the coordinator is idle again.
pub async fn wait_idle(handle: &CoordinatorHandle) -> StatusSnapshot {
    for _ in 0..500 {
        let status = handle.status().await.unwrap();
        if !status.is_running {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("coordinator did not return to idle");
}

/// Run a listing job to completion.
pub async fn collect(handle: &CoordinatorHandle, target: &str) -> StatusSnapshot {
    handle
        .start_scrape(ScrapeTarget::parse(target).unwrap())
        .await
        .unwrap();
    wait_idle(handle).await
}
