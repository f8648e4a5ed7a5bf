//! Browser rendering for dynamic detail pages.
//!
//! Detail pages are assembled by script and embed the statute text in an
//! iframe, so they are fetched through a headless browser service rather
//! than plain HTTP. [`RenderService`] is the seam: production code talks to
//! a Browserless instance, tests substitute canned documents.

pub mod cascade;

use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use scraper::{Html, Selector};
use serde_json::json;
use url::Url;

use crate::config::{DEFAULT_SETTLE_DELAY, FRAME_WAIT, NAVIGATION_TIMEOUT_SECS, SELECTOR_WAIT};
use crate::error::{HarvesterError, Result};

pub use cascade::{extract_effective_info, Cascade, ExtractionStrategy};

/// Interval between re-renders while waiting for an element.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Content handed to the PDF printer.
#[derive(Debug, Clone, Copy)]
pub enum PdfSource<'a> {
    /// A complete HTML document.
    Html(&'a str),
    /// A page the printer should navigate to itself.
    Url(&'a str),
}

/// A headless browser able to render pages and print PDFs.
pub trait RenderService: Send {
    /// Navigate to `url`, wait `settle` after load and return the DOM as HTML.
    fn render(&self, url: &str, settle: Duration) -> Result<String>;

    /// Print a document to an A4 PDF with backgrounds.
    fn print_pdf(&self, source: PdfSource<'_>) -> Result<Vec<u8>>;
}

/// Client for the Browserless HTTP API (`/content` and `/pdf`).
pub struct BrowserlessClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(NAVIGATION_TIMEOUT_SECS * 2))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()).map(String::from),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}/{path}", self.base_url);
        let mut url = Url::parse(&raw).map_err(|source| HarvesterError::InvalidUrl {
            url: raw.clone(),
            source,
        })?;
        if let Some(ref token) = self.token {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }

    fn post(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::blocking::Response> {
        let resp = self.client.post(self.endpoint(path)?).json(body).send()?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().unwrap_or_default();
            return Err(HarvesterError::Render {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }
}

impl RenderService for BrowserlessClient {
    fn render(&self, url: &str, settle: Duration) -> Result<String> {
        let body = json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": "networkidle2",
                "timeout": NAVIGATION_TIMEOUT_SECS * 1000,
            },
            "waitForTimeout": u64::try_from(settle.as_millis()).unwrap_or(u64::MAX),
        });
        tracing::debug!(url, "rendering page");
        Ok(self.post("content", &body)?.text()?)
    }

    fn print_pdf(&self, source: PdfSource<'_>) -> Result<Vec<u8>> {
        let options = json!({
            "format": "A4",
            "printBackground": true,
            "margin": { "top": "15mm", "bottom": "15mm", "left": "12mm", "right": "12mm" },
        });
        let body = match source {
            PdfSource::Html(html) => json!({ "html": html, "options": options }),
            PdfSource::Url(url) => json!({
                "url": url,
                "options": options,
                "gotoOptions": { "waitUntil": "networkidle2" },
            }),
        };
        Ok(self.post("pdf", &body)?.bytes()?.to_vec())
    }
}

/// One browser session, reused for every record of a job.
pub struct BrowserSession {
    renderer: Box<dyn RenderService>,
    settle: Duration,
    frame_wait: Duration,
    selector_wait: Duration,
}

impl BrowserSession {
    pub fn new(renderer: Box<dyn RenderService>) -> Self {
        Self {
            renderer,
            settle: DEFAULT_SETTLE_DELAY,
            frame_wait: FRAME_WAIT,
            selector_wait: SELECTOR_WAIT,
        }
    }

    /// Time the renderer waits after load before capturing the DOM.
    #[must_use]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Upper bounds for the frame wait and for each selector wait.
    #[must_use]
    pub fn with_waits(mut self, frame_wait: Duration, selector_wait: Duration) -> Self {
        self.frame_wait = frame_wait;
        self.selector_wait = selector_wait;
        self
    }

    #[must_use]
    pub fn frame_wait(&self) -> Duration {
        self.frame_wait
    }

    #[must_use]
    pub fn selector_wait(&self) -> Duration {
        self.selector_wait
    }

    pub fn renderer(&self) -> &dyn RenderService {
        self.renderer.as_ref()
    }

    /// Navigate to a page.
    pub fn open(&self, url: &str) -> Result<DocumentView<'_>> {
        let html = self.renderer.render(url, self.settle)?;
        Ok(DocumentView {
            session: self,
            url: url.to_string(),
            html,
        })
    }
}

/// A rendered document that can be re-rendered while waiting for content.
pub struct DocumentView<'s> {
    session: &'s BrowserSession,
    url: String,
    html: String,
}

impl<'s> DocumentView<'s> {
    /// Wrap already-rendered markup.
    pub fn new(session: &'s BrowserSession, url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            session,
            url: url.into(),
            html: html.into(),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Parse the current markup.
    #[must_use]
    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }

    /// Render the page again to pick up late content.
    pub fn refresh(&mut self) -> Result<()> {
        self.html = self.session.renderer.render(&self.url, self.session.settle)?;
        Ok(())
    }

    /// Wait until `selector` matches, re-rendering until `timeout` expires.
    ///
    /// Re-renders are spaced by the larger of the poll interval and the
    /// session's settle delay. A zero timeout checks the current markup once.
    pub fn wait_for(&mut self, selector: &Selector, timeout: Duration) -> Result<()> {
        let interval = POLL_INTERVAL.max(self.session.settle);
        let deadline = Instant::now() + timeout;
        loop {
            if self.document().select(selector).next().is_some() {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(HarvesterError::WaitTimeout(format!("{selector:?}")));
            }
            thread::sleep(interval.min(deadline - now));
            self.refresh()?;
        }
    }

    /// Switch into the iframe with the given id.
    ///
    /// Returns `Ok(None)` when the frame never appears within `timeout`.
    pub fn enter_frame(&mut self, frame_id: &str, timeout: Duration) -> Result<Option<DocumentView<'s>>> {
        let selector = Selector::parse(&format!("iframe#{frame_id}"))
            .map_err(|_| HarvesterError::InvalidSelector(format!("iframe#{frame_id}")))?;

        if self.wait_for(&selector, timeout).is_err() {
            return Ok(None);
        }

        let src = self
            .document()
            .select(&selector)
            .next()
            .and_then(|frame| frame.value().attr("src").map(str::to_string));
        let Some(src) = src.filter(|s| !s.trim().is_empty()) else {
            tracing::debug!(url = %self.url, "frame has no src");
            return Ok(None);
        };

        let frame_url = resolve(&self.url, &src)?;
        let html = self.session.renderer.render(&frame_url, self.session.settle)?;
        Ok(Some(DocumentView {
            session: self.session,
            url: frame_url,
            html,
        }))
    }
}

/// Resolve a possibly relative reference against a page URL.
pub fn resolve(base: &str, reference: &str) -> Result<String> {
    let base_url = Url::parse(base).map_err(|source| HarvesterError::InvalidUrl {
        url: base.to_string(),
        source,
    })?;
    let joined = base_url
        .join(reference.trim())
        .map_err(|source| HarvesterError::InvalidUrl {
            url: reference.to_string(),
            source,
        })?;
    Ok(joined.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Renderer that serves canned pages keyed by URL.
    #[derive(Default, Clone)]
    pub struct StaticRenderer {
        pages: HashMap<String, String>,
        pub renders: Arc<AtomicUsize>,
    }

    impl StaticRenderer {
        pub fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }
    }

    impl RenderService for StaticRenderer {
        fn render(&self, url: &str, _settle: Duration) -> Result<String> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            self.pages.get(url).cloned().ok_or(HarvesterError::Render {
                status: 404,
                message: format!("no page for {url}"),
            })
        }

        fn print_pdf(&self, _source: PdfSource<'_>) -> Result<Vec<u8>> {
            Ok(b"%PDF-1.4".to_vec())
        }
    }

    pub fn session(renderer: StaticRenderer) -> BrowserSession {
        BrowserSession::new(Box::new(renderer))
            .with_settle(Duration::ZERO)
            .with_waits(Duration::ZERO, Duration::ZERO)
    }
}
