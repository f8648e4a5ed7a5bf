//! Ordered extraction strategies for the effective-date fragment.
//!
//! Law pages and administrative-rule pages put the fragment in different
//! places, and some pages only render it as loose text. A [`Cascade`] tries
//! each strategy in turn; the first non-empty result wins. Strategies never
//! abort the cascade: failures are logged and treated as "not found".

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{BrowserSession, DocumentView};
use crate::config::DETAIL_FRAME_ID;
use crate::error::{HarvesterError, Result};

/// Marker that opens the effective-date bracket.
pub const EFFECTIVE_MARKER: &str = "[시행";

/// Selectors tried inside the detail frame, in order.
pub const FRAME_SELECTORS: [&str; 4] = ["span.tx2", "div.subtit1", "div.subtit2", "p.subtit1"];

/// Selectors tried against the top-level document, in order.
pub const TOP_LEVEL_SELECTORS: [&str; 3] = ["span.tx2", "div.subtit1", "div.subtit2"];

/// Maximum length of a text node the free-text scan accepts.
const FREE_TEXT_MAX_LEN: usize = 200;

/// Characters of context kept on each side of a date match.
const DATE_CONTEXT_CHARS: usize = 50;

const DATE_KEYWORDS: [&str; 3] = ["시행", "고시", "공고"];

#[allow(clippy::expect_used)] // Static regexes that are guaranteed to be valid
static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d{4}\s*\.\s*\d{1,2}\s*\.\s*\d{1,2}",
        r"\d{4}-\d{1,2}-\d{1,2}",
        r"\d{4}\.\s*\d{1,2}\.\s*\d{1,2}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// One way of finding the fragment in a document.
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Return the fragment, or `None` when this strategy finds nothing.
    fn try_extract(&self, view: &mut DocumentView<'_>) -> Option<String>;
}

/// Accept the first element matching a CSS selector if its text carries
/// [`EFFECTIVE_MARKER`].
pub struct SelectorStrategy {
    source: String,
    selector: Selector,
    wait: Duration,
}

impl SelectorStrategy {
    pub fn new(selector: &str) -> Result<Self> {
        let parsed = Selector::parse(selector)
            .map_err(|_| HarvesterError::InvalidSelector(selector.to_string()))?;
        Ok(Self {
            source: selector.to_string(),
            selector: parsed,
            wait: Duration::ZERO,
        })
    }

    /// Wait up to `wait` for the element to appear.
    #[must_use]
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }
}

impl ExtractionStrategy for SelectorStrategy {
    fn name(&self) -> &str {
        &self.source
    }

    fn try_extract(&self, view: &mut DocumentView<'_>) -> Option<String> {
        if !self.wait.is_zero() {
            if let Err(e) = view.wait_for(&self.selector, self.wait) {
                tracing::debug!(selector = %self.source, error = %e, "selector wait ended");
            }
        }
        let document = view.document();
        let text = document.select(&self.selector).next().map(element_text)?;
        if !text.contains(EFFECTIVE_MARKER) {
            return None;
        }
        Some(text)
    }
}

/// Which elements a [`MarkerScanStrategy`] may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerScope {
    /// Text has the marker and a closing bracket; at most one child element.
    Frame,
    /// Text has the marker; no child elements, or a single `<br>`.
    TopLevel,
}

/// Scan every element in document order for the marker.
pub struct MarkerScanStrategy {
    scope: MarkerScope,
}

impl MarkerScanStrategy {
    #[must_use]
    pub fn new(scope: MarkerScope) -> Self {
        Self { scope }
    }

    fn accepts(&self, element: ElementRef<'_>, text: &str) -> bool {
        if !text.contains(EFFECTIVE_MARKER) {
            return false;
        }
        let children: Vec<ElementRef<'_>> = element.children().filter_map(ElementRef::wrap).collect();
        match self.scope {
            MarkerScope::Frame => text.contains(']') && children.len() <= 1,
            MarkerScope::TopLevel => match children.as_slice() {
                [] => true,
                [only] => only.value().name() == "br",
                _ => false,
            },
        }
    }
}

impl ExtractionStrategy for MarkerScanStrategy {
    fn name(&self) -> &str {
        match self.scope {
            MarkerScope::Frame => "marker-scan",
            MarkerScope::TopLevel => "marker-scan-strict",
        }
    }

    fn try_extract(&self, view: &mut DocumentView<'_>) -> Option<String> {
        let document = view.document();
        let found = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| !is_hidden_container(e.value().name()))
            .find_map(|element| {
                let text = element_text(element);
                self.accepts(element, &text).then_some(text)
            });
        found
    }
}

/// Loose text search for pages without the bracketed fragment.
///
/// First looks for a short text node mentioning `시행` with a digit in it,
/// then for a date whose surrounding text mentions an effective or notice
/// keyword and returns the line containing it.
pub struct FreeTextStrategy;

impl ExtractionStrategy for FreeTextStrategy {
    fn name(&self) -> &str {
        "free-text"
    }

    fn try_extract(&self, view: &mut DocumentView<'_>) -> Option<String> {
        let document = view.document();
        let nodes = visible_text_nodes(&document);

        let short = nodes.iter().map(|t| t.trim()).find(|t| {
            t.contains("시행")
                && t.chars().count() < FREE_TEXT_MAX_LEN
                && t.chars().any(|c| c.is_ascii_digit())
        });
        if let Some(text) = short {
            return Some(text.to_string());
        }

        let all_text: String = nodes.concat();
        find_dated_line(&all_text)
    }
}

/// Return the line around the first date that sits near a keyword.
fn find_dated_line(all_text: &str) -> Option<String> {
    let has_keyword = |s: &str| DATE_KEYWORDS.iter().any(|k| s.contains(k));

    for pattern in DATE_PATTERNS.iter() {
        for m in pattern.find_iter(all_text) {
            let context = char_window(all_text, m.start(), m.end(), DATE_CONTEXT_CHARS);
            if !has_keyword(context) {
                continue;
            }
            if let Some(line) = context
                .split('\n')
                .find(|line| line.contains(m.as_str()) && has_keyword(line))
            {
                return Some(line.trim().to_string());
            }
        }
    }
    None
}

/// Slice `text` to `pad` characters either side of the byte range.
fn char_window(text: &str, start: usize, end: usize, pad: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(pad.saturating_sub(1))
        .map_or(0, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(pad)
        .map_or(text.len(), |(i, _)| end + i);
    &text[from..to]
}

/// Ordered list of strategies.
pub struct Cascade {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Cascade {
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Strategies run inside the detail frame.
    pub fn frame(selector_wait: Duration) -> Result<Self> {
        let mut strategies: Vec<Box<dyn ExtractionStrategy>> = Vec::new();
        for selector in FRAME_SELECTORS {
            strategies.push(Box::new(SelectorStrategy::new(selector)?.with_wait(selector_wait)));
        }
        strategies.push(Box::new(MarkerScanStrategy::new(MarkerScope::Frame)));
        strategies.push(Box::new(FreeTextStrategy));
        Ok(Self::new(strategies))
    }

    /// Strategies run against the top-level document.
    pub fn top_level() -> Result<Self> {
        let mut strategies: Vec<Box<dyn ExtractionStrategy>> = Vec::new();
        for selector in TOP_LEVEL_SELECTORS {
            strategies.push(Box::new(SelectorStrategy::new(selector)?));
        }
        strategies.push(Box::new(MarkerScanStrategy::new(MarkerScope::TopLevel)));
        strategies.push(Box::new(FreeTextStrategy));
        Ok(Self::new(strategies))
    }

    /// Run strategies in order and return the first non-empty result.
    pub fn run(&self, view: &mut DocumentView<'_>) -> Option<String> {
        self.strategies.iter().find_map(|strategy| {
            let found = strategy
                .try_extract(view)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            if found.is_some() {
                tracing::debug!(strategy = strategy.name(), url = view.url(), "fragment located");
            }
            found
        })
    }
}

/// Locate the effective/revision fragment on a detail page.
///
/// Returns an empty string when nothing was found. Errors are only
/// returned when the page itself could not be loaded.
pub fn extract_effective_info(session: &BrowserSession, url: &str) -> Result<String> {
    let url = upgrade_scheme(url);
    let mut page = session.open(&url)?;

    match page.enter_frame(DETAIL_FRAME_ID, session.frame_wait()) {
        Ok(Some(mut frame)) => {
            if let Some(found) = Cascade::frame(session.selector_wait())?.run(&mut frame) {
                return Ok(found);
            }
            tracing::debug!(url = %url, "frame cascade found nothing");
        }
        Ok(None) => tracing::debug!(url = %url, "no detail frame"),
        Err(e) => tracing::debug!(url = %url, error = %e, "could not enter detail frame"),
    }

    Ok(Cascade::top_level()?.run(&mut page).unwrap_or_default())
}

fn upgrade_scheme(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// Element text with whitespace collapsed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_hidden_container(name: &str) -> bool {
    matches!(name, "script" | "style" | "noscript" | "head" | "title")
}

/// Text nodes outside script and style elements, in document order.
fn visible_text_nodes(document: &Html) -> Vec<&str> {
    document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent().and_then(|p| p.value().as_element().map(|e| e.name()));
            match parent {
                Some(name) if is_hidden_container(name) => None,
                _ => Some(&**text),
            }
        })
        .collect()
}
