//! Listing fetcher for the FTC committee-jurisdiction law pages.
//!
//! Each category page holds one table of instruments. The kind column
//! usually spans several rows, so rows are rebuilt with [`SpanGrid`]
//! before records are emitted.

use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::{listing_url, Category, DEFAULT_LISTING_DELAY, FTC_BASE_URL};
use crate::error::Result;
use crate::http::{create_client, download_text};
use crate::rowspan::SpanGrid;
use crate::types::LawRecord;

#[allow(clippy::expect_used)] // Static selectors that are guaranteed to be valid
mod selectors {
    use super::{LazyLock, Selector};

    fn parse(s: &str) -> Selector {
        Selector::parse(s).expect("valid selector")
    }

    pub static CATEGORY_HEADING: LazyLock<Selector> =
        LazyLock::new(|| parse("#colgroup > header > h2"));
    pub static ANY_HEADING: LazyLock<Selector> = LazyLock::new(|| parse("h2"));
    pub static WRAPPED_TABLE: LazyLock<Selector> = LazyLock::new(|| parse("div.tbl-wrap table"));
    pub static ANY_TABLE: LazyLock<Selector> = LazyLock::new(|| parse("table"));
    pub static BODY_ROWS: LazyLock<Selector> = LazyLock::new(|| parse("tbody tr"));
    pub static ROWS: LazyLock<Selector> = LazyLock::new(|| parse("tr"));
    pub static DATA_CELL: LazyLock<Selector> = LazyLock::new(|| parse("td"));
    pub static ANCHOR: LazyLock<Selector> = LazyLock::new(|| parse("a"));
}

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static QUOTED_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]([^'"]+)['"]"#).expect("valid regex"));

/// Source of listing records for one category.
///
/// Fetch failures are soft: they are logged and produce an empty list.
pub trait ListingSource: Send {
    fn fetch_category(&self, category: Category) -> Vec<LawRecord>;
}

/// Listing source backed by the live FTC website.
pub struct FtcListing {
    client: Client,
    base_url: String,
    delay: Duration,
}

impl FtcListing {
    /// Create a listing source for the public site.
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            base_url: FTC_BASE_URL.to_string(),
            delay: DEFAULT_LISTING_DELAY,
        })
    }

    /// Point the source at another host, e.g. a mock server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Pause before each listing request.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl ListingSource for FtcListing {
    fn fetch_category(&self, category: Category) -> Vec<LawRecord> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let url = listing_url(&self.base_url, category);
        tracing::debug!(category = %category, url = %url, "fetching listing");

        match download_text(&self.client, &url) {
            Ok(html) => {
                let records = parse_listing(&html, &self.base_url);
                tracing::info!(category = %category, records = records.len(), "listing parsed");
                records
            }
            Err(e) => {
                tracing::warn!(category = %category, error = %e, "listing fetch failed");
                Vec::new()
            }
        }
    }
}

/// Parse one listing page into records.
///
/// Returns an empty list when the page has no table.
#[must_use]
pub fn parse_listing(html: &str, base_url: &str) -> Vec<LawRecord> {
    let document = Html::parse_document(html);

    let category_name = document
        .select(&selectors::CATEGORY_HEADING)
        .next()
        .or_else(|| document.select(&selectors::ANY_HEADING).next())
        .map(cell_text)
        .unwrap_or_default();

    let Some(table) = document
        .select(&selectors::WRAPPED_TABLE)
        .next()
        .or_else(|| document.select(&selectors::ANY_TABLE).next())
    else {
        tracing::debug!("no table on listing page");
        return Vec::new();
    };

    let mut rows: Vec<ElementRef<'_>> = table.select(&selectors::BODY_ROWS).collect();
    if rows.is_empty() {
        rows = table.select(&selectors::ROWS).collect();
    }

    let mut grid: SpanGrid<ElementRef<'_>, 3> = SpanGrid::new();
    let mut records = Vec::new();

    for row in rows
        .into_iter()
        .filter(|r| r.select(&selectors::DATA_CELL).next().is_some())
    {
        let cells: Vec<ElementRef<'_>> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| matches!(c.value().name(), "td" | "th"))
            .collect();

        let [kind, title, department] = grid.next_row(&cells);

        let link = title
            .and_then(|cell| cell.select(&selectors::ANCHOR).next())
            .and_then(|a| resolve_link(a, base_url));

        records.push(LawRecord::listed(
            category_name.clone(),
            kind.map(cell_text).unwrap_or_default(),
            title.map(cell_text).unwrap_or_default(),
            department.map(cell_text).unwrap_or_default(),
            link,
        ));
    }

    records
}

/// Text of an element with each text node trimmed and joined.
fn cell_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("")
}

/// Resolve the detail link of an anchor to an absolute http(s) URL.
fn resolve_link(anchor: ElementRef<'_>, base_url: &str) -> Option<String> {
    let href = anchor.value().attr("href").unwrap_or("").trim();

    let candidate = if href.starts_with('/') {
        format!("{base_url}{href}")
    } else if href.contains("javascript:") {
        let onclick = anchor.value().attr("onclick").unwrap_or("");
        let literal = QUOTED_LITERAL
            .captures(onclick)
            .or_else(|| QUOTED_LITERAL.captures(href))
            .and_then(|c| c.get(1))?;
        let base = Url::parse(base_url).ok()?;
        base.join(literal.as_str()).ok()?.to_string()
    } else if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{base_url}/{href}")
    };

    match Url::parse(&candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(candidate),
        _ => {
            tracing::debug!(href, "unusable detail link");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sentinel;
    use pretty_assertions::assert_eq;

    const BASE: &str = "https://www.ftc.go.kr";

    fn page(rows: &str) -> String {
        format!(
            r#"<html><body>
            <section id="colgroup"><header><h2>공정거래법</h2></header></section>
            <div class="tbl-wrap"><table>
              <thead><tr><th>구분</th><th>법령명</th><th>담당부서</th></tr></thead>
              <tbody>{rows}</tbody>
            </table></div>
            </body></html>"#
        )
    }

    #[test]
    fn test_rowspan_kind_shared_by_three_rows() {
        let html = page(
            r#"<tr><th rowspan="3">법률</th><td><a href="/law/1">법 A</a></td><td>과1</td></tr>
               <tr><td><a href="/law/2">법 B</a></td><td>과2</td></tr>
               <tr><td><a href="/law/3">법 C</a></td><td>과3</td></tr>
               <tr><th>고시</th><td><a href="/law/4">고시 D</a></td><td>과4</td></tr>"#,
        );
        let records = parse_listing(&html, BASE);
        let kinds: Vec<&str> = records.iter().map(|r| r.kind.as_str()).collect();
        assert_eq!(kinds, vec!["법률", "법률", "법률", "고시"]);
        assert_eq!(records[2].title, "법 C");
        assert_eq!(records[2].department, "과3");
        assert_eq!(records[0].category, "공정거래법");
    }

    #[test]
    fn test_without_rowspans_matches_direct_cell_reading() {
        let html = page(
            r#"<tr><td>법률</td><td><a href="/law/1">법 A</a></td><td>경쟁정책과</td></tr>
               <tr><td>시행령</td><td><a href="/law/2">법 A 시행령</a></td><td>경쟁정책과</td></tr>
               <tr><td>고시</td><td><a href="/law/3">심사기준</a></td><td>기업결합과</td></tr>
               <tr><td>지침</td><td>링크 없는 지침</td><td>시장감시총괄과</td></tr>"#,
        );
        let records = parse_listing(&html, BASE);

        let document = Html::parse_document(&html);
        let rows = Selector::parse("tbody > tr").unwrap();
        let cells = Selector::parse("td").unwrap();
        let expected: Vec<(String, String, String, String)> = document
            .select(&rows)
            .map(|row| {
                let tds: Vec<ElementRef<'_>> = row.select(&cells).collect();
                let link = tds[1]
                    .select(&selectors::ANCHOR)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(|href| format!("{BASE}{href}"))
                    .unwrap_or_else(|| sentinel::NO_LINK.to_string());
                (cell_text(tds[0]), cell_text(tds[1]), cell_text(tds[2]), link)
            })
            .collect();

        let actual: Vec<(String, String, String, String)> = records
            .iter()
            .map(|r| {
                (
                    r.kind.clone(),
                    r.title.clone(),
                    r.department.clone(),
                    r.detail_link.clone(),
                )
            })
            .collect();
        assert_eq!(expected.len(), 4);
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_header_rows_without_td_are_skipped() {
        let html = r#"<html><body><h2>기타</h2><table>
            <tr><th>구분</th><th>법령명</th><th>담당부서</th></tr>
            <tr><td>법률</td><td><a href="/x">X</a></td><td>과</td></tr>
            </table></body></html>"#;
        let records = parse_listing(html, BASE);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, "기타");
        assert_eq!(records[0].detail_link, "https://www.ftc.go.kr/x");
    }

    #[test]
    fn test_javascript_link_uses_onclick_literal() {
        let html = page(
            r#"<tr><td>고시</td><td><a href="javascript:void(0);" onclick="openPopup('/www/popup.do?id=7')">고시 A</a></td><td>과</td></tr>"#,
        );
        let records = parse_listing(&html, BASE);
        assert_eq!(records[0].detail_link, "https://www.ftc.go.kr/www/popup.do?id=7");
        assert_eq!(records[0].effective_date, sentinel::PENDING);
    }

    #[test]
    fn test_absolute_and_relative_links() {
        let html = page(
            r#"<tr><td>법률</td><td><a href="https://www.law.go.kr/법령/x">A</a></td><td>과</td></tr>
               <tr><td>법률</td><td><a href="www/y.do">B</a></td><td>과</td></tr>"#,
        );
        let records = parse_listing(&html, BASE);
        assert_eq!(records[0].detail_link, "https://www.law.go.kr/법령/x");
        assert_eq!(records[1].detail_link, "https://www.ftc.go.kr/www/y.do");
    }

    #[test]
    fn test_missing_link_gets_na_presets() {
        let html = page(r#"<tr><td>지침</td><td>링크 없음</td><td>과</td></tr>"#);
        let records = parse_listing(&html, BASE);
        assert_eq!(records[0].detail_link, sentinel::NO_LINK);
        assert_eq!(records[0].effective_date, sentinel::NO_LINK);
        assert_eq!(records[0].revision_type, sentinel::DASH);
    }

    #[test]
    fn test_javascript_link_without_literal_is_na() {
        let html = page(
            r#"<tr><td>지침</td><td><a href="javascript:void(0);">A</a></td><td>과</td></tr>"#,
        );
        let records = parse_listing(&html, BASE);
        assert_eq!(records[0].detail_link, sentinel::NO_LINK);
    }

    #[test]
    fn test_page_without_table() {
        assert!(parse_listing("<html><body><h2>x</h2></body></html>", BASE).is_empty());
    }
}
