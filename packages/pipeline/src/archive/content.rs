//! Printable content extraction from detail pages.
//!
//! The statute body lives in the `lawService` frame. Its markup is stripped
//! of navigation chrome and icon images, and relative image sources are
//! rewritten so the print renderer can load them outside the site.

use std::sync::LazyLock;

use ftclaw_harvester::config::{DETAIL_FRAME_ID, LAW_GO_KR_BASE_URL};
use ftclaw_harvester::{BrowserSession, Result};
use regex::{Captures, Regex};
use scraper::{Html, Selector};

/// Frame content shorter than this is treated as missing.
pub const MIN_FRAME_CONTENT: usize = 500;

/// Text length a top-level container needs before it is preferred over the body.
pub const MIN_TOP_LEVEL_TEXT: usize = 300;

const REMOVED_SELECTORS: &[&str] = &[
    r#"img[alt*="조문체계도"]"#,
    r#"img[alt*="연혁"]"#,
    r#"img[alt*="관련규제"]"#,
    r#"img[alt*="버튼"]"#,
    r#"a[href*="lsStmdInfoP"]"#,
    r#"a[href*="lsHstryInfoP"]"#,
    r#"a[href*="lsLnkInfoP"]"#,
    ".lawnum_btn",
    ".law_btn",
    ".btn_area",
    ".btn_wrap",
    "ul.law_link",
    r#"[class*="tooltip"]"#,
    r#"[class*="popup"]"#,
    "script",
    "style",
];

const FRAME_CONTAINERS: &[&str] = &["#conScroll", "#contentBody", ".lawcon", "article", ".content"];

const TOP_LEVEL_CONTAINERS: &[&str] = &[
    "#conScroll",
    "#contentBody",
    ".lawcon",
    "#lawService",
    "article",
];

#[allow(clippy::expect_used)] // Static regex/selectors that are guaranteed to be valid
mod patterns {
    use super::*;

    pub static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?i)(<img\b[^>]*?\bsrc\s*=\s*)(["'])([^"']*)(["'])"#).expect("valid regex")
    });

    pub static BODY: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("body").expect("valid selector"));

    pub static REMOVED: LazyLock<Vec<Selector>> = LazyLock::new(|| parse_all(REMOVED_SELECTORS));
    pub static FRAME: LazyLock<Vec<Selector>> = LazyLock::new(|| parse_all(FRAME_CONTAINERS));
    pub static TOP_LEVEL: LazyLock<Vec<Selector>> =
        LazyLock::new(|| parse_all(TOP_LEVEL_CONTAINERS));

    fn parse_all(selectors: &[&str]) -> Vec<Selector> {
        selectors
            .iter()
            .map(|s| Selector::parse(s).expect("valid selector"))
            .collect()
    }
}

/// Render `url` and return the markup worth printing.
///
/// `Ok(None)` means nothing usable was found and the page itself should be
/// printed. Errors come from rendering the top-level page only; a frame that
/// fails to load falls back to the top-level document.
pub fn extract_printable(session: &BrowserSession, url: &str) -> Result<Option<String>> {
    let mut page = session.open(url)?;

    let from_frame = match page.enter_frame(DETAIL_FRAME_ID, session.frame_wait()) {
        Ok(Some(frame)) => frame_content(frame.html()),
        Ok(None) => None,
        Err(e) => {
            tracing::debug!(url, error = %e, "detail frame could not be loaded");
            None
        }
    };

    match from_frame {
        Some(content) if content.chars().count() >= MIN_FRAME_CONTENT => Ok(Some(content)),
        _ => Ok(top_level_content(page.html())),
    }
}

/// Cleaned inner markup of the frame's statute container, or its body.
pub fn frame_content(html: &str) -> Option<String> {
    let mut document = Html::parse_document(html);
    strip_chrome(&mut document);

    let container = patterns::FRAME.iter().find_map(|selector| {
        document
            .select(selector)
            .next()
            .map(|el| el.inner_html())
            .filter(|inner| inner.chars().count() > MIN_FRAME_CONTENT)
    });

    let content = container.or_else(|| {
        document
            .select(&patterns::BODY)
            .next()
            .map(|body| body.inner_html())
    })?;

    let content = absolutize_images(&content, LAW_GO_KR_BASE_URL);
    (!content.trim().is_empty()).then_some(content)
}

/// Outer markup of the first top-level container with enough text, or the body.
pub fn top_level_content(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let container = patterns::TOP_LEVEL.iter().find_map(|selector| {
        document
            .select(selector)
            .next()
            .filter(|el| el.text().map(|t| t.chars().count()).sum::<usize>() > MIN_TOP_LEVEL_TEXT)
            .map(|el| el.html())
    });

    container
        .or_else(|| document.select(&patterns::BODY).next().map(|body| body.html()))
        .filter(|content| !content.trim().is_empty())
}

/// Detach every element matching the chrome selectors.
fn strip_chrome(document: &mut Html) {
    let doomed: Vec<_> = patterns::REMOVED
        .iter()
        .flat_map(|selector| document.select(selector).map(|el| el.id()).collect::<Vec<_>>())
        .collect();

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Prefix relative image sources with `base`.
pub fn absolutize_images(html: &str, base: &str) -> String {
    let base = base.trim_end_matches('/');
    patterns::IMG_SRC
        .replace_all(html, |caps: &Captures<'_>| {
            let src = &caps[3];
            if src.is_empty() || src.starts_with("http") || src.starts_with("data:") || src.starts_with("//") {
                return caps[0].to_string();
            }
            let absolute = if src.starts_with('/') {
                format!("{base}{src}")
            } else {
                format!("{base}/{src}")
            };
            format!("{}{}{}{}", &caps[1], &caps[2], absolute, &caps[4])
        })
        .into_owned()
}
