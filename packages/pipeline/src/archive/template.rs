//! Print-ready HTML wrapper for archived detail pages.

use ftclaw_harvester::{sentinel, LawRecord};

const PRINT_STYLE: &str = r#"
    @page { size: A4; margin: 1.5cm; }
    body {
        font-family: 'Malgun Gothic', 'Nanum Gothic', 'Noto Sans KR', sans-serif;
        padding: 20px;
        line-height: 1.6;
        font-size: 11pt;
        color: #333;
    }
    .header-container {
        text-align: center;
        margin-bottom: 30px;
        border-bottom: 2px solid #2563eb;
        padding-bottom: 20px;
    }
    .law-title-text { font-size: 20pt; font-weight: 800; margin-bottom: 5px; color: #1e3a8a; }
    .law-info-text { font-size: 11pt; color: #666; }
    table { border-collapse: collapse; width: 100%; margin: 10px 0; }
    td, th { border: 1px solid #ccc; padding: 8px; vertical-align: top; }
    img { max-width: 100%; height: auto; }
    script, style, iframe, nav, header, footer, .btn, button { display: none !important; }
    .law_link, .lawnum_btn, .law_btn, .btn_area, .btn_wrap { display: none !important; }
"#;

/// Second title line: the effective fragment, or a bracketed effective date.
pub fn meta_line(record: &LawRecord) -> String {
    let raw = record.effective_revision_raw.trim();
    if raw.starts_with('[') {
        return raw.to_string();
    }
    let date = record.effective_date.trim();
    let date = if date.is_empty() || is_unresolved(date) { "-" } else { date };
    format!("[시행 {date}]")
}

fn is_unresolved(value: &str) -> bool {
    [
        sentinel::PENDING,
        sentinel::NO_LINK,
        sentinel::NOT_FOUND,
        sentinel::ERROR,
        sentinel::AUTH_FAILED,
        sentinel::API_ERROR,
    ]
    .contains(&value)
}

/// Wrap extracted content in the print stylesheet and a title block.
pub fn print_document(record: &LawRecord, content: &str) -> String {
    let title = escape(record.title.trim());
    let meta = escape(&meta_line(record));

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>{title} {meta}</title>
<style>{PRINT_STYLE}</style>
</head>
<body>
<div class="header-container">
    <div class="law-title-text">{title}</div>
    <div class="law-info-text">{meta}</div>
</div>
<div class="content-body">
{content}
</div>
</body>
</html>
"#
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
