//! Parsing of the bracketed effective/revision fragment.
//!
//! Detail pages announce their dates as
//! `[시행 2025. 1. 1.] [법률 제20101호, 2024. 1. 21., 일부개정]`: the first
//! bracket carries the effective date, the second the revision number,
//! revision date and revision type.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::LawRecord;

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static EFFECTIVE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"시행\s*([\d\.\s]+)").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static REVISION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]\s*\[([^\]]+)\]").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static COMPACT_DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("valid regex"));

/// Effective and revision details of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EffectiveInfo {
    /// The fragment the fields were parsed from, or a synthesized one.
    pub raw: String,
    pub effective_date: String,
    pub revision_info: String,
    pub revision_date: String,
    pub revision_type: String,
}

impl EffectiveInfo {
    /// Parse a bracketed fragment.
    ///
    /// When no `시행` date is present the whole fragment becomes the
    /// effective date. Revision parts are assigned positionally, so a
    /// second bracket with fewer than three comma-separated parts leaves
    /// the later fields empty.
    ///
    /// # Examples
    /// ```
    /// use ftclaw_harvester::effective::EffectiveInfo;
    ///
    /// let info = EffectiveInfo::parse("[시행 2025. 1. 1.] [법률 제20101호, 2024. 1. 21., 일부개정]");
    /// assert_eq!(info.effective_date, "2025. 1. 1.");
    /// assert_eq!(info.revision_info, "법률 제20101호");
    /// assert_eq!(info.revision_date, "2024. 1. 21.");
    /// assert_eq!(info.revision_type, "일부개정");
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let effective_date = EFFECTIVE_PATTERN
            .captures(raw)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| raw.to_string());

        let mut info = Self {
            raw: raw.to_string(),
            effective_date,
            ..Self::default()
        };

        if let Some(inner) = REVISION_PATTERN.captures(raw).and_then(|c| c.get(1)) {
            let mut parts = inner.as_str().split(',').map(|p| p.trim().to_string());
            info.revision_info = parts.next().unwrap_or_default();
            info.revision_date = parts.next().unwrap_or_default();
            info.revision_type = parts.next().unwrap_or_default();
        }

        info
    }

    /// Build a display fragment from structured fields.
    #[must_use]
    pub fn from_fields(
        effective_date: String,
        revision_info: String,
        revision_date: String,
        revision_type: String,
    ) -> Self {
        let parts: Vec<&str> = [&revision_info, &revision_date, &revision_type]
            .into_iter()
            .map(String::as_str)
            .filter(|p| !p.is_empty())
            .collect();
        let raw = if parts.is_empty() {
            format!("[시행 {effective_date}]")
        } else {
            format!("[시행 {effective_date}] [{}]", parts.join(", "))
        };
        Self {
            raw,
            effective_date,
            revision_info,
            revision_date,
            revision_type,
        }
    }

    /// Write the fragment and the parsed fields into a record.
    pub fn apply_to(&self, record: &mut LawRecord) {
        record.effective_revision_raw = self.raw.clone();
        record.effective_date = self.effective_date.clone();
        record.revision_info = self.revision_info.clone();
        record.revision_date = self.revision_date.clone();
        record.revision_type = self.revision_type.clone();
    }
}

/// Format an eight-digit `YYYYMMDD` date as `YYYY. MM. DD.`.
///
/// Any other input is returned trimmed and unchanged.
///
/// # Examples
/// ```
/// use ftclaw_harvester::effective::format_compact_date;
///
/// assert_eq!(format_compact_date("20250101"), "2025. 01. 01.");
/// assert_eq!(format_compact_date("2025. 1. 1."), "2025. 1. 1.");
/// ```
#[must_use]
pub fn format_compact_date(value: &str) -> String {
    let value = value.trim();
    match COMPACT_DATE_PATTERN.captures(value) {
        Some(c) => format!("{}. {}. {}.", &c[1], &c[2], &c[3]),
        None => value.to_string(),
    }
}
