//! Core data types for the harvester.

use serde::{Deserialize, Serialize};

/// Sentinel values written into record fields in place of real data.
///
/// These are shown verbatim in the results table and the spreadsheet, so
/// they use the same wording as the source site.
pub mod sentinel {
    /// Record has a detail link and has not been enriched yet.
    pub const PENDING: &str = "대기중";
    /// Record has no detail link.
    pub const NO_LINK: &str = "N/A";
    /// Revision fields of a link-less record, and the export filler.
    pub const DASH: &str = "-";
    /// Enrichment ran but located nothing.
    pub const NOT_FOUND: &str = "찾을 수 없음";
    /// Enrichment failed while navigating or extracting.
    pub const ERROR: &str = "오류";
    /// Every API configuration rejected the credential.
    pub const AUTH_FAILED: &str = "인증/조회 실패";
    /// Every API configuration failed for another reason.
    pub const API_ERROR: &str = "API 오류";
    /// Value some listing rows carry instead of a date.
    pub const NO_INFO: &str = "정보없음";
}

/// One row of the FTC law listing, plus the dates filled in by enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LawRecord {
    /// Instrument group name taken from the page heading.
    pub category: String,

    /// Classification such as 법률, 시행령 or 고시.
    pub kind: String,

    /// Detailed name of the instrument.
    pub title: String,

    /// Responsible department.
    pub department: String,

    /// Absolute URL of the detail page, or [`sentinel::NO_LINK`].
    pub detail_link: String,

    /// Bracketed effective/revision fragment as found on the detail page.
    #[serde(default)]
    pub effective_revision_raw: String,

    #[serde(default)]
    pub effective_date: String,

    #[serde(default)]
    pub revision_type: String,

    #[serde(default)]
    pub revision_info: String,

    #[serde(default)]
    pub revision_date: String,
}

impl LawRecord {
    /// Create a freshly listed record with derived fields preset.
    ///
    /// Records with a link start out pending; records without one are
    /// marked `N/A` and never enriched.
    #[must_use]
    pub fn listed(
        category: impl Into<String>,
        kind: impl Into<String>,
        title: impl Into<String>,
        department: impl Into<String>,
        detail_link: Option<String>,
    ) -> Self {
        let mut record = Self {
            category: category.into(),
            kind: kind.into(),
            title: title.into(),
            department: department.into(),
            ..Self::default()
        };
        match detail_link {
            Some(link) => {
                record.detail_link = link;
                record.fill_derived(sentinel::PENDING);
            }
            None => {
                record.detail_link = sentinel::NO_LINK.to_string();
                record.effective_revision_raw = sentinel::NO_LINK.to_string();
                record.effective_date = sentinel::NO_LINK.to_string();
                record.revision_type = sentinel::DASH.to_string();
                record.revision_info = sentinel::DASH.to_string();
                record.revision_date = sentinel::DASH.to_string();
            }
        }
        record
    }

    /// Set the raw fragment and all four derived fields to one value.
    pub fn fill_derived(&mut self, value: &str) {
        self.effective_revision_raw = value.to_string();
        self.effective_date = value.to_string();
        self.revision_type = value.to_string();
        self.revision_info = value.to_string();
        self.revision_date = value.to_string();
    }

    /// Whether the detail link is an absolute http(s) URL.
    #[must_use]
    pub fn has_link(&self) -> bool {
        self.detail_link.starts_with("http")
    }
}
