use std::fmt;

use ftclaw_harvester::Category;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// What the coordinator is currently doing. Only `Idle` accepts new work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Listing,
    Enriching,
    Archiving,
    Exporting,
}

impl Phase {
    pub fn is_running(self) -> bool {
        self != Phase::Idle
    }
}

/// Point-in-time copy of the job status for readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub is_running: bool,
    pub progress: usize,
    pub total: usize,
    pub current_label: String,
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveStatus {
    pub has_bundle: bool,
    pub bundle_filename: Option<String>,
}

/// Categories a scrape job covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeTarget {
    All,
    Category(Category),
}

impl ScrapeTarget {
    /// Parse `all` or a category number.
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        Category::parse(input)
            .map(Self::Category)
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))
    }

    /// Categories in fetch order.
    pub fn categories(self) -> Vec<Category> {
        match self {
            Self::All => Category::all().collect(),
            Self::Category(category) => vec![category],
        }
    }
}

impl fmt::Display for ScrapeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Category(category) => write!(f, "{category}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_phase_display_and_serde() {
        assert_eq!(Phase::Enriching.to_string(), "enriching");
        assert_eq!(
            serde_json::to_string(&Phase::Archiving).unwrap(),
            "\"archiving\""
        );
        assert!(!Phase::Idle.is_running());
        assert!(Phase::Exporting.is_running());
    }

    #[test]
    fn test_scrape_target_parse() {
        assert_eq!(ScrapeTarget::parse("ALL").unwrap().categories().len(), 14);

        let single = ScrapeTarget::parse("3").unwrap();
        assert_eq!(single.categories()[0].code(), 3);
        assert_eq!(single.to_string(), "03");

        assert!(matches!(
            ScrapeTarget::parse("0"),
            Err(PipelineError::InvalidInput(_))
        ));
    }
}
