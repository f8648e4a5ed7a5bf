//! Enrichment through the rendered detail page.

use crate::browser::{extract_effective_info, BrowserSession};
use crate::effective::EffectiveInfo;
use crate::types::LawRecord;

use super::{EnrichOutcome, Enricher};

/// Enricher that runs the selector cascade against each detail page.
///
/// Holds one browser session for the whole run.
pub struct BrowserEnricher {
    session: BrowserSession,
}

impl BrowserEnricher {
    #[must_use]
    pub fn new(session: BrowserSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &BrowserSession {
        &self.session
    }
}

impl Enricher for BrowserEnricher {
    fn name(&self) -> &'static str {
        "browser"
    }

    fn enrich(&self, record: &LawRecord) -> EnrichOutcome {
        match extract_effective_info(&self.session, &record.detail_link) {
            Ok(fragment) if fragment.is_empty() => EnrichOutcome::NotFound,
            Ok(fragment) => EnrichOutcome::Enriched(EffectiveInfo::parse(&fragment)),
            Err(e) => {
                tracing::warn!(title = %record.title, error = %e, "detail extraction failed");
                EnrichOutcome::error(e.to_string())
            }
        }
    }
}
