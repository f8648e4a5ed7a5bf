//! Detail enrichment: filling the effective/revision fields of listed records.
//!
//! Two strategies implement [`Enricher`]: [`BrowserEnricher`] reads the
//! bracketed fragment off the rendered detail page, [`OpenApiEnricher`]
//! queries the national law search API by title. Both report an
//! [`EnrichOutcome`] which the caller writes back into the record.

pub mod browser;
pub mod open_api;

use serde::Serialize;

use crate::effective::EffectiveInfo;
use crate::types::{sentinel, LawRecord};

pub use browser::BrowserEnricher;
pub use open_api::{ApiEndpoint, ApiTarget, CredentialKind, LookupError, OpenApiEnricher};

/// Result of enriching one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// The fragment was located and parsed.
    Enriched(EffectiveInfo),
    /// The source was reachable but had nothing for this record.
    NotFound,
    /// The lookup failed; every derived field gets `sentinel`.
    Failed {
        sentinel: &'static str,
        reason: String,
    },
}

impl EnrichOutcome {
    /// Navigation or extraction failure.
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Failed {
            sentinel: sentinel::ERROR,
            reason: reason.into(),
        }
    }

    /// Every API configuration rejected the credential.
    pub fn auth_rejected(reason: impl Into<String>) -> Self {
        Self::Failed {
            sentinel: sentinel::AUTH_FAILED,
            reason: reason.into(),
        }
    }

    /// Every API configuration failed for another reason.
    pub fn api_error(reason: impl Into<String>) -> Self {
        Self::Failed {
            sentinel: sentinel::API_ERROR,
            reason: reason.into(),
        }
    }

    /// Write the outcome into a record.
    pub fn apply(&self, record: &mut LawRecord) {
        match self {
            Self::Enriched(info) => info.apply_to(record),
            Self::NotFound => record.fill_derived(sentinel::NOT_FOUND),
            Self::Failed { sentinel, .. } => record.fill_derived(sentinel),
        }
    }
}

/// A strategy that resolves effective/revision details for one record.
pub trait Enricher: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn enrich(&self, record: &LawRecord) -> EnrichOutcome;
}

/// Whether a record still carries placeholder dates and has a usable link.
#[must_use]
pub fn needs_enrichment(record: &LawRecord) -> bool {
    let raw = record.effective_revision_raw.trim();
    let unresolved = raw.is_empty()
        || raw == sentinel::PENDING
        || raw == sentinel::NO_LINK
        || raw == sentinel::NO_INFO;
    unresolved && record.has_link()
}

/// Counters reported at the end of an enrichment run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichSummary {
    pub enriched: usize,
    pub not_found: usize,
    pub errors: usize,
    pub skipped: usize,
}

impl EnrichSummary {
    pub fn record(&mut self, outcome: &EnrichOutcome) {
        match outcome {
            EnrichOutcome::Enriched(_) => self.enriched += 1,
            EnrichOutcome::NotFound => self.not_found += 1,
            EnrichOutcome::Failed { .. } => self.errors += 1,
        }
    }
}
